//! mDNS discovery of Android TV remote-control services.

mod browser;

pub use browser::{DeviceBrowser, DiscoveryEvent};

/// The mDNS service type Android TV remote-control devices advertise.
pub const ANDROID_TV_REMOTE_SERVICE_TYPE: &str = "_androidtvremote2._tcp.local.";
