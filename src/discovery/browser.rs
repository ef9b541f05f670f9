//! mDNS browser for `_androidtvremote2._tcp` devices.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::error::AtvError;
use crate::types::{TVDevice, DEFAULT_CONTROL_PORT};

use super::ANDROID_TV_REMOTE_SERVICE_TYPE;

/// Discovery events emitted as devices come and go on the network.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A new device was discovered.
    Added(TVDevice),
    /// A device stopped advertising.
    Removed(String),
    /// A known device's advertised information changed.
    Updated(TVDevice),
}

/// Browses for Android TV remote-control services via mDNS.
pub struct DeviceBrowser;

impl DeviceBrowser {
    /// Create a new device browser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Start browsing; returns a stream of [`DiscoveryEvent`]s.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::DiscoveryFailed`] if the mDNS daemon cannot be
    /// initialized.
    pub fn browse(self) -> Result<impl Stream<Item = DiscoveryEvent>, AtvError> {
        DeviceBrowserStream::new()
    }
}

impl Default for DeviceBrowser {
    fn default() -> Self {
        Self::new()
    }
}

struct DeviceBrowserStream {
    mdns: mdns_sd::ServiceDaemon,
    stream: Box<dyn Stream<Item = mdns_sd::ServiceEvent> + Send + Unpin>,
    known_devices: HashMap<String, TVDevice>,
    fullname_map: HashMap<String, String>,
}

impl DeviceBrowserStream {
    fn new() -> Result<Self, AtvError> {
        let mdns = mdns_sd::ServiceDaemon::new()
            .map_err(|e| AtvError::DiscoveryFailed(format!("failed to create mDNS daemon: {e}")))?;

        let receiver = mdns
            .browse(ANDROID_TV_REMOTE_SERVICE_TYPE)
            .map_err(|e| AtvError::DiscoveryFailed(format!("failed to browse: {e}")))?;

        let stream = Box::new(receiver.into_stream());

        Ok(Self {
            mdns,
            stream,
            known_devices: HashMap::new(),
            fullname_map: HashMap::new(),
        })
    }

    fn process_event(&mut self, event: mdns_sd::ServiceEvent) -> Option<DiscoveryEvent> {
        match event {
            mdns_sd::ServiceEvent::ServiceResolved(info) => self.handle_resolved(&info),
            mdns_sd::ServiceEvent::ServiceRemoved(_, fullname) => self.handle_removed(&fullname),
            _ => None,
        }
    }

    fn handle_resolved(&mut self, info: &mdns_sd::ServiceInfo) -> Option<DiscoveryEvent> {
        let fullname = info.get_fullname().to_string();

        let txt_records: HashMap<String, String> = info
            .get_properties()
            .iter()
            .map(|prop| (prop.key().to_string(), prop.val_str().to_string()))
            .collect();

        let friendly_name = txt_records
            .get("fn")
            .cloned()
            .or_else(|| fullname.split('.').next().map(ToString::to_string))
            .unwrap_or_else(|| "Android TV".to_string());

        let address = info.get_addresses().iter().next()?.to_string();
        let port = if info.get_port() == 0 { DEFAULT_CONTROL_PORT } else { info.get_port() };

        let device = TVDevice::new(friendly_name, address, port);
        let device_id = device.id.clone();
        self.fullname_map.insert(fullname, device_id.clone());

        let event = if self.known_devices.contains_key(&device_id) {
            DiscoveryEvent::Updated(device.clone())
        } else {
            DiscoveryEvent::Added(device.clone())
        };

        self.known_devices.insert(device_id, device);
        Some(event)
    }

    fn handle_removed(&mut self, fullname: &str) -> Option<DiscoveryEvent> {
        let device_id = self.fullname_map.remove(fullname)?;
        self.known_devices.remove(&device_id);
        Some(DiscoveryEvent::Removed(device_id))
    }
}

impl Stream for DeviceBrowserStream {
    type Item = DiscoveryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let event = match Pin::new(&mut self.stream).poll_next(cx) {
                Poll::Ready(Some(event)) => event,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };

            if let Some(discovery_event) = self.process_event(event) {
                return Poll::Ready(Some(discovery_event));
            }
        }
    }
}

impl Drop for DeviceBrowserStream {
    fn drop(&mut self) {
        let _ = self.mdns.stop_browse(ANDROID_TV_REMOTE_SERVICE_TYPE);
        let _ = self.mdns.shutdown();
    }
}
