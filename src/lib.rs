//! # atvremote
//!
//! A client implementation of the Android TV Remote Control v2 protocol:
//! mDNS discovery, PIN-code pairing over mutual-auth TLS with a hand-rolled
//! X.509 certificate, and a persistent control session for injecting key
//! commands.
//!
//! ## Example
//!
//! ```rust,no_run
//! use atvremote::{Controller, AtvConfig, TVDevice, IdentityStore, MemoryBackend};
//! use atvremote::KeyCode;
//!
//! # async fn example() -> Result<(), atvremote::AtvError> {
//! let identity_store = IdentityStore::open(Box::new(MemoryBackend::new()))?;
//! let controller = Controller::new(AtvConfig::default(), identity_store);
//!
//! let device = TVDevice::new("Living Room TV", "192.168.1.50", 6466);
//! controller.start_pairing(&device).await?;
//! controller.submit_code("A1B2", &device).await?;
//!
//! controller.connect(&device).await?;
//! controller.send_command(KeyCode::Home.android_code()).await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Client configuration: timeouts, identity storage path, device-info strings.
pub mod config;
/// The pairing/remote-session orchestration façade.
pub mod controller;
/// DER/ASN.1 encoding and the self-signed certificate builder.
pub mod der;
/// mDNS discovery of `_androidtvremote2._tcp` devices.
pub mod discovery;
/// Error taxonomy.
pub mod error;
/// Identity store: key/certificate generation, persistence, import.
pub mod identity;
/// The PIN-pairing handshake: state machine, messages, secret derivation.
pub mod pairing;
/// PKCS#1 `RSAPublicKey` parsing.
pub mod rsakey;
/// The persistent remote-control session.
pub mod session;
/// Event bus and polling-free state container.
pub mod state;
/// Core data types (`TVDevice`, `KeyCode`).
pub mod types;
/// Hand-rolled protobuf-style wire codec: varints, tag/length framing.
pub mod wire;

mod tls;

pub use config::{AtvConfig, AtvConfigBuilder};
pub use controller::Controller;
pub use error::{AtvError, CodecError, DerError, PairingError};
pub use identity::{FileBackend, Identity, IdentityBackend, IdentityStore, MemoryBackend};
pub use pairing::PairingState;
pub use state::{AtvEvent, ClientState, ErrorCode, EventBus, StateContainer};
pub use types::{KeyCode, TVDevice};
