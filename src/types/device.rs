//! The TV device record: discovery's output and the controller's input.

/// The fixed TCP port the PIN-pairing handshake runs on.
pub const PAIRING_PORT: u16 = 6467;

/// The default TCP port the persistent remote-control session runs on.
pub const DEFAULT_CONTROL_PORT: u16 = 6466;

/// A discovered (or manually added) Android TV, addressable for pairing and
/// remote control.
///
/// Immutable once paired except for [`paired`](Self::paired); created by
/// discovery, destroyed only by explicit user removal.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TVDevice {
    /// Stable identifier, conventionally `"{host}:{control_port}"`.
    pub id: String,
    /// Human-readable name, typically from the mDNS TXT record.
    pub name: String,
    /// Network host (IP address or resolvable hostname).
    pub host: String,
    /// Remote-control TCP port (default 6466).
    pub control_port: u16,
    /// Whether this device has completed pairing successfully.
    pub paired: bool,
}

impl TVDevice {
    /// Construct a new, unpaired device record.
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, control_port: u16) -> Self {
        let host = host.into();
        let id = format!("{host}:{control_port}");
        Self {
            id,
            name: name.into(),
            host,
            control_port,
            paired: false,
        }
    }

    /// The fixed pairing-handshake port, independent of `control_port`.
    #[must_use]
    pub fn pairing_port(&self) -> u16 {
        PAIRING_PORT
    }
}
