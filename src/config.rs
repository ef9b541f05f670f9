//! Client configuration: timeouts, identity storage location, and the
//! `DeviceInfo` strings announced during `RemoteConfigure`.

use std::path::PathBuf;
use std::time::Duration;

/// Tunable behavior for the pairing engine, remote session, and identity
/// store.
#[derive(Debug, Clone)]
pub struct AtvConfig {
    /// Ceiling for each pairing `wait_for_message` step (default: 10s).
    pub pairing_timeout: Duration,

    /// Ceiling for the TLS handshake on either port (default: 10s).
    pub handshake_timeout: Duration,

    /// Fixed delay between `RemoteConfigure` and `RemoteSetActive` (default: 500ms).
    pub configure_settle_delay: Duration,

    /// Directory the file-backed identity store persists blobs under.
    /// `None` keeps the identity in memory only (not persisted across runs).
    pub identity_storage_path: Option<PathBuf>,

    /// `DeviceInfo.model` announced during `RemoteConfigure`.
    pub device_model: String,

    /// `DeviceInfo.vendor` announced during `RemoteConfigure`.
    pub device_vendor: String,

    /// `DeviceInfo.package_id` announced during `RemoteConfigure`.
    pub package_id: String,
}

impl Default for AtvConfig {
    fn default() -> Self {
        Self {
            pairing_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            configure_settle_delay: Duration::from_millis(500),
            identity_storage_path: None,
            device_model: "atvremote".to_string(),
            device_vendor: "atvremote".to_string(),
            package_id: "com.example.atvremote".to_string(),
        }
    }
}

impl AtvConfig {
    /// Start building a config from the documented defaults.
    #[must_use]
    pub fn builder() -> AtvConfigBuilder {
        AtvConfigBuilder::default()
    }
}

/// Builder for [`AtvConfig`].
#[derive(Debug, Clone, Default)]
pub struct AtvConfigBuilder {
    config: AtvConfig,
}

impl AtvConfigBuilder {
    /// Set the pairing message-wait ceiling.
    #[must_use]
    pub fn pairing_timeout(mut self, timeout: Duration) -> Self {
        self.config.pairing_timeout = timeout;
        self
    }

    /// Set the TLS handshake ceiling.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Set the delay between `RemoteConfigure` and `RemoteSetActive`.
    #[must_use]
    pub fn configure_settle_delay(mut self, delay: Duration) -> Self {
        self.config.configure_settle_delay = delay;
        self
    }

    /// Persist the identity under `path` instead of keeping it in memory only.
    #[must_use]
    pub fn identity_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.identity_storage_path = Some(path.into());
        self
    }

    /// Set the `DeviceInfo` strings announced during `RemoteConfigure`.
    #[must_use]
    pub fn device_info(mut self, model: impl Into<String>, vendor: impl Into<String>, package_id: impl Into<String>) -> Self {
        self.config.device_model = model.into();
        self.config.device_vendor = vendor.into();
        self.config.package_id = package_id.into();
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> AtvConfig {
        self.config
    }
}
