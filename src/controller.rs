//! The top-level façade: orchestrates discovery results, the pairing
//! engine, and the remote session behind a single object, folding every
//! transition into the shared event bus and state container.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::config::AtvConfig;
use crate::error::AtvError;
use crate::identity::{Identity, IdentityStore};
use crate::pairing::{PairingEngine, PairingState};
use crate::session::{DeviceInfo, RemoteSession};
use crate::state::{AtvEvent, ClientState, ErrorCode, EventBus, StateContainer};
use crate::types::{TVDevice, PAIRING_PORT};

/// Orchestrates pairing and remote-control sessions for the devices the
/// caller manages.
///
/// Holds the paired-device list (in-memory, keyed by device id; persistence
/// to a JSON file is the caller's concern), at most one active
/// [`RemoteSession`], and the identity store both the pairing engine and
/// remote session authenticate with.
pub struct Controller {
    config: AtvConfig,
    identity_store: Mutex<IdentityStore>,
    paired_devices: Mutex<HashMap<String, TVDevice>>,
    active_session: Mutex<Option<RemoteSession>>,
    pairing_engine: Mutex<Option<PairingEngine>>,
    event_bus: Arc<EventBus>,
    state: Arc<StateContainer>,
}

impl Controller {
    /// Construct a controller backed by `identity_store`.
    #[must_use]
    pub fn new(config: AtvConfig, identity_store: IdentityStore) -> Self {
        Self {
            config,
            identity_store: Mutex::new(identity_store),
            paired_devices: Mutex::new(HashMap::new()),
            active_session: Mutex::new(None),
            pairing_engine: Mutex::new(None),
            event_bus: Arc::new(EventBus::new()),
            state: Arc::new(StateContainer::new()),
        }
    }

    /// Subscribe to every event the controller, pairing engine, and remote
    /// session emit.
    #[must_use]
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<AtvEvent> {
        self.event_bus.subscribe()
    }

    /// Subscribe to state snapshots (`is_connected`, `pairing_state`,
    /// `paired_devices`, `last_error`, ...).
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    /// A snapshot of the current state.
    pub async fn state(&self) -> ClientState {
        self.state.get().await
    }

    /// Mark `device` as paired without running the handshake (e.g. after an
    /// imported identity, or restoring a persisted list).
    pub async fn add_paired(&self, mut device: TVDevice) {
        device.paired = true;
        self.paired_devices.lock().await.insert(device.id.clone(), device.clone());
        self.state.add_paired_device(device.clone()).await;
        self.event_bus.emit(AtvEvent::PairingSucceeded { device });
    }

    /// Remove a device from the paired list, disconnecting it first if it's
    /// the active session.
    pub async fn remove_paired(&self, device_id: &str) {
        {
            let active = self.active_session.lock().await;
            if active.as_ref().is_some_and(|s| s.device().id == device_id) {
                drop(active);
                self.disconnect().await;
            }
        }
        self.paired_devices.lock().await.remove(device_id);
        self.state.remove_paired_device(device_id).await;
    }

    /// Start pairing with `device`: opens TLS on the pairing port and runs
    /// the `PairingRequest`/`PairingOption` exchange, parking at
    /// `WaitingForCode` once the server is ready for the PIN.
    ///
    /// # Errors
    ///
    /// Propagates [`AtvError`] from identity retrieval or the pairing
    /// handshake (see [`PairingEngine::start`]).
    #[instrument(skip(self, device), fields(device = %device.id))]
    pub async fn start_pairing(&self, device: &TVDevice) -> Result<(), AtvError> {
        info!("starting pairing");
        self.state.set_pairing_state(PairingState::Connecting).await;
        self.event_bus.emit(AtvEvent::PairingStateChanged {
            state: PairingState::Connecting,
        });

        let identity = self.current_identity().await?;
        let mut engine = PairingEngine::new(self.config.package_id.clone(), self.config.pairing_timeout, self.config.handshake_timeout);

        let result = engine.start(&device.host, PAIRING_PORT, &identity).await;
        self.state.set_pairing_state(engine.state()).await;
        self.event_bus.emit(AtvEvent::PairingStateChanged { state: engine.state() });

        if let Err(err) = &result {
            warn!(error = %err, "pairing start failed");
            self.event_bus.emit(AtvEvent::PairingFailed { message: err.to_string() });
            self.state.set_last_error(err.to_string()).await;
        } else {
            debug!("pairing parked at WaitingForCode");
        }

        *self.pairing_engine.lock().await = Some(engine);
        result
    }

    /// Submit the on-screen PIN to complete pairing; on success, marks
    /// `device` as paired.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::ConnectionFailed`] if no pairing attempt is in
    /// progress, or whatever [`PairingEngine::submit_code`] returns.
    #[instrument(skip(self, code, device), fields(device = %device.id))]
    pub async fn submit_code(&self, code: &str, device: &TVDevice) -> Result<(), AtvError> {
        let mut guard = self.pairing_engine.lock().await;
        let engine = guard.as_mut().ok_or_else(|| AtvError::ConnectionFailed {
            reason: "no pairing attempt in progress".to_string(),
        })?;

        let result = engine.submit_code(code).await;
        self.state.set_pairing_state(engine.state()).await;
        self.event_bus.emit(AtvEvent::PairingStateChanged { state: engine.state() });
        drop(guard);

        match result {
            Ok(()) => {
                info!("pairing code accepted");
                self.add_paired(device.clone()).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "pairing code rejected");
                self.event_bus.emit(AtvEvent::PairingFailed { message: err.to_string() });
                self.state.set_last_error(err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Connect to `device`'s persistent remote-control session, replacing
    /// any previously active session.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::NoIdentity`], [`AtvError::ConnectionFailed`], or
    /// [`AtvError::Tls`] on handshake failure.
    #[instrument(skip(self, device), fields(device = %device.id))]
    pub async fn connect(&self, device: &TVDevice) -> Result<(), AtvError> {
        info!("connecting to device");
        self.state.set_connecting(true).await;

        let identity = self.current_identity().await?;
        let device_info = DeviceInfo {
            model: self.config.device_model.clone(),
            vendor: self.config.device_vendor.clone(),
            package_id: self.config.package_id.clone(),
        };

        let result = RemoteSession::connect(
            device.clone(),
            &identity,
            &device_info,
            self.config.handshake_timeout,
            self.config.configure_settle_delay,
            self.event_bus.clone(),
        )
        .await;

        match result {
            Ok(session) => {
                info!("device connected");
                *self.active_session.lock().await = Some(session);
                self.state.set_connected(true).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "device connect failed");
                self.state.set_connecting(false).await;
                self.event_bus.emit(AtvEvent::Error {
                    code: ErrorCode::Network,
                    message: err.to_string(),
                });
                self.state.set_last_error(err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Disconnect the active session, if any.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        if let Some(session) = self.active_session.lock().await.take() {
            let device = session.device().clone();
            debug!(device = %device.id, "disconnecting active session");
            session.disconnect();
            self.state.set_connected(false).await;
            self.event_bus.emit(AtvEvent::Disconnected {
                device,
                reason: "disconnected by caller".to_string(),
            });
        }
    }

    /// Inject a key command on the active session; silently ignored if not
    /// connected.
    pub async fn send_command(&self, key_code: u32) {
        let guard = self.active_session.lock().await;
        if let Some(session) = guard.as_ref() {
            match session.send_key(key_code).await {
                Ok(()) => {
                    debug!(key_code, "command sent");
                    self.event_bus.emit(AtvEvent::CommandSent { key_code });
                }
                Err(err) => warn!(key_code, error = %err, "failed to send command"),
            }
        } else {
            warn!(key_code, "send_command called with no active session");
        }
    }

    async fn current_identity(&self) -> Result<Identity, AtvError> {
        self.identity_store.lock().await.get_or_create_identity().map(Clone::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryBackend;

    fn test_controller() -> Controller {
        let store = IdentityStore::open(Box::new(MemoryBackend::new())).unwrap();
        Controller::new(AtvConfig::default(), store)
    }

    #[tokio::test]
    async fn add_and_remove_paired_device() {
        let controller = test_controller();
        let device = TVDevice::new("Living Room TV", "192.168.1.50", 6466);
        controller.add_paired(device.clone()).await;
        assert!(controller.state().await.paired_devices.contains_key(&device.id));

        controller.remove_paired(&device.id).await;
        assert!(!controller.state().await.paired_devices.contains_key(&device.id));
    }

    #[tokio::test]
    async fn send_command_without_connection_is_a_silent_noop() {
        let controller = test_controller();
        controller.send_command(19).await;
    }

    #[tokio::test]
    async fn timeout_is_configurable() {
        let controller = test_controller();
        assert_eq!(controller.config.pairing_timeout, Duration::from_secs(10));
    }
}
