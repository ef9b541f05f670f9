//! Centralized, pollable client state: the fold target for every event the
//! pairing engine, remote session, and controller emit.

use std::collections::HashMap;

use tokio::sync::{watch, RwLock};

use crate::pairing::PairingState;
use crate::types::TVDevice;

/// A point-in-time snapshot of the client's overall state.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// Whether the remote session is currently connected.
    pub is_connected: bool,
    /// Whether a connection attempt is in flight.
    pub is_connecting: bool,
    /// Current pairing state, if a pairing attempt is in progress or just
    /// concluded.
    pub pairing_state: Option<PairingState>,
    /// Devices that have completed pairing, keyed by device id.
    pub paired_devices: HashMap<String, TVDevice>,
    /// The most recent error message, if any.
    pub last_error: Option<String>,
}

/// Holds the current [`ClientState`] and publishes every change to
/// subscribers via a `tokio::sync::watch` channel, so consumers observe
/// transitions instead of polling.
pub struct StateContainer {
    state: RwLock<ClientState>,
    tx: watch::Sender<ClientState>,
    rx: watch::Receiver<ClientState>,
}

impl StateContainer {
    /// Create a container seeded with the default (disconnected, unpaired)
    /// state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(ClientState::default());
        Self {
            state: RwLock::new(ClientState::default()),
            tx,
            rx,
        }
    }

    /// A snapshot of the current state.
    pub async fn get(&self) -> ClientState {
        self.state.read().await.clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.rx.clone()
    }

    /// Apply `f` to the state under lock and publish the result.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ClientState),
    {
        let mut state = self.state.write().await;
        f(&mut state);
        let _ = self.tx.send(state.clone());
    }

    /// Set `is_connecting`.
    pub async fn set_connecting(&self, connecting: bool) {
        self.update(|s| s.is_connecting = connecting).await;
    }

    /// Set `is_connected`, clearing `is_connecting` when true.
    pub async fn set_connected(&self, connected: bool) {
        self.update(|s| {
            s.is_connected = connected;
            if connected {
                s.is_connecting = false;
            }
        })
        .await;
    }

    /// Set the current pairing state.
    pub async fn set_pairing_state(&self, pairing_state: PairingState) {
        self.update(|s| s.pairing_state = Some(pairing_state)).await;
    }

    /// Insert or update a paired device.
    pub async fn add_paired_device(&self, device: TVDevice) {
        self.update(|s| {
            s.paired_devices.insert(device.id.clone(), device);
        })
        .await;
    }

    /// Remove a paired device by id.
    pub async fn remove_paired_device(&self, device_id: &str) {
        self.update(|s| {
            s.paired_devices.remove(device_id);
        })
        .await;
    }

    /// Record the most recent error message.
    pub async fn set_last_error(&self, message: impl Into<String>) {
        self.update(|s| s.last_error = Some(message.into())).await;
    }
}

impl Default for StateContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn updates_are_observable_through_watch() {
        let container = StateContainer::new();
        let mut rx = container.subscribe();

        container.set_connecting(true).await;
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_connecting);

        container.set_connected(true).await;
        rx.changed().await.unwrap();
        let snapshot = rx.borrow().clone();
        assert!(snapshot.is_connected);
        assert!(!snapshot.is_connecting);
    }

    #[tokio::test]
    async fn paired_devices_round_trip() {
        let container = StateContainer::new();
        let device = TVDevice::new("Living Room TV", "192.168.1.50", 6466);
        container.add_paired_device(device.clone()).await;
        assert!(container.get().await.paired_devices.contains_key(&device.id));

        container.remove_paired_device(&device.id).await;
        assert!(!container.get().await.paired_devices.contains_key(&device.id));
    }
}
