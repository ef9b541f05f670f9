//! Event bus for client events.

use tokio::sync::broadcast;

use crate::pairing::PairingState;
use crate::types::TVDevice;

/// Events published by the pairing engine, remote session, and controller.
#[derive(Debug, Clone)]
pub enum AtvEvent {
    /// Discovery found a new device on the network.
    DeviceDiscovered {
        /// The discovered device.
        device: TVDevice,
    },
    /// A previously discovered device is no longer advertising.
    DeviceLost {
        /// ID of the lost device.
        device_id: String,
    },
    /// The pairing state machine transitioned.
    PairingStateChanged {
        /// New pairing state.
        state: PairingState,
    },
    /// Pairing completed successfully; the device is now in the paired list.
    PairingSucceeded {
        /// The newly paired device.
        device: TVDevice,
    },
    /// Pairing failed.
    PairingFailed {
        /// Human-readable reason.
        message: String,
    },
    /// The remote session finished connecting.
    Connected {
        /// The connected device.
        device: TVDevice,
    },
    /// The remote session disconnected.
    Disconnected {
        /// The device that was connected.
        device: TVDevice,
        /// Reason for disconnection.
        reason: String,
    },
    /// A key command was sent.
    CommandSent {
        /// Android keycode that was injected.
        key_code: u32,
    },
    /// An error occurred outside of a specific pairing/connect call.
    Error {
        /// Error code category.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
}

/// Coarse error categories for [`AtvEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Network or transport failure.
    Network,
    /// TLS handshake or certificate issue.
    Tls,
    /// Pairing handshake rejected or mismatched.
    Pairing,
    /// Discovery failed to start or was interrupted.
    Discovery,
    /// Anything not covered above.
    Unknown,
}

/// Broadcasts [`AtvEvent`]s to any number of subscribers; events are dropped
/// (not buffered indefinitely) once the channel's capacity is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<AtvEvent>,
}

impl EventBus {
    /// Create a new event bus with a 100-event backlog per subscriber.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Subscribe to all events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AtvEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; a no-op if there are no subscribers.
    pub fn emit(&self, event: AtvEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(AtvEvent::PairingStateChanged {
            state: PairingState::Connecting,
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AtvEvent::PairingStateChanged { state: PairingState::Connecting }));
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit(AtvEvent::DeviceLost {
            device_id: "none".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
