//! PIN-based pairing handshake: state machine, message envelopes, and
//! secret derivation.
//!
//! The envelope field ordering (`protocol_version`, `status`, then payload)
//! is the one this client always sends; a peer is free to order fields
//! however it likes since the wire codec reads fields by number, not
//! position.

pub mod engine;
pub mod messages;
pub mod secret;

pub use engine::PairingEngine;

/// Where a pairing attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// No pairing attempt in progress.
    Idle,
    /// TLS handshake in flight.
    Connecting,
    /// `PairingRequest`/`PairingOption` exchanged; waiting on the
    /// caller to supply the on-screen PIN.
    WaitingForCode,
    /// `PairingSecret` sent; waiting on the server's final ack.
    Verifying,
    /// Pairing completed; the identity certificate is now trusted by the peer.
    Success,
    /// Pairing failed or was cancelled; see the accompanying error.
    Failed,
}
