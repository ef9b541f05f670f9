//! Error taxonomy for the Android TV Remote client.

use thiserror::Error;

/// Top-level error type returned by every fallible public entry point.
#[derive(Debug, Error)]
pub enum AtvError {
    /// No usable identity could be produced by the credential store.
    #[error("no identity available")]
    NoIdentity,

    /// The identity backend failed to load, save, or delete a blob.
    #[error("identity backend error: {0}")]
    KeychainError(String),

    /// TLS or transport setup/handshake failed, including local cancellation.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Human-readable reason, e.g. `"Cancelled"` for a user-initiated abort.
        reason: String,
    },

    /// The TV rejected a pairing step with a non-200 status.
    #[error("pairing rejected by device")]
    PairingRejected,

    /// A PIN was malformed, or a peer response was structurally unparseable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The PIN's check byte did not match the computed pairing secret.
    #[error("pairing secret mismatch (wrong PIN)")]
    SecretMismatch,

    /// The TLS handshake completed without yielding a leaf certificate.
    #[error("server certificate not available")]
    ServerCertNotAvailable,

    /// A 10-second wait for the next message elapsed.
    #[error("timed out waiting for response")]
    Timeout,

    /// A command was issued on a session that isn't connected.
    #[error("not connected")]
    NotConnected,

    /// Device discovery failed to start or was interrupted.
    #[error("discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Wrapped filesystem or socket I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped TLS-layer error not already folded into `ConnectionFailed`.
    #[error(transparent)]
    Tls(#[from] rustls::Error),

    /// A pairing-specific error (currently just a state-gate violation).
    #[error(transparent)]
    Pairing(#[from] PairingError),
}

/// Errors from the DER/ASN.1 builder and certificate parser.
#[derive(Debug, Error)]
pub enum DerError {
    /// Buffer ran out of bytes before the expected structure was complete.
    #[error("unexpected end of DER input")]
    UnexpectedEof,

    /// A tag byte didn't match what the parser expected at this position.
    #[error("unexpected DER tag: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedTag {
        /// Tag the parser required.
        expected: u8,
        /// Tag actually found.
        actual: u8,
    },

    /// A length field decoded to a value the builder refuses to emit or parse.
    #[error("invalid or unsupported DER length")]
    InvalidLength,

    /// The RSA signature over the TBS certificate could not be produced.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Errors from the wire codec (varint/tag framing).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A tag's wire type was not one this codec understands.
    #[error("unsupported wire type: {0}")]
    UnsupportedWireType(u8),
}

/// Errors specific to the pairing handshake's own state machine.
#[derive(Debug, Error)]
pub enum PairingError {
    /// The device is in the wrong state for the requested operation.
    #[error("invalid pairing state: expected {expected}, got {actual}")]
    InvalidState {
        /// State the operation required.
        expected: String,
        /// State the session was actually in.
        actual: String,
    },
}
