//! Drives the six-step pairing handshake over a freshly captured TLS
//! connection: `PairingRequest` → `PairingOption` → wait for
//! `PairingConfiguration` → (caller supplies the PIN) → `PairingSecret` →
//! `PairingSecretAck`.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tracing::{debug, info, instrument, warn};

use crate::der::cert::parse_certificate;
use crate::error::AtvError;
use crate::identity::Identity;
use crate::rsakey::parse_pkcs1_public_key;
use crate::tls::{self, CapturedServerCert};
use crate::wire::extract_message;

use super::messages::{self, ParsedEnvelope};
use super::secret::{compute_checked_secret, parse_pin};
use super::PairingState;

/// Drives one pairing attempt end to end against a single `TVDevice`.
///
/// Exactly one [`PairingEngine`] should be alive per attempt; starting a new
/// one supersedes any prior in-flight attempt (the caller is expected to drop
/// it, per the "constructing a new one cancels any prior one" rule).
pub struct PairingEngine {
    state: PairingState,
    stream: Option<TlsStream<TcpStream>>,
    recv_buf: Vec<u8>,
    captured_cert: Option<CapturedServerCert>,
    client_public_key: Option<(Vec<u8>, Vec<u8>)>,
    server_public_key: Option<(Vec<u8>, Vec<u8>)>,
    wait_timeout: Duration,
    handshake_timeout: Duration,
    client_name: String,
}

impl PairingEngine {
    /// Construct an idle engine, not yet connected.
    #[must_use]
    pub fn new(client_name: impl Into<String>, wait_timeout: Duration, handshake_timeout: Duration) -> Self {
        Self {
            state: PairingState::Idle,
            stream: None,
            recv_buf: Vec::new(),
            captured_cert: None,
            client_public_key: None,
            server_public_key: None,
            wait_timeout,
            handshake_timeout,
            client_name: client_name.into(),
        }
    }

    /// Current state of the handshake.
    #[must_use]
    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Open the TLS connection to the pairing port, then run steps 1 and 2
    /// of the handshake (`PairingRequest`/ack, `PairingOption`), parking in
    /// [`PairingState::WaitingForCode`] once the server has sent its
    /// `PairingConfiguration`.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::ConnectionFailed`], [`AtvError::PairingRejected`],
    /// [`AtvError::Timeout`], or [`AtvError::InvalidResponse`] (for a
    /// negotiated non-hexadecimal encoding).
    #[instrument(skip(self, identity), fields(state = ?self.state))]
    pub async fn start(&mut self, host: &str, port: u16, identity: &Identity) -> Result<(), AtvError> {
        info!("starting pairing handshake");
        self.state = PairingState::Connecting;

        let (stream, captured) = tls::connect(host, port, identity, self.handshake_timeout).await.map_err(|e| {
            warn!(error = %e, "pairing TLS connect failed");
            self.state = PairingState::Failed;
            e
        })?;
        self.stream = Some(stream);
        self.captured_cert = Some(captured);
        debug!("pairing TLS handshake complete, server certificate captured");

        self.client_public_key = Some(extract_public_key(identity.certificate_der())?);

        if let Err(err) = self.run_request_and_option().await {
            warn!(error = %err, "pairing handshake failed before WaitingForCode");
            self.state = PairingState::Failed;
            return Err(err);
        }

        Ok(())
    }

    async fn run_request_and_option(&mut self) -> Result<(), AtvError> {
        debug!("sending PairingRequest");
        self.send(&messages::pairing_request(&self.client_name)).await?;
        self.expect_ack().await?;

        debug!("sending PairingOption");
        self.send(&messages::pairing_option()).await?;
        self.wait_for_configuration().await?;

        self.state = PairingState::WaitingForCode;
        debug!("pairing state -> WaitingForCode");
        Ok(())
    }

    /// Wait for the `PairingOption` response to carry `PairingConfiguration`
    /// (field 30). The server sends exactly one response per client
    /// message, so in practice this is the same frame that acks the
    /// option — it must not be read as a separate frame after it.
    async fn wait_for_configuration(&mut self) -> Result<(), AtvError> {
        loop {
            let envelope = self.wait_for_message().await?;
            if envelope.status != 200 {
                warn!(status = envelope.status, "PairingOption rejected");
                return Err(AtvError::PairingRejected);
            }
            if let Some(encoding) = envelope.option_encoding {
                if encoding != 3 {
                    warn!(encoding, "server negotiated a non-hexadecimal encoding");
                    return Err(AtvError::InvalidResponse(format!(
                        "server negotiated non-hexadecimal encoding {encoding}"
                    )));
                }
            }
            if envelope.has_configuration {
                return Ok(());
            }
        }
    }

    /// Submit the on-screen PIN: compute the pairing secret from both
    /// public keys plus the PIN, reject locally on a check-byte mismatch,
    /// and otherwise send `PairingSecret` and await the final ack.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::Pairing`] (wrapping [`PairingError::InvalidState`](crate::error::PairingError::InvalidState))
    /// if called outside [`PairingState::WaitingForCode`],
    /// [`AtvError::InvalidResponse`] for a malformed PIN,
    /// [`AtvError::SecretMismatch`] for a wrong one,
    /// [`AtvError::ServerCertNotAvailable`] if the TLS handshake never
    /// yielded a server certificate, or [`AtvError::PairingRejected`] /
    /// [`AtvError::Timeout`] from the final ack.
    #[instrument(skip(self, pin), fields(state = ?self.state))]
    pub async fn submit_code(&mut self, pin: &str) -> Result<(), AtvError> {
        if self.state != PairingState::WaitingForCode {
            return Err(crate::error::PairingError::InvalidState {
                expected: format!("{:?}", PairingState::WaitingForCode),
                actual: format!("{:?}", self.state),
            }
            .into());
        }
        self.state = PairingState::Verifying;
        debug!("pairing state -> Verifying");

        let result = self.submit_code_inner(pin).await;
        if result.is_ok() {
            self.state = PairingState::Success;
            info!("pairing succeeded");
        } else {
            warn!(error = ?result.as_ref().err(), "pairing failed while verifying code");
            self.state = PairingState::Failed;
        }
        result
    }

    async fn submit_code_inner(&mut self, pin: &str) -> Result<(), AtvError> {
        let server_cert_der = self
            .captured_cert
            .as_ref()
            .and_then(CapturedServerCert::get)
            .ok_or(AtvError::ServerCertNotAvailable)?;

        if self.server_public_key.is_none() {
            self.server_public_key = Some(extract_public_key(&server_cert_der)?);
        }

        let (client_mod, client_exp) = self.client_public_key.as_ref().ok_or(AtvError::ServerCertNotAvailable)?;
        let (server_mod, server_exp) = self.server_public_key.as_ref().ok_or(AtvError::ServerCertNotAvailable)?;

        let code_bytes = parse_pin(pin)?;
        let secret = compute_checked_secret(client_mod, client_exp, server_mod, server_exp, &code_bytes)?;

        self.send(&messages::pairing_secret(&secret)).await?;
        let envelope = self.expect_ack().await?;
        if envelope.status != 200 {
            return Err(AtvError::PairingRejected);
        }
        Ok(())
    }

    /// Cancel an in-flight attempt from any state, tearing down the
    /// connection and resetting to [`PairingState::Idle`].
    pub fn cancel(&mut self) {
        debug!(from = ?self.state, "cancelling pairing attempt");
        self.state = PairingState::Idle;
        self.stream = None;
        self.recv_buf.clear();
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), AtvError> {
        let stream = self.stream.as_mut().ok_or(AtvError::NotConnected)?;
        let framed = crate::wire::frame_message(payload);
        stream.write_all(&framed).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read exactly one framed pairing message, enforcing the 10-second
    /// per-step ceiling.
    async fn wait_for_message(&mut self) -> Result<ParsedEnvelope, AtvError> {
        loop {
            if let Some(msg) = extract_message(&mut self.recv_buf) {
                return messages::parse_envelope(&msg)
                    .ok_or_else(|| AtvError::InvalidResponse("malformed pairing envelope".to_string()));
            }

            let stream = self.stream.as_mut().ok_or(AtvError::NotConnected)?;
            let mut chunk = [0_u8; 4096];
            let read = timeout(self.wait_timeout, stream.read(&mut chunk))
                .await
                .map_err(|_| AtvError::Timeout)??;
            if read == 0 {
                return Err(AtvError::ConnectionFailed {
                    reason: "connection closed during pairing".to_string(),
                });
            }
            self.recv_buf.extend_from_slice(&chunk[..read]);
        }
    }

    async fn expect_ack(&mut self) -> Result<ParsedEnvelope, AtvError> {
        let envelope = self.wait_for_message().await?;
        if envelope.status != 200 {
            warn!(status = envelope.status, "pairing step rejected");
            return Err(AtvError::PairingRejected);
        }
        Ok(envelope)
    }
}

fn extract_public_key(cert_der: &[u8]) -> Result<(Vec<u8>, Vec<u8>), AtvError> {
    let parsed = parse_certificate(cert_der).map_err(|e| AtvError::InvalidResponse(format!("bad certificate: {e}")))?;
    parse_pkcs1_public_key(&parsed.public_key_der).map_err(|e| AtvError::InvalidResponse(format!("bad public key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_engine_starts_idle() {
        let engine = PairingEngine::new("test-client", Duration::from_secs(10), Duration::from_secs(10));
        assert_eq!(engine.state(), PairingState::Idle);
    }

    #[test]
    fn cancel_resets_to_idle() {
        let mut engine = PairingEngine::new("test-client", Duration::from_secs(10), Duration::from_secs(10));
        engine.state = PairingState::WaitingForCode;
        engine.cancel();
        assert_eq!(engine.state(), PairingState::Idle);
    }

    // S5: a full happy-path handshake requires a live TLS peer and is
    // exercised by the integration test suite instead of a unit test here.
}
