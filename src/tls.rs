//! TLS connection setup for both the pairing port and the remote-control
//! port: trust-on-first-use server verification plus mutual client
//! authentication with the locally generated identity certificate.
//!
//! The server's certificate is never checked against a CA; the protocol's
//! actual trust anchor is the PIN the user reads off the TV screen during
//! pairing. [`TofuCertVerifier`] always accepts the presented chain and
//! hands the leaf certificate's DER bytes back through a shared slot so the
//! pairing engine can include it in the secret derivation.

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument, warn};

use crate::error::AtvError;
use crate::identity::Identity;

/// Shared slot the verifier drops the server's leaf certificate DER into,
/// read back out once the handshake completes.
#[derive(Clone, Default)]
pub struct CapturedServerCert(Arc<Mutex<Option<Vec<u8>>>>);

impl CapturedServerCert {
    /// A fresh, empty capture slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured leaf certificate DER, if a handshake has completed.
    #[must_use]
    pub fn get(&self) -> Option<Vec<u8>> {
        self.0.lock().expect("capture mutex poisoned").clone()
    }
}

/// A [`ServerCertVerifier`] that accepts any certificate chain unconditionally
/// and records the leaf certificate's DER bytes.
///
/// This is intentionally not a general-purpose TLS trust policy: it is only
/// sound because the protocol's actual authentication is the PIN exchanged
/// out of band, not the TLS certificate.
#[derive(Debug)]
pub struct TofuCertVerifier {
    captured: CapturedServerCert,
}

impl TofuCertVerifier {
    fn new(captured: CapturedServerCert) -> Arc<Self> {
        Arc::new(Self { captured })
    }
}

impl ServerCertVerifier for TofuCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        *self.captured.0.lock().expect("capture mutex poisoned") = Some(end_entity.to_vec());
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build a mutual-auth `ClientConfig` that trusts any server certificate
/// (capturing it into `captured`) and presents `identity`'s certificate and
/// key for client authentication.
///
/// # Errors
///
/// Returns [`AtvError::Tls`] if the identity's key isn't one rustls can sign
/// with under this config.
pub fn build_client_config(identity: &Identity, captured: CapturedServerCert) -> Result<ClientConfig, AtvError> {
    ensure_crypto_provider_installed();

    let cert_chain = vec![CertificateDer::from(identity.certificate_der().to_vec())];
    let key_der = identity
        .private_key()
        .to_pkcs1_der()
        .map_err(|e| AtvError::KeychainError(format!("failed to export private key for TLS: {e}")))?;
    let private_key = PrivateKeyDer::Pkcs1(key_der.as_bytes().to_vec().into());

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(TofuCertVerifier::new(captured))
        .with_client_auth_cert(cert_chain, private_key)?;

    Ok(config)
}

static CRYPTO_PROVIDER_INIT: Once = Once::new();

/// Install the ring crypto provider as rustls's process-wide default, once.
/// Safe to call from every connection attempt; later calls are no-ops.
fn ensure_crypto_provider_installed() {
    CRYPTO_PROVIDER_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Connect to `host:port` and complete a mutual-auth TLS handshake,
/// returning the stream and a handle to the captured server certificate.
///
/// The whole operation — TCP connect plus TLS handshake — is bounded by
/// `handshake_timeout`; exceeding it surfaces as [`AtvError::Timeout`].
///
/// # Errors
///
/// Returns [`AtvError::Io`] if the TCP connection fails,
/// [`AtvError::Tls`] if the handshake fails, or [`AtvError::Timeout`] if
/// `handshake_timeout` elapses first.
#[instrument(skip(identity))]
pub async fn connect(
    host: &str,
    port: u16,
    identity: &Identity,
    handshake_timeout: Duration,
) -> Result<(TlsStream<TcpStream>, CapturedServerCert), AtvError> {
    debug!("opening TLS connection");
    let result = tokio::time::timeout(handshake_timeout, connect_inner(host, port, identity))
        .await
        .map_err(|_| AtvError::Timeout)?;
    match &result {
        Ok(_) => debug!("TLS handshake complete"),
        Err(err) => warn!(error = %err, "TLS connect failed"),
    }
    result
}

async fn connect_inner(
    host: &str,
    port: u16,
    identity: &Identity,
) -> Result<(TlsStream<TcpStream>, CapturedServerCert), AtvError> {
    let captured = CapturedServerCert::new();
    let config = build_client_config(identity, captured.clone())?;
    let connector = TlsConnector::from(Arc::new(config));

    let tcp = TcpStream::connect((host, port)).await?;
    tcp.set_nodelay(true).ok();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| AtvError::ConnectionFailed {
            reason: format!("invalid server name: {host}"),
        })?;

    let stream = connector.connect(server_name, tcp).await?;
    Ok((stream, captured))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_cert_starts_empty() {
        let captured = CapturedServerCert::new();
        assert!(captured.get().is_none());
    }

    #[test]
    fn captured_cert_round_trips_through_verifier() {
        let captured = CapturedServerCert::new();
        let verifier = TofuCertVerifier::new(captured.clone());
        let fake_leaf = CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01, 0x01]);
        let server_name = ServerName::try_from("192.168.1.1".to_string()).unwrap();

        let result = verifier.verify_server_cert(&fake_leaf, &[], &server_name, &[], UnixTime::now());
        assert!(result.is_ok());
        assert_eq!(captured.get(), Some(fake_leaf.to_vec()));
    }
}
