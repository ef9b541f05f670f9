//! Identity store: generates, persists, retrieves, and exports the RSA-2048
//! key pair and self-signed certificate that stands in for the client's
//! identity across process restarts.

mod backend;

pub use backend::{FileBackend, IdentityBackend, MemoryBackend};

use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::RsaPrivateKey;

use crate::der::cert::{build_self_signed_certificate, parse_certificate};
use crate::error::AtvError;
use crate::rsakey::to_pkcs1_public_key_der;

/// Bump whenever the DER builder's output changes shape; any identity
/// persisted under a lower version is discarded and regenerated.
const CURRENT_CERT_VERSION: u32 = 3;

const KEY_PRIVATE_KEY: &str = "private_key";
const KEY_CERTIFICATE: &str = "certificate";
const KEY_CERT_VERSION: &str = "cert_version";

/// An RSA-2048 private key paired with the DER-encoded, self-signed
/// certificate built over its public half.
#[derive(Clone)]
pub struct Identity {
    private_key: RsaPrivateKey,
    certificate_der: Vec<u8>,
}

impl Identity {
    /// The DER-encoded self-signed certificate.
    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The private key, for TLS client-auth signing.
    #[must_use]
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }
}

/// Generates, persists, retrieves, and exports the client's [`Identity`]
/// against a pluggable [`IdentityBackend`].
pub struct IdentityStore {
    backend: Box<dyn IdentityBackend>,
    cached: Option<Identity>,
}

impl IdentityStore {
    /// Open a store against `backend`, applying the certificate-format
    /// version upgrade path: if a prior identity was persisted under an
    /// older format version, it is deleted so the next
    /// [`get_or_create_identity`](Self::get_or_create_identity) call
    /// regenerates a conforming one.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::KeychainError`] if the backend fails while
    /// checking or clearing the stored version.
    pub fn open(backend: Box<dyn IdentityBackend>) -> Result<Self, AtvError> {
        let stored_version = backend
            .load(KEY_CERT_VERSION)?
            .and_then(|bytes| bytes.first().copied())
            .map(u32::from);

        if stored_version.is_none_or(|v| v < CURRENT_CERT_VERSION) {
            let _ = backend.delete(KEY_PRIVATE_KEY);
            let _ = backend.delete(KEY_CERTIFICATE);
            backend.save(KEY_CERT_VERSION, &[CURRENT_CERT_VERSION as u8])?;
        }

        Ok(Self {
            backend,
            cached: None,
        })
    }

    /// Return the stored identity, generating and persisting one on first
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::NoIdentity`] if generation or persistence fails.
    pub fn get_or_create_identity(&mut self) -> Result<&Identity, AtvError> {
        if self.cached.is_some() {
            return Ok(self.cached.as_ref().expect("checked above"));
        }

        if let Some(identity) = self.load_persisted()? {
            self.cached = Some(identity);
            return Ok(self.cached.as_ref().expect("just inserted"));
        }

        let identity = generate_identity()?;
        self.persist(&identity)?;
        self.cached = Some(identity);
        Ok(self.cached.as_ref().expect("just inserted"))
    }

    /// The stored identity's client certificate, DER-encoded, if one has
    /// been materialized.
    #[must_use]
    pub fn get_client_certificate_der(&self) -> Option<Vec<u8>> {
        self.cached.as_ref().map(|id| id.certificate_der.clone())
    }

    /// The stored identity's private key, PKCS#1-exported, if one has been
    /// materialized.
    #[must_use]
    pub fn get_private_key_raw(&self) -> Option<Vec<u8>> {
        self.cached
            .as_ref()
            .and_then(|id| id.private_key.to_pkcs1_der().ok())
            .map(|doc| doc.as_bytes().to_vec())
    }

    /// Reconstruct an identity from raw PKCS#1 key bytes and a DER
    /// certificate received from a peer, validating that the two actually
    /// pair, then persist both.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::InvalidResponse`] if the key and certificate
    /// don't pair, or [`AtvError::KeychainError`] if persistence fails.
    pub fn import_identity(&mut self, key_bytes: &[u8], cert_bytes: &[u8]) -> Result<(), AtvError> {
        let private_key = RsaPrivateKey::from_pkcs1_der(key_bytes)
            .map_err(|e| AtvError::InvalidResponse(format!("invalid PKCS#1 key: {e}")))?;

        let parsed_cert = parse_certificate(cert_bytes)
            .map_err(|e| AtvError::InvalidResponse(format!("invalid certificate: {e}")))?;
        let derived_pub = to_pkcs1_public_key_der(&private_key.to_public_key());
        if derived_pub != parsed_cert.public_key_der {
            return Err(AtvError::InvalidResponse(
                "imported key does not match certificate's public key".into(),
            ));
        }

        let identity = Identity {
            private_key,
            certificate_der: cert_bytes.to_vec(),
        };
        self.persist(&identity)?;
        self.cached = Some(identity);
        Ok(())
    }

    fn load_persisted(&self) -> Result<Option<Identity>, AtvError> {
        let (Some(key_bytes), Some(cert_bytes)) =
            (self.backend.load(KEY_PRIVATE_KEY)?, self.backend.load(KEY_CERTIFICATE)?)
        else {
            return Ok(None);
        };

        let private_key = RsaPrivateKey::from_pkcs1_der(&key_bytes)
            .map_err(|e| AtvError::KeychainError(format!("corrupt stored private key: {e}")))?;

        Ok(Some(Identity {
            private_key,
            certificate_der: cert_bytes,
        }))
    }

    fn persist(&self, identity: &Identity) -> Result<(), AtvError> {
        let key_der = identity
            .private_key
            .to_pkcs1_der()
            .map_err(|e| AtvError::KeychainError(format!("failed to export private key: {e}")))?;
        self.backend.save(KEY_PRIVATE_KEY, key_der.as_bytes())?;
        self.backend.save(KEY_CERTIFICATE, &identity.certificate_der)?;
        self.backend.save(KEY_CERT_VERSION, &[CURRENT_CERT_VERSION as u8])?;
        Ok(())
    }
}

fn generate_identity() -> Result<Identity, AtvError> {
    let mut rng = rand::rngs::OsRng;
    let private_key =
        RsaPrivateKey::new(&mut rng, 2048).map_err(|e| AtvError::NoIdentity.tap_log(&e))?;

    #[allow(clippy::cast_possible_truncation)]
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let certificate_der = build_self_signed_certificate(&private_key, now)
        .map_err(|e| AtvError::NoIdentity.tap_log(&e))?;

    Ok(Identity {
        private_key,
        certificate_der,
    })
}

impl AtvError {
    /// Logs the underlying cause at `tracing::warn!` and returns `self`
    /// unchanged, for error sites where the taxonomy only has room for a
    /// coarse variant but the original cause is worth keeping in the logs.
    fn tap_log(self, cause: &impl std::fmt::Display) -> Self {
        tracing::warn!(%cause, "identity generation failed");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_caches_identity() {
        let mut store = IdentityStore::open(Box::new(MemoryBackend::new())).unwrap();
        let identity = store.get_or_create_identity().unwrap();
        assert!(!identity.certificate_der().is_empty());

        let der_first = store.get_client_certificate_der().unwrap();
        store.get_or_create_identity().unwrap();
        let der_second = store.get_client_certificate_der().unwrap();
        assert_eq!(der_first, der_second, "identity must be cached, not regenerated");
    }

    #[test]
    fn persists_across_store_instances() {
        let backend = MemoryBackend::new();
        let shared = backend.shared_handle();

        let mut store = IdentityStore::open(Box::new(backend)).unwrap();
        store.get_or_create_identity().unwrap();
        let cert = store.get_client_certificate_der().unwrap();

        let reopened_backend = MemoryBackend::from_shared(shared);
        let mut reopened = IdentityStore::open(Box::new(reopened_backend)).unwrap();
        let reloaded = reopened.get_or_create_identity().unwrap();
        assert_eq!(reloaded.certificate_der(), cert.as_slice());
    }

    #[test]
    fn old_cert_version_forces_regeneration() {
        let backend = MemoryBackend::new();
        backend.save(KEY_CERT_VERSION, &[1]).unwrap();
        backend.save(KEY_PRIVATE_KEY, b"stale").unwrap();
        backend.save(KEY_CERTIFICATE, b"stale").unwrap();

        let store = IdentityStore::open(Box::new(backend)).unwrap();
        assert!(store.backend.load(KEY_PRIVATE_KEY).unwrap().is_none());
    }

    #[test]
    fn import_rejects_mismatched_pair() {
        let mut store_a = IdentityStore::open(Box::new(MemoryBackend::new())).unwrap();
        let identity_a = store_a.get_or_create_identity().unwrap().clone();

        let mut store_b = IdentityStore::open(Box::new(MemoryBackend::new())).unwrap();
        store_b.get_or_create_identity().unwrap();
        let wrong_cert = store_b.get_client_certificate_der().unwrap();

        let key_bytes = identity_a.private_key.to_pkcs1_der().unwrap().as_bytes().to_vec();
        let mut store_c = IdentityStore::open(Box::new(MemoryBackend::new())).unwrap();
        assert!(store_c.import_identity(&key_bytes, &wrong_cert).is_err());
    }
}
