//! Credential backends the identity store persists blobs against.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::AtvError;

/// A keyed blob store: load, save, delete. This is the abstraction the
/// identity store is built against; a real OS keychain integration would
/// implement this trait in place of [`FileBackend`].
pub trait IdentityBackend: Send + Sync {
    /// Load the blob stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::KeychainError`] on a backend I/O or decode failure.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AtvError>;

    /// Store `data` under `key`, overwriting any prior value.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::KeychainError`] on a backend I/O failure.
    fn save(&self, key: &str, data: &[u8]) -> Result<(), AtvError>;

    /// Remove the blob stored under `key`, if any. Not an error if absent.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::KeychainError`] on a backend I/O failure.
    fn delete(&self, key: &str) -> Result<(), AtvError>;
}

/// In-memory backend, used in tests and for transient (non-persistent)
/// sessions.
#[derive(Default)]
pub struct MemoryBackend {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// A fresh, empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to this backend's underlying storage, so a second
    /// `MemoryBackend` can observe the same data (simulating persistence
    /// across store instances in tests).
    #[must_use]
    pub fn shared_handle(&self) -> Arc<Mutex<HashMap<String, Vec<u8>>>> {
        Arc::clone(&self.data)
    }

    /// Construct a backend sharing storage with a handle obtained from
    /// [`shared_handle`](Self::shared_handle).
    #[must_use]
    pub fn from_shared(data: Arc<Mutex<HashMap<String, Vec<u8>>>>) -> Self {
        Self { data }
    }
}

impl IdentityBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AtvError> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), AtvError> {
        self.data
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AtvError> {
        self.data.lock().expect("lock poisoned").remove(key);
        Ok(())
    }
}

/// File-backed backend: one file per named blob under `directory`.
pub struct FileBackend {
    directory: PathBuf,
}

impl FileBackend {
    /// Use `directory` as the backing store, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::Io`] if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, AtvError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.bin"))
    }
}

impl IdentityBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AtvError> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), AtvError> {
        fs::write(self.path_for(key), data)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AtvError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) | Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        backend.save("k", b"v").unwrap();
        assert_eq!(backend.load("k").unwrap(), Some(b"v".to_vec()));
        backend.delete("k").unwrap();
        assert_eq!(backend.load("k").unwrap(), None);
    }

    #[test]
    fn memory_backend_round_trips() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load("k").unwrap(), None);
        backend.save("k", b"v").unwrap();
        assert_eq!(backend.load("k").unwrap(), Some(b"v".to_vec()));
        backend.delete("k").unwrap();
        assert_eq!(backend.load("k").unwrap(), None);
    }
}
