//! [`SecureKeyStore`]: named key storage backed by the operating system.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::KEY_LEN;

/// Errors produced by a key store backend.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The backend could not be reached or refused the operation.
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// No key is stored under the requested alias.
    #[error("no key stored under alias {0}")]
    Missing(String),

    /// The stored value could not be decoded back into key bytes.
    #[error("stored key under alias {0} is corrupted")]
    Corrupted(String),
}

/// Generate-and-load access to keys held by a secure store.
///
/// Mirrors the three calls the hardware tier needs: an existence check,
/// in-store generation on first run, and loading the key by name.
#[cfg_attr(test, mockall::automock)]
pub trait SecureKeyStore: Send + Sync {
    /// Whether a key is stored under `alias`.
    fn contains(&self, alias: &str) -> Result<bool, KeyStoreError>;

    /// Create a new random AES-256 key under `alias`.
    fn generate(&self, alias: &str) -> Result<(), KeyStoreError>;

    /// Load the key stored under `alias`.
    fn load(&self, alias: &str) -> Result<Zeroizing<Vec<u8>>, KeyStoreError>;
}

/// Key store backed by the platform credential manager via `keyring`.
///
/// Dispatches to the macOS Keychain, Windows Credential Manager or the Linux
/// Secret Service. Key bytes are stored base64-encoded under
/// `(service, alias)`.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a store whose entries live under `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, alias: &str) -> Result<keyring::Entry, KeyStoreError> {
        keyring::Entry::new(&self.service, alias)
            .map_err(|e| KeyStoreError::Unavailable(format!("failed to open entry: {e}")))
    }
}

impl SecureKeyStore for KeyringStore {
    fn contains(&self, alias: &str) -> Result<bool, KeyStoreError> {
        match self.entry(alias)?.get_password() {
            Ok(stored) => {
                drop(Zeroizing::new(stored));
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(KeyStoreError::Unavailable(e.to_string())),
        }
    }

    fn generate(&self, alias: &str) -> Result<(), KeyStoreError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        let encoded = Zeroizing::new(STANDARD.encode(&key[..]));

        self.entry(alias)?
            .set_password(&encoded)
            .map_err(|e| KeyStoreError::Unavailable(format!("failed to store key: {e}")))
    }

    fn load(&self, alias: &str) -> Result<Zeroizing<Vec<u8>>, KeyStoreError> {
        let stored = match self.entry(alias)?.get_password() {
            Ok(stored) => Zeroizing::new(stored),
            Err(keyring::Error::NoEntry) => return Err(KeyStoreError::Missing(alias.to_owned())),
            Err(e) => return Err(KeyStoreError::Unavailable(e.to_string())),
        };

        STANDARD
            .decode(stored.trim().as_bytes())
            .map(Zeroizing::new)
            .map_err(|_| KeyStoreError::Corrupted(alias.to_owned()))
    }
}
