//! [`KeyProvider`]: resolves the one resident key through the tier chain.

use std::sync::Arc;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{DeviceIdError, DeviceIdentity, KeyError, KeyHandle, KeyTier, SecureKeyStore};
use crate::crypto::{build_cipher, cipher, KEY_LEN};

/// Known string sealed and opened by [`self_test`].
pub const SELF_TEST_PLAINTEXT: &str = "test";

/// Default name of the key in the secure store.
pub const DEFAULT_KEY_ALIAS: &str = "BudgetWiseKey";

/// Default application salt appended to the device id before hashing.
pub const DEFAULT_DERIVATION_SALT: &str = "BudgetWiseSalt123";

/// Inputs that shape the hardware and derived tiers.
#[derive(Debug, Clone)]
pub struct KeySettings {
    /// Name of the key in the secure store.
    pub alias: String,
    /// Fixed application salt for the derived tier. Changing it orphans
    /// everything sealed under a derived key.
    pub salt: String,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            alias: DEFAULT_KEY_ALIAS.into(),
            salt: DEFAULT_DERIVATION_SALT.into(),
        }
    }
}

/// A tier that was attempted and rejected during resolution.
#[derive(Debug)]
pub struct TierFailure {
    pub tier: KeyTier,
    pub error: KeyError,
}

/// Owner of the single validated [`KeyHandle`] for this process.
///
/// Built once by [`KeyProvider::initialize`] and immutable afterwards, so it
/// can be read from any thread without locking.
pub struct KeyProvider {
    handle: Arc<KeyHandle>,
    failures: Vec<TierFailure>,
    device: Arc<dyn DeviceIdentity>,
}

impl KeyProvider {
    /// Resolve a key, trying hardware, then derived, then ephemeral.
    ///
    /// Never fails: every rejected tier is recorded in [`failures`](Self::failures)
    /// and the chain ends with a random in-memory key if nothing better works.
    /// Passing `None` for `store` skips the hardware tier.
    ///
    /// Blocking: keystore backends may perform IPC.
    pub fn initialize(
        store: Option<&dyn SecureKeyStore>,
        device: Arc<dyn DeviceIdentity>,
        settings: &KeySettings,
    ) -> Self {
        let mut failures = Vec::new();

        let hardware = match store {
            Some(store) => hardware_key(store, &settings.alias).and_then(validated),
            None => Err(KeyError::Disabled),
        };
        let handle = match hardware {
            Ok(handle) => handle,
            Err(error) => {
                failures.push(TierFailure {
                    tier: KeyTier::Hardware,
                    error,
                });
                match derived_key(device.as_ref(), &settings.salt).and_then(validated) {
                    Ok(handle) => handle,
                    Err(error) => {
                        failures.push(TierFailure {
                            tier: KeyTier::Derived,
                            error,
                        });
                        let handle = ephemeral_key();
                        // Last tier: keep it even if the self-test fails.
                        if let Err(error) = self_test(&handle) {
                            failures.push(TierFailure {
                                tier: KeyTier::Ephemeral,
                                error,
                            });
                        }
                        handle
                    }
                }
            }
        };

        Self {
            handle: Arc::new(handle),
            failures,
            device,
        }
    }

    /// Shared reference to the resident key.
    pub fn handle(&self) -> Arc<KeyHandle> {
        Arc::clone(&self.handle)
    }

    /// Tier of the resident key.
    pub fn tier(&self) -> KeyTier {
        self.handle.tier()
    }

    /// Tiers rejected on the way to the resident key, in the order tried.
    pub fn failures(&self) -> &[TierFailure] {
        &self.failures
    }

    /// Device identity source used by the derived tier.
    pub fn device(&self) -> Arc<dyn DeviceIdentity> {
        Arc::clone(&self.device)
    }
}

/// Load the named key from `store`, generating it inside the store on first run.
///
/// # Errors
///
/// Returns [`KeyError::KeyStore`] if any store call fails and
/// [`KeyError::InvalidLength`] if the stored key is not an AES-256 key.
pub fn hardware_key(store: &dyn SecureKeyStore, alias: &str) -> Result<KeyHandle, KeyError> {
    if !store.contains(alias)? {
        store.generate(alias)?;
    }
    let material = store.load(alias)?;
    KeyHandle::from_slice(KeyTier::Hardware, &material)
}

/// Derive `SHA-256(device_id || salt)` as an AES-256 key.
///
/// # Errors
///
/// Returns [`KeyError::Device`] if the identifier is unavailable or blank.
pub fn derived_key(device: &dyn DeviceIdentity, salt: &str) -> Result<KeyHandle, KeyError> {
    let id = Zeroizing::new(device.device_id()?);
    if id.trim().is_empty() {
        return Err(DeviceIdError::Empty.into());
    }

    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(salt.as_bytes());
    let mut material = Zeroizing::new([0u8; KEY_LEN]);
    material.copy_from_slice(&hasher.finalize());

    Ok(KeyHandle::from_array(KeyTier::Derived, material))
}

/// Draw [`KEY_LEN`] random bytes from the OS CSPRNG.
pub fn ephemeral_key() -> KeyHandle {
    let mut material = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut material[..]);
    KeyHandle::from_array(KeyTier::Ephemeral, material)
}

/// Seal [`SELF_TEST_PLAINTEXT`] with `handle`, open it again and compare.
///
/// # Errors
///
/// Returns [`KeyError::SelfTest`] if sealing or opening fails and
/// [`KeyError::SelfTestMismatch`] if the round trip changes the known string.
pub fn self_test(handle: &KeyHandle) -> Result<(), KeyError> {
    let cipher = build_cipher(handle.as_bytes())?;
    let envelope = cipher::seal(&cipher, SELF_TEST_PLAINTEXT.as_bytes())?;
    let opened = cipher::open(&cipher, &envelope)?;
    if opened != SELF_TEST_PLAINTEXT.as_bytes() {
        return Err(KeyError::SelfTestMismatch);
    }
    Ok(())
}

fn validated(handle: KeyHandle) -> Result<KeyHandle, KeyError> {
    self_test(&handle)?;
    Ok(handle)
}
