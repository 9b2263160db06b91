//! Key resolution: one resident AES-256 key per process, chosen by tier.
//!
//! # Tiers
//!
//! 1. **Hardware**: a named key held by the OS secure store, generated there on
//!    first run.
//! 2. **Derived**: `SHA-256(device_id || salt)`. Deterministic per device, so
//!    data sealed under it survives restarts without a secure store.
//! 3. **Ephemeral**: random bytes in memory. Data sealed under it cannot be
//!    opened after a restart.
//!
//! Every candidate must pass [`self_test`] before it becomes resident.
//!
//! # Security invariants
//!
//! - Key material is never logged, serialised or printed by `Debug`.
//! - A corrupted stored key is left untouched; resolution only falls through.

pub mod device;
pub mod handle;
pub mod provider;
pub mod store;

pub use device::{DeviceIdError, DeviceIdentity, MachineId};
pub use handle::{KeyHandle, KeyTier};
pub use provider::{self_test, KeyProvider, KeySettings, TierFailure};
pub use store::{KeyStoreError, KeyringStore, SecureKeyStore};

#[cfg(test)]
pub use device::MockDeviceIdentity;
#[cfg(test)]
pub use store::MockSecureKeyStore;

use thiserror::Error;

use crate::crypto::{CipherError, KEY_LEN};

/// Reasons a key tier was rejected.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The secure store tier is switched off in configuration.
    #[error("secure key store disabled")]
    Disabled,

    /// The secure store failed to report, generate or load the key.
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    /// The device identifier could not be obtained.
    #[error(transparent)]
    Device(#[from] DeviceIdError),

    /// Key material has an unexpected length.
    #[error("key material has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// Sealing or opening the known string failed.
    #[error("self-test failed: {0}")]
    SelfTest(#[from] CipherError),

    /// The known string opened to something other than what was sealed.
    #[error("self-test round trip mismatch")]
    SelfTestMismatch,
}
