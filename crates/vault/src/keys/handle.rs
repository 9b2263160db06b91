//! [`KeyHandle`]: the resident symmetric key and the tier it came from.

use std::fmt;

use zeroize::Zeroizing;

use super::KeyError;
use crate::crypto::KEY_LEN;

/// Strategy that produced a key, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTier {
    /// Generated inside and loaded from the OS secure key store.
    Hardware,
    /// `SHA-256(device_id || salt)`; re-derivable on the same device.
    Derived,
    /// Random bytes held only in memory; lost on restart.
    Ephemeral,
}

impl KeyTier {
    /// Lower-case name used in logs, metrics and the health response.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyTier::Hardware => "hardware",
            KeyTier::Derived => "derived",
            KeyTier::Ephemeral => "ephemeral",
        }
    }

    /// Whether data sealed under a key of this tier can be opened after a restart.
    pub fn is_durable(&self) -> bool {
        !matches!(self, KeyTier::Ephemeral)
    }
}

impl fmt::Display for KeyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly [`KEY_LEN`] bytes of AES key material tagged with its tier.
///
/// Not `Clone`: the provider owns one handle and shares it behind an `Arc`.
/// The bytes are overwritten with zeroes on drop.
pub struct KeyHandle {
    tier: KeyTier,
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl KeyHandle {
    /// Wrap key material of the right length.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if `material` is not [`KEY_LEN`] bytes.
    pub(crate) fn from_slice(tier: KeyTier, material: &[u8]) -> Result<Self, KeyError> {
        if material.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(material.len()));
        }
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(material);
        Ok(Self { tier, bytes })
    }

    pub(crate) fn from_array(tier: KeyTier, bytes: Zeroizing<[u8; KEY_LEN]>) -> Self {
        Self { tier, bytes }
    }

    /// Tier this key was resolved from.
    pub fn tier(&self) -> KeyTier {
        self.tier
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.debug_struct("KeyHandle")
            .field("tier", &self.tier)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
