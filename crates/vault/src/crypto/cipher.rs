//! AES-256-GCM sealing and opening of byte strings.
//!
//! Every seal draws a fresh 96-bit nonce from the OS CSPRNG. Plain GCM is
//! catastrophically broken by nonce reuse under one key, so callers never
//! supply their own nonce for sealing.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

use super::envelope::CipherEnvelope;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// AES-GCM sealing failed.
    #[error("aead seal failed")]
    SealFailure,

    /// AES-GCM opening failed: wrong key, tampered bytes or truncated tag.
    #[error("aead open failed")]
    OpenFailure,

    /// The envelope text is not base64 or is too short to hold a nonce.
    #[error("malformed envelope")]
    Malformed,
}

/// Build an AES-256-GCM cipher from raw key bytes.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
pub fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

/// Seal `plaintext` under a freshly generated nonce.
///
/// # Errors
///
/// Returns [`CipherError::SealFailure`] on an internal AEAD error (only
/// reachable for plaintexts beyond the GCM length limit).
pub fn seal(cipher: &Aes256Gcm, plaintext: &[u8]) -> Result<CipherEnvelope, CipherError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CipherError::SealFailure)?;

    Ok(CipherEnvelope { nonce, sealed })
}

/// Open a [`CipherEnvelope`] back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CipherError::OpenFailure`] if authentication fails.
pub fn open(cipher: &Aes256Gcm, envelope: &CipherEnvelope) -> Result<Vec<u8>, CipherError> {
    cipher
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.sealed.as_ref())
        .map_err(|_| CipherError::OpenFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_cipher() -> Aes256Gcm {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        build_cipher(&key).unwrap()
    }

    #[test]
    fn seal_open_round_trip() {
        let cipher = random_cipher();
        let envelope = seal(&cipher, b"rent: 1450.00").unwrap();
        assert_eq!(open(&cipher, &envelope).unwrap(), b"rent: 1450.00");
    }

    #[test]
    fn sealed_bytes_carry_tag() {
        let cipher = random_cipher();
        let envelope = seal(&cipher, b"abc").unwrap();
        assert_eq!(envelope.sealed.len(), 3 + TAG_LEN);
    }

    #[test]
    fn fresh_nonce_per_seal() {
        let cipher = random_cipher();
        let a = seal(&cipher, b"same").unwrap();
        let b = seal(&cipher, b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.sealed, b.sealed);
    }

    #[test]
    fn wrong_key_fails_open() {
        let envelope = seal(&random_cipher(), b"secret").unwrap();
        assert!(matches!(
            open(&random_cipher(), &envelope),
            Err(CipherError::OpenFailure)
        ));
    }

    #[test]
    fn invalid_key_length_rejected() {
        assert!(matches!(
            build_cipher(&[0u8; 16]),
            Err(CipherError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn truncated_tag_fails_open() {
        let cipher = random_cipher();
        let mut envelope = seal(&cipher, b"groceries").unwrap();
        envelope.sealed.pop();
        assert!(open(&cipher, &envelope).is_err());
    }
}
