//! [`CipherEnvelope`]: the storage form of one encrypted value.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::cipher::{CipherError, NONCE_LEN};

/// Nonce plus sealed bytes (ciphertext with the GCM tag appended).
///
/// The text form is `base64(nonce || sealed)` using the standard alphabet
/// with padding. The alphabet has no `:`, so an envelope can never collide
/// with the `UNENCRYPTED:` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherEnvelope {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext followed by the authentication tag.
    pub sealed: Vec<u8>,
}

impl CipherEnvelope {
    /// Encode to the stored text form.
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(NONCE_LEN + self.sealed.len());
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.sealed);
        STANDARD.encode(raw)
    }

    /// Parse the stored text form.
    ///
    /// ASCII whitespace is skipped before decoding, so values written with
    /// MIME-style line wrapping and a trailing newline still parse.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Malformed`] if the text is not base64 or the
    /// decoded bytes are not longer than a nonce.
    pub fn decode(text: &str) -> Result<Self, CipherError> {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let raw = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| CipherError::Malformed)?;
        if raw.len() <= NONCE_LEN {
            return Err(CipherError::Malformed);
        }

        let (nonce_bytes, sealed) = raw.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self {
            nonce,
            sealed: sealed.to_vec(),
        })
    }
}
