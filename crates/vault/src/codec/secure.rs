//! [`SecureCodec`]: string encryption and message authentication over the resident key.

use std::time::{SystemTime, UNIX_EPOCH};

use aes_gcm::{
    aead::{rand_core::RngCore, OsRng},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::{error, warn};
use zeroize::Zeroizing;

use super::marker;
use crate::crypto::{build_cipher, cipher, CipherEnvelope, CipherError};
use crate::keys::{DeviceIdentity, KeyProvider, KeyTier};
use crate::telemetry::{DecryptFailure, VaultMetrics};

type HmacSha256 = Hmac<Sha256>;

/// Why a `try_` operation could not produce its value.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Sealing failed; the total [`SecureCodec::encrypt`] stores the value marked instead.
    #[error("encryption failed: {0}")]
    Encrypt(#[source] CipherError),

    /// The stored text is not base64 or is too short to hold a nonce.
    #[error("malformed envelope")]
    Malformed,

    /// Authentication failed, or the opened bytes are not UTF-8.
    #[error("envelope rejected")]
    Rejected,

    /// No cipher could be built over the resident key.
    #[error("cipher unavailable")]
    Unavailable,

    /// The HMAC could not be keyed.
    #[error("mac computation failed")]
    Mac,
}

/// Authenticated encryption of strings for the persistence layer.
///
/// Holds a cipher keyed with the resident key and an ephemeral MAC signing
/// key. Every method takes `&self` and touches no mutable state, so a
/// single instance can be shared across threads behind an `Arc`.
///
/// The four total operations (`encrypt`, `decrypt`, `mac`, `verify`) never
/// fail; they log, count and return a safe default. The `try_` forms return
/// the typed error instead.
pub struct SecureCodec {
    tier: KeyTier,
    cipher: Option<Aes256Gcm>,
    mac_key: Zeroizing<Vec<u8>>,
    metrics: VaultMetrics,
}

impl SecureCodec {
    /// Build a codec over the provider's resident key.
    pub fn new(provider: &KeyProvider) -> Self {
        Self::with_metrics(provider, VaultMetrics::new())
    }

    /// Build a codec that reports degraded outcomes to `metrics`.
    pub fn with_metrics(provider: &KeyProvider, metrics: VaultMetrics) -> Self {
        let key = provider.handle();
        let cipher = match build_cipher(key.as_bytes()) {
            Ok(cipher) => Some(cipher),
            Err(err) => {
                error!(
                    tier = %key.tier(),
                    error = %err,
                    "resident key unusable; encryption disabled"
                );
                None
            }
        };
        Self {
            tier: key.tier(),
            cipher,
            mac_key: signing_key(provider.device().as_ref()),
            metrics,
        }
    }

    /// Tier of the key this codec encrypts with.
    pub fn tier(&self) -> KeyTier {
        self.tier
    }

    // -----------------------------------------------------------------------
    // Encryption
    // -----------------------------------------------------------------------

    /// Encrypt `plaintext` to `base64(nonce || ciphertext || tag)`.
    ///
    /// Empty input encrypts to the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unavailable`] if no cipher was built and
    /// [`CodecError::Encrypt`] if sealing fails.
    pub fn try_encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let cipher = self.cipher.as_ref().ok_or(CodecError::Unavailable)?;
        let envelope = cipher::seal(cipher, plaintext.as_bytes()).map_err(CodecError::Encrypt)?;
        Ok(envelope.encode())
    }

    /// Encrypt `plaintext`, or store it behind the `UNENCRYPTED:` marker if
    /// encryption is unavailable.
    pub fn encrypt(&self, plaintext: &str) -> String {
        match self.try_encrypt(plaintext) {
            Ok(envelope) => envelope,
            Err(err) => self.degrade(plaintext, &err),
        }
    }

    fn degrade(&self, plaintext: &str, err: &CodecError) -> String {
        warn!(error = %err, "encryption unavailable; storing value unprotected");
        self.metrics.plaintext_fallback();
        marker::mark(plaintext)
    }

    /// Decrypt a stored value.
    ///
    /// Empty input decrypts to the empty string. Marked values are returned
    /// without the marker and without any cryptographic work.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] for undecodable or short input and
    /// [`CodecError::Rejected`] when authentication fails.
    pub fn try_decrypt(&self, stored: &str) -> Result<String, CodecError> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        if let Some(raw) = marker::strip(stored) {
            return Ok(raw.to_owned());
        }

        let envelope = CipherEnvelope::decode(stored).map_err(|_| CodecError::Malformed)?;
        let cipher = self.cipher.as_ref().ok_or(CodecError::Rejected)?;
        let opened = cipher::open(cipher, &envelope).map_err(|_| CodecError::Rejected)?;
        String::from_utf8(opened).map_err(|_| CodecError::Rejected)
    }

    /// Decrypt a stored value, returning the empty string if it is corrupted,
    /// tampered with or sealed under another key.
    ///
    /// Callers cannot tell those cases apart.
    pub fn decrypt(&self, stored: &str) -> String {
        match self.try_decrypt(stored) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                let kind = match err {
                    CodecError::Malformed => DecryptFailure::Malformed,
                    _ => DecryptFailure::Rejected,
                };
                error!(error = %err, "decryption failed; returning empty value");
                self.metrics.decrypt_failure(kind);
                String::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Message authentication
    // -----------------------------------------------------------------------

    /// HMAC-SHA-256 of `data` under this codec's signing key, base64-encoded.
    ///
    /// The signing key lives only as long as this codec, so a tag is only
    /// meaningful to [`verify`](Self::verify) on the same instance. Do not
    /// persist tags.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Mac`] if the HMAC cannot be keyed.
    pub fn try_mac(&self, data: &str) -> Result<String, CodecError> {
        let mut mac = self.hmac()?;
        mac.update(data.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Like [`try_mac`](Self::try_mac), returning the empty string on failure.
    pub fn mac(&self, data: &str) -> String {
        match self.try_mac(data) {
            Ok(tag) => tag,
            Err(err) => {
                warn!(error = %err, "mac computation failed");
                self.metrics.mac_failure();
                String::new()
            }
        }
    }

    /// Whether `expected` is the tag [`mac`](Self::mac) produces for `data`.
    ///
    /// Compared in constant time. Returns `false` for empty or undecodable
    /// tags and on any internal failure.
    pub fn verify(&self, data: &str, expected: &str) -> bool {
        let expected = match STANDARD.decode(expected.trim().as_bytes()) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return false,
        };
        let mut mac = match self.hmac() {
            Ok(mac) => mac,
            Err(err) => {
                warn!(error = %err, "mac verification failed");
                self.metrics.mac_failure();
                return false;
            }
        };
        mac.update(data.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    fn hmac(&self) -> Result<HmacSha256, CodecError> {
        HmacSha256::new_from_slice(&self.mac_key).map_err(|_| CodecError::Mac)
    }
}

impl std::fmt::Debug for SecureCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureCodec")
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

/// Random bytes used in place of a missing device identifier.
const FALLBACK_ID_LEN: usize = 32;

/// Random bytes appended so two codecs never share a signing key.
const INSTANCE_NONCE_LEN: usize = 16;

/// `device_id || issued_at_millis || instance_nonce`. Random bytes stand in
/// for the device identifier when it is unavailable.
fn signing_key(device: &dyn DeviceIdentity) -> Zeroizing<Vec<u8>> {
    let issued_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut material = match device.device_id() {
        Ok(id) if !id.trim().is_empty() => Zeroizing::new(id.into_bytes()),
        _ => {
            let mut random = Zeroizing::new(vec![0u8; FALLBACK_ID_LEN]);
            OsRng.fill_bytes(&mut random);
            random
        }
    };
    material.extend_from_slice(issued_at.to_string().as_bytes());

    let mut instance = [0u8; INSTANCE_NONCE_LEN];
    OsRng.fill_bytes(&mut instance);
    material.extend_from_slice(&instance);
    material
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::NONCE_LEN;
    use crate::keys::{
        DeviceIdError, KeySettings, KeyStoreError, MockDeviceIdentity, MockSecureKeyStore,
    };

    fn device(id: &'static str) -> Arc<dyn DeviceIdentity> {
        let mut mock = MockDeviceIdentity::new();
        mock.expect_device_id().returning(move || Ok(id.to_owned()));
        Arc::new(mock)
    }

    fn no_device() -> Arc<dyn DeviceIdentity> {
        let mut mock = MockDeviceIdentity::new();
        mock.expect_device_id()
            .returning(|| Err(DeviceIdError::NotFound));
        Arc::new(mock)
    }

    fn broken_store() -> MockSecureKeyStore {
        let mut store = MockSecureKeyStore::new();
        store
            .expect_contains()
            .returning(|_| Err(KeyStoreError::Unavailable("keystore offline".into())));
        store
    }

    fn derived_codec(id: &'static str) -> SecureCodec {
        let store = broken_store();
        let provider = KeyProvider::initialize(Some(&store), device(id), &KeySettings::default());
        assert_eq!(provider.tier(), KeyTier::Derived);
        SecureCodec::new(&provider)
    }

    fn ephemeral_codec() -> SecureCodec {
        let store = broken_store();
        let provider = KeyProvider::initialize(Some(&store), no_device(), &KeySettings::default());
        assert_eq!(provider.tier(), KeyTier::Ephemeral);
        SecureCodec::new(&provider)
    }

    fn hardware_codec() -> SecureCodec {
        let mut store = MockSecureKeyStore::new();
        store.expect_contains().returning(|_| Ok(true));
        store
            .expect_load()
            .returning(|_| Ok(Zeroizing::new(vec![0x5Au8; 32])));
        let provider = KeyProvider::initialize(Some(&store), device("dev"), &KeySettings::default());
        assert_eq!(provider.tier(), KeyTier::Hardware);
        SecureCodec::new(&provider)
    }

    #[test]
    fn round_trip_on_every_tier() {
        for codec in [hardware_codec(), derived_codec("dev"), ephemeral_codec()] {
            for s in ["a", "Groceries: $82.17", "loyer 750 €", "日本円 ¥12,000", "🏦💸"] {
                assert_eq!(codec.decrypt(&codec.encrypt(s)), s);
            }
        }
    }

    #[test]
    fn empty_input_is_noop() {
        let codec = derived_codec("dev");
        assert_eq!(codec.encrypt(""), "");
        assert_eq!(codec.decrypt(""), "");
    }

    #[test]
    fn envelope_layout() {
        let codec = derived_codec("dev");
        let envelope = codec.encrypt("salary");
        assert_eq!(marker::strip(&envelope), None);
        let raw = STANDARD.decode(&envelope).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + "salary".len() + crate::crypto::TAG_LEN);
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let codec = derived_codec("dev");
        assert_ne!(codec.encrypt("rent"), codec.encrypt("rent"));
    }

    #[test]
    fn marked_values_are_returned_verbatim() {
        let codec = derived_codec("dev");
        assert_eq!(codec.decrypt("UNENCRYPTED:note to self"), "note to self");
        assert_eq!(codec.decrypt("UNENCRYPTED:"), "");
        assert_eq!(
            codec.try_decrypt("UNENCRYPTED:not*base64").unwrap(),
            "not*base64"
        );
    }

    #[test]
    fn encrypt_without_cipher_stores_marked_value() {
        let sealed = derived_codec("dev").encrypt("savings 300");
        let codec = SecureCodec {
            cipher: None,
            ..derived_codec("dev")
        };
        assert!(matches!(
            codec.try_encrypt("savings 300"),
            Err(CodecError::Unavailable)
        ));

        let stored = codec.encrypt("savings 300");
        assert_eq!(stored, "UNENCRYPTED:savings 300");
        assert_eq!(codec.decrypt(&stored), "savings 300");
        assert_eq!(codec.decrypt(&sealed), "");
    }

    #[test]
    fn any_flipped_byte_is_rejected() {
        let codec = derived_codec("dev");
        let raw = STANDARD.decode(codec.encrypt("paycheck 2100.00")).unwrap();
        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let text = STANDARD.encode(&tampered);
            assert_eq!(codec.decrypt(&text), "", "byte {i} accepted after flip");
            assert!(matches!(
                codec.try_decrypt(&text),
                Err(CodecError::Rejected)
            ));
        }
    }

    #[test]
    fn short_envelope_is_malformed() {
        let codec = derived_codec("dev");
        let mut short = [0u8; 11];
        OsRng.fill_bytes(&mut short);
        let text = STANDARD.encode(short);
        assert_eq!(codec.decrypt(&text), "");
        assert!(matches!(codec.try_decrypt(&text), Err(CodecError::Malformed)));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = derived_codec("dev");
        assert_eq!(codec.decrypt("%%% definitely not base64 %%%"), "");
    }

    #[test]
    fn other_device_cannot_decrypt() {
        let envelope = derived_codec("phone-a").encrypt("balance 5000");
        assert_eq!(derived_codec("phone-b").decrypt(&envelope), "");
    }

    #[test]
    fn derived_key_survives_restart() {
        let envelope = derived_codec("laptop").encrypt("emergency fund");
        // A fresh provider and codec stand in for the next process.
        assert_eq!(derived_codec("laptop").decrypt(&envelope), "emergency fund");
    }

    #[test]
    fn legacy_wrapped_base64_decrypts() {
        let codec = derived_codec("dev");
        let envelope = codec.encrypt("a longer memo that spans more than one base64 line of output");
        let wrapped = format!("{}\n{}\n", &envelope[..40], &envelope[40..]);
        assert_eq!(
            codec.decrypt(&wrapped),
            "a longer memo that spans more than one base64 line of output"
        );
    }

    #[test]
    fn mac_verifies_back_to_back() {
        let codec = derived_codec("dev");
        for data in ["", "budget:2024-05", "ünïcödé"] {
            assert!(codec.verify(data, &codec.mac(data)));
        }
    }

    #[test]
    fn mac_rejects_other_data() {
        let codec = derived_codec("dev");
        assert!(!codec.verify("budget:2024-05", &codec.mac("budget:2024-06")));
    }

    #[test]
    fn mac_rejects_bad_tags() {
        let codec = derived_codec("dev");
        assert!(!codec.verify("x", ""));
        assert!(!codec.verify("x", "not base64!"));
        assert!(!codec.verify("x", "AAAA"));
    }

    #[test]
    fn mac_is_bound_to_codec_instance() {
        // Same device, built back to back: usually within one millisecond.
        let first = derived_codec("dev");
        let second = derived_codec("dev");
        assert!(!second.verify("x", &first.mac("x")));
        assert!(first.verify("x", &first.mac("x")));

        let first = ephemeral_codec();
        let second = ephemeral_codec();
        assert!(!second.verify("x", &first.mac("x")));
    }

    #[test]
    fn mac_works_without_device_id() {
        let codec = ephemeral_codec();
        assert!(codec.verify("report", &codec.mac("report")));
    }

    #[test]
    fn concurrent_use_is_safe() {
        let codec = derived_codec("dev");
        std::thread::scope(|scope| {
            for t in 0..8 {
                let codec = &codec;
                scope.spawn(move || {
                    for i in 0..50 {
                        let value = format!("thread {t} entry {i}");
                        assert_eq!(codec.decrypt(&codec.encrypt(&value)), value);
                        assert!(codec.verify(&value, &codec.mac(&value)));
                    }
                });
            }
        });
    }

    #[test]
    fn debug_hides_keys() {
        let printed = format!("{:?}", derived_codec("dev"));
        assert!(printed.contains("Derived"));
        assert!(!printed.contains("mac_key"));
    }
}
