//! AES-256-GCM primitives and the envelope text format.
//!
//! This module knows nothing about key tiers or fallbacks. It provides the
//! low-level seal/open operations used by the key self-test and the codec.
//!
//! # Envelope format
//!
//! ```text
//! base64( nonce[12] || ciphertext || tag[16] )
//! ```

pub mod cipher;
pub mod envelope;

pub use cipher::{build_cipher, CipherError, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use envelope::CipherEnvelope;
