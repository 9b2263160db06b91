//! String-level encryption for the persistence layer.
//!
//! A stored value is one of:
//!
//! ```text
//! ""                              empty input
//! base64(nonce || ct || tag)      encrypted
//! UNENCRYPTED:<raw>               encryption was unavailable when written
//! ```

pub mod marker;
pub mod secure;

pub use marker::PLAINTEXT_MARKER;
pub use secure::{CodecError, SecureCodec};
