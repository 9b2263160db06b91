//! Request and response types for the vault's loopback JSON API.
//!
//! The persistence collaborator talks to the vault through these types. Every
//! codec operation is total: failures are encoded in the response value
//! (empty string, `UNENCRYPTED:`-prefixed string, or `false`), never as an
//! error status.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Encrypt / decrypt
// ---------------------------------------------------------------------------

/// Request body for `POST /encrypt`. An absent `plaintext` is treated as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptRequest {
    #[serde(default)]
    pub plaintext: Option<String>,
}

/// Response body for `POST /encrypt`.
///
/// `envelope` is base64 of `nonce || ciphertext+tag`, the empty string for
/// empty input, or `UNENCRYPTED:<plaintext>` when encryption was unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub envelope: String,
}

/// Request body for `POST /decrypt`. An absent `envelope` is treated as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecryptRequest {
    #[serde(default)]
    pub envelope: Option<String>,
}

/// Response body for `POST /decrypt`. Empty when the envelope was rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub plaintext: String,
}

// ---------------------------------------------------------------------------
// Message authentication
// ---------------------------------------------------------------------------

/// Request body for `POST /mac`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacRequest {
    pub data: String,
}

/// Response body for `POST /mac`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacResponse {
    pub tag: String,
}

/// Request body for `POST /verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub data: String,
    pub tag: String,
}

/// Response body for `POST /verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` when the resident key survives restarts, `"degraded"` otherwise.
    pub status: String,
    /// Tier the resident key came from: `hardware`, `derived` or `ephemeral`.
    pub key_tier: String,
    /// Whether data encrypted now will still decrypt after a restart.
    pub durable: bool,
}
