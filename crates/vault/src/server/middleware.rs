//! Limits applied to every route.

use std::time::Duration;

/// Per-request timeout. Codec calls are CPU-bound and finish in microseconds.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
