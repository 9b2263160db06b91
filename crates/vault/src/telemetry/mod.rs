//! Structured logging and metrics.
//!
//! Logs are JSON via `tracing-subscriber`. Spans and counters are exported over
//! OTLP only when an endpoint is configured.
//!
//! # Telemetry invariants
//!
//! - **No key material, plaintext, device identifier or MAC tag** may appear
//!   in any span attribute, metric label or log field.
//! - Log level is configurable via `BUDGETWISE_LOG_LEVEL` (default: `info`)
//!   and overridden by `RUST_LOG`.

pub mod init;
pub mod metrics;

pub use init::init_telemetry;
pub use metrics::{DecryptFailure, VaultMetrics};
