//! Loopback JSON API over the codec.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject the shared codec (`AppState`) into handlers.
//!
//! The listener binds to `127.0.0.1` only; the API is for the local
//! persistence collaborator, not the network.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
