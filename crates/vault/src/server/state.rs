//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::codec::SecureCodec;

/// Application state shared across all request handlers.
///
/// Cloning only bumps the reference count on the codec.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The process-wide codec built by the ownership root.
    pub codec: Arc<SecureCodec>,
}

impl AppState {
    /// Create a new [`AppState`] around an already-built codec.
    pub fn new(codec: Arc<SecureCodec>) -> Self {
        Self { codec }
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::keys::{KeyProvider, KeySettings, MachineId};

    let device = Arc::new(MachineId::new(Some("test-device".into()), None));
    let provider = KeyProvider::initialize(None, device, &KeySettings::default());
    AppState::new(Arc::new(SecureCodec::new(&provider)))
}
