//! At-rest encryption for BudgetWise.
//!
//! [`keys::KeyProvider`] resolves one AES-256 key per process through a
//! hardware → derived → ephemeral fallback chain, and [`codec::SecureCodec`]
//! uses it to turn strings into storable envelopes and back. All four codec
//! operations are total: failures come back as `""`, an `UNENCRYPTED:`
//! value, or `false`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vault::codec::SecureCodec;
//! use vault::keys::{KeyProvider, KeySettings, KeyringStore, MachineId};
//!
//! let store = KeyringStore::new("budgetwise");
//! let device = Arc::new(MachineId::new(None, None));
//! let provider = KeyProvider::initialize(Some(&store), device, &KeySettings::default());
//! let codec = SecureCodec::new(&provider);
//!
//! let stored = codec.encrypt("rent 1450.00");
//! assert_eq!(codec.decrypt(&stored), "rent 1450.00");
//! ```

pub mod codec;
pub mod config;
pub mod crypto;
pub mod keys;
pub mod server;
pub mod telemetry;
