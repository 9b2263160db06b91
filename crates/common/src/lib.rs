//! Common types, protocol definitions, and errors shared by the vault and its clients.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
