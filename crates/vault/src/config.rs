//! Configuration loading and validation for the vault service.
//!
//! All values are read from `BUDGETWISE_*` environment variables at startup.
//! The process exits with a clear error message if a value is invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::keys::{provider, KeySettings};

/// Validated vault configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name of the key in the OS secure store.
    #[serde(default = "default_key_alias")]
    pub key_alias: String,

    /// Service name the key is filed under in the OS secure store.
    #[serde(default = "default_keystore_service")]
    pub keystore_service: String,

    /// Set to `false` to skip the secure store and start at the derived tier.
    #[serde(default = "default_keystore_enabled")]
    pub keystore_enabled: bool,

    /// Application salt for the derived tier.
    #[serde(default = "default_derivation_salt")]
    pub derivation_salt: String,

    /// Fixed device identifier. When unset the machine id file is read.
    #[serde(default)]
    pub device_id: Option<String>,

    /// Alternative machine id file.
    #[serde(default)]
    pub device_id_path: Option<String>,

    /// Loopback port for the JSON API.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint for span and metric export. Export is off when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_key_alias() -> String {
    provider::DEFAULT_KEY_ALIAS.into()
}
fn default_keystore_service() -> String {
    "budgetwise".into()
}
fn default_keystore_enabled() -> bool {
    true
}
fn default_derivation_salt() -> String {
    provider::DEFAULT_DERIVATION_SALT.into()
}
fn default_listen_port() -> u16 {
    7878
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from `BUDGETWISE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Key tier inputs derived from this configuration.
    pub fn key_settings(&self) -> KeySettings {
        KeySettings {
            alias: self.key_alias.clone(),
            salt: self.derivation_salt.clone(),
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.key_alias, "BUDGETWISE_KEY_ALIAS")?;
        ensure_non_empty(&self.keystore_service, "BUDGETWISE_KEYSTORE_SERVICE")?;
        ensure_non_empty(&self.derivation_salt, "BUDGETWISE_DERIVATION_SALT")?;

        if self.listen_port == 0 {
            anyhow::bail!("BUDGETWISE_LISTEN_PORT must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "BUDGETWISE_OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_alias: default_key_alias(),
            keystore_service: default_keystore_service(),
            keystore_enabled: default_keystore_enabled(),
            derivation_salt: default_derivation_salt(),
            device_id: None,
            device_id_path: None,
            listen_port: default_listen_port(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }
}

/// Values stay strings until `serde` asks for a typed field, so identifiers
/// like `007` reach the key derivation byte for byte.
fn environment() -> config::Environment {
    config::Environment::with_prefix("BUDGETWISE")
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
