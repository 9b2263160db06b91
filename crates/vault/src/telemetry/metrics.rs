//! Counters for degraded codec and key-resolution outcomes.
//!
//! Instruments come from the global meter, which is a no-op until
//! [`super::init_telemetry`] installs an OTLP provider.

use opentelemetry::{
    global,
    metrics::{Counter, Meter},
    KeyValue,
};

use crate::keys::KeyTier;

const METER_NAME: &str = "budgetwise-vault";

/// Why a decrypt returned the empty string. Only visible to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptFailure {
    Malformed,
    Rejected,
}

impl DecryptFailure {
    fn as_str(&self) -> &'static str {
        match self {
            DecryptFailure::Malformed => "malformed",
            DecryptFailure::Rejected => "rejected",
        }
    }
}

/// Handles to the vault's counters. Cheap to clone.
#[derive(Clone)]
pub struct VaultMetrics {
    plaintext_fallback: Counter<u64>,
    decrypt_failures: Counter<u64>,
    mac_failures: Counter<u64>,
    tier_failures: Counter<u64>,
}

impl VaultMetrics {
    /// Create the instruments on the global meter.
    pub fn new() -> Self {
        Self::from_meter(&global::meter(METER_NAME))
    }

    fn from_meter(meter: &Meter) -> Self {
        Self {
            plaintext_fallback: meter
                .u64_counter("vault.encrypt.plaintext_fallback")
                .with_description("Values stored with the UNENCRYPTED: marker")
                .init(),
            decrypt_failures: meter
                .u64_counter("vault.decrypt.failures")
                .with_description("Envelopes that decrypted to the empty string")
                .init(),
            mac_failures: meter
                .u64_counter("vault.mac.failures")
                .with_description("MAC computations that could not complete")
                .init(),
            tier_failures: meter
                .u64_counter("vault.key.tier_failures")
                .with_description("Key tiers rejected during resolution")
                .init(),
        }
    }

    pub fn plaintext_fallback(&self) {
        self.plaintext_fallback.add(1, &[]);
    }

    pub fn decrypt_failure(&self, kind: DecryptFailure) {
        self.decrypt_failures
            .add(1, &[KeyValue::new("kind", kind.as_str())]);
    }

    pub fn mac_failure(&self) {
        self.mac_failures.add(1, &[]);
    }

    pub fn tier_failure(&self, tier: KeyTier) {
        self.tier_failures
            .add(1, &[KeyValue::new("tier", tier.as_str())]);
    }
}

impl Default for VaultMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VaultMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultMetrics")
    }
}
