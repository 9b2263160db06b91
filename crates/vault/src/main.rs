//! `budgetwise-vault`: binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise telemetry (JSON logs, optional OTLP export).
//! 3. Resolve the resident key on the blocking pool and log rejected tiers.
//! 4. Build the [`SecureCodec`] over that key.
//! 5. Build the Axum router and serve it on loopback until Ctrl-C.

use std::{net::Ipv4Addr, sync::Arc};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use vault::{
    codec::SecureCodec,
    config::Config,
    keys::{DeviceIdentity, KeyProvider, KeyringStore, MachineId, SecureKeyStore},
    server::{self, state::AppState},
    telemetry::{self, VaultMetrics},
};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        keystore_enabled = cfg.keystore_enabled,
        "budgetwise-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key resolution
    // -----------------------------------------------------------------------
    let metrics = VaultMetrics::new();
    let provider = resolve_key(&cfg).await?;
    for failure in provider.failures() {
        warn!(tier = %failure.tier, error = %failure.error, "key tier rejected");
        metrics.tier_failure(failure.tier);
    }
    if provider.tier().is_durable() {
        info!(tier = %provider.tier(), "resident key ready");
    } else {
        error!(
            tier = %provider.tier(),
            "no durable key available; values encrypted in this process will not decrypt after a restart"
        );
    }

    // -----------------------------------------------------------------------
    // 4. Codec
    // -----------------------------------------------------------------------
    let codec = Arc::new(SecureCodec::with_metrics(&provider, metrics));

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(codec));

    let addr: std::net::SocketAddr = (Ipv4Addr::LOCALHOST, cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated with an error")?;

    info!("budgetwise-vault stopped");
    Ok(())
}

/// Run [`KeyProvider::initialize`] on the blocking pool and wait for it.
///
/// Keystore backends talk to OS services synchronously, so they stay off the
/// async workers. A panic inside a backend surfaces here as an error.
async fn resolve_key(cfg: &Config) -> Result<KeyProvider> {
    let cfg = cfg.clone();
    tokio::task::spawn_blocking(move || {
        let device: Arc<dyn DeviceIdentity> = Arc::new(MachineId::new(
            cfg.device_id.clone(),
            cfg.device_id_path.clone(),
        ));
        let store = cfg
            .keystore_enabled
            .then(|| KeyringStore::new(cfg.keystore_service.clone()));
        KeyProvider::initialize(
            store.as_ref().map(|s| s as &dyn SecureKeyStore),
            device,
            &cfg.key_settings(),
        )
    })
    .await
    .context("key resolution task failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
