//! Tracing subscriber and optional OTLP pipeline setup.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// Always installs a JSON [`tracing_subscriber`] layer filtered by `RUST_LOG`,
/// falling back to `log_level`. When `otlp_endpoint` is set, spans are also
/// exported through [`tracing_opentelemetry`] and an OTLP metrics pipeline
/// becomes the global meter provider, so the counters in
/// [`super::metrics`] leave the process.
///
/// Must be called from within a Tokio runtime when exporting.
///
/// # Errors
///
/// Returns an error if an OTLP pipeline cannot be built or a subscriber is
/// already installed.
pub fn init_telemetry(otlp_endpoint: Option<&str>, log_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let Some(endpoint) = otlp_endpoint else {
        return tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("failed to initialise tracing subscriber");
    };

    // --- Tracing pipeline ---
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default().with_resource(service_resource()),
        )
        .install_batch(runtime::Tokio)
        .context("failed to install OTLP tracing pipeline")?;

    // --- Metrics pipeline ---
    let meter_provider = opentelemetry_otlp::new_pipeline()
        .metrics(runtime::Tokio)
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_resource(service_resource())
        .build()
        .context("failed to install OTLP metrics pipeline")?;
    opentelemetry::global::set_meter_provider(meter_provider);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}

fn service_resource() -> Resource {
    Resource::new(vec![
        KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            "budgetwise-vault",
        ),
        KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
            env!("CARGO_PKG_VERSION"),
        ),
    ])
}
