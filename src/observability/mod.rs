//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request logging layer produces:
//!     → logging.rs (LogSink: one JSON object per request on stdout)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (`request` span exported over OTLP)
//!
//! Enrichment at emission time:
//!     → severity.rs (internal level → severity number)
//!     → tracing.rs (active trace_id / span_id)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → OTLP collector (spans)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace ids flow from the `traceparent` header into every record
//! - Exporters only installed when instrumentation is enabled

pub mod logging;
pub mod metrics;
pub mod severity;
pub mod tracing;

use opentelemetry_sdk::trace::SdkTracerProvider;
use std::net::SocketAddr;

use crate::config::AppConfig;

/// Error raised while bootstrapping logging or telemetry.
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    #[error("invalid metrics address {address}: {source}")]
    MetricsAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to build OTLP span exporter: {0}")]
    OtlpExporter(#[from] opentelemetry_otlp::ExporterBuildError),
}

/// Handle on the installed exporters.
#[derive(Default)]
pub struct Telemetry {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Flush and stop the span exporter.
    pub fn shutdown(self) {
        let Some(provider) = self.tracer_provider else {
            return;
        };
        if let Err(err) = provider.shutdown() {
            ::tracing::warn!(error = %err, "Failed to shut down tracer provider");
        }
    }
}

/// Install logging and, when enabled, the metrics and span exporters.
pub fn init(config: &AppConfig) -> Result<Telemetry, ObservabilityError> {
    if !config.telemetry.instrumentation_enabled {
        logging::init_logging(&config.logger, None)?;
        ::tracing::info!(
            "Instrumentation disabled, set INSTRUMENTATION_ENABLED=true if you want it enabled"
        );
        return Ok(Telemetry::default());
    }

    let provider =
        self::tracing::init_tracer_provider(&config.telemetry, &config.logger.service_name)?;
    logging::init_logging(&config.logger, Some(&provider))?;

    let addr: SocketAddr = config
        .telemetry
        .metrics_address
        .parse()
        .map_err(|source| ObservabilityError::MetricsAddress {
            address: config.telemetry.metrics_address.clone(),
            source,
        })?;
    metrics::init_metrics(addr)?;

    ::tracing::info!(service = %config.logger.service_name, "Telemetry initialized");
    Ok(Telemetry {
        tracer_provider: Some(provider),
    })
}
