//! Distributed tracing context.
//!
//! # Responsibilities
//! - Extract W3C trace context (`traceparent`) from incoming requests
//! - Install the OpenTelemetry tracer provider and its OTLP exporter
//! - Expose the active span context to log sinks on demand
//!
//! # Design Decisions
//! - `tracing` spans are the source of truth; `tracing-opentelemetry`
//!   turns them into OpenTelemetry spans
//! - Pull-based: sinks ask for the current span context once per record
//! - Without the OpenTelemetry layer installed no span is ever valid, so
//!   records carry no trace ids

use axum::http::HeaderMap;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanContext, TraceContextExt, TracerProvider as _};
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::registry::LookupSpan;

use crate::config::TelemetryConfig;
use crate::observability::ObservabilityError;

/// Instrumentation scope of the spans this crate creates.
pub const TRACER_NAME: &str = env!("CARGO_PKG_NAME");

/// Trace context carried by the request headers, if any.
///
/// Malformed headers yield an empty context, so the request span starts a
/// new trace.
pub fn extract_parent(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

/// Build the tracer provider exporting spans over OTLP/HTTP.
///
/// The provider is also installed globally together with the W3C
/// propagator.
pub fn init_tracer_provider(
    config: &TelemetryConfig,
    service_name: &str,
) -> Result<SdkTracerProvider, ObservabilityError> {
    let exporter = match &config.otlp_endpoint {
        Some(endpoint) => SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?,
        None => SpanExporter::builder().with_http().build()?,
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(service_name.to_string())
                .build(),
        )
        .build();

    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());

    Ok(provider)
}

/// `tracing` layer bridging spans to `provider`.
pub fn layer<S>(provider: &SdkTracerProvider) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME))
}

/// Source of the currently active span context.
pub trait TraceProvider: Send + Sync {
    /// Span context active for the caller, if any.
    fn current_span_context(&self) -> Option<SpanContext>;
}

/// Reads the OpenTelemetry context of the current `tracing` span.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtelTraceProvider;

impl TraceProvider for OtelTraceProvider {
    fn current_span_context(&self) -> Option<SpanContext> {
        let cx = tracing::Span::current().context();
        let span_context = cx.span().span_context().clone();
        span_context.is_valid().then_some(span_context)
    }
}

/// Provider that never reports a span.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceProvider;

impl TraceProvider for NoopTraceProvider {
    fn current_span_context(&self) -> Option<SpanContext> {
        None
    }
}
