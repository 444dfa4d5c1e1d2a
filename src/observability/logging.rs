//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (JSON or pretty) for diagnostics,
//!   plus the OpenTelemetry bridge when instrumentation is on
//! - Define the sink contract the request logger writes to
//! - Write each record as one JSON object, merged with base fields,
//!   severity and the active trace/span ids
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level for diagnostics
//! - Request records bypass the fmt layers: a record is a JSON document,
//!   not a `tracing` field
//! - Trace ids are pulled from the provider once per record
//! - Redaction happens here, on the merged record

use opentelemetry_sdk::trace::SdkTracerProvider;
use serde_json::{json, Map, Value};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggerConfig;
use crate::logger::{LogRecord, Redactor};
use crate::observability::severity::Level;
use crate::observability::tracing::{layer as otel_layer, OtelTraceProvider, TraceProvider};
use crate::observability::ObservabilityError;

/// Install the global subscriber.
///
/// With a tracer provider, spans from this crate are also exported as
/// OpenTelemetry spans, independently of the log filter.
pub fn init_logging(
    config: &LoggerConfig,
    tracer_provider: Option<&SdkTracerProvider>,
) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.filter_directive()));

    let fmt_layer = if config.prettify {
        fmt::layer().pretty().boxed()
    } else {
        fmt::layer().json().flatten_event(true).boxed()
    };

    let otel = tracer_provider.map(|provider| {
        otel_layer(provider)
            .with_filter(Targets::new().with_target(env!("CARGO_CRATE_NAME"), LevelFilter::INFO))
    });

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .with(otel)
        .try_init()?;

    Ok(())
}

/// Destination for request log records.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, record: &LogRecord);
}

/// Fields attached to every emitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFields {
    pub env: String,
    pub service: String,
    pub version: String,
    pub pid: u32,
    pub hostname: String,
}

impl BaseFields {
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self {
            env: config.environment.clone(),
            service: config.service_name.clone(),
            version: config.version.clone(),
            pid: std::process::id(),
            hostname: hostname(),
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Sink writing one JSON object per record.
///
/// The object holds the record's fields next to `level`, `severity_text`,
/// `severity_number`, `time`, the base fields and, inside a sampled span,
/// `trace_id` and `span_id`.
pub struct JsonSink<W = fn() -> io::Stdout> {
    base: BaseFields,
    redactor: Redactor,
    trace: Arc<dyn TraceProvider>,
    min_level: Level,
    pretty: bool,
    writer: W,
}

impl JsonSink {
    /// Stdout sink reading span ids from the current `tracing` span.
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(
            BaseFields::from_config(config),
            Redactor::from_config(&config.redact),
            Arc::new(OtelTraceProvider),
            io::stdout as fn() -> io::Stdout,
        )
        .with_min_level(config.level)
        .pretty(config.prettify)
    }
}

impl<W> JsonSink<W> {
    pub fn new(
        base: BaseFields,
        redactor: Redactor,
        trace: Arc<dyn TraceProvider>,
        writer: W,
    ) -> Self {
        Self {
            base,
            redactor,
            trace,
            min_level: Level::Trace,
            pretty: false,
            writer,
        }
    }

    /// Drop records below `level`.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Indent the JSON output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Merged, redacted JSON object for `record`.
    pub fn render(&self, level: Level, record: &LogRecord) -> Value {
        let base = &self.base;
        let mut entry = Map::new();
        entry.insert("level".into(), json!(level.label()));
        entry.insert("severity_text".into(), json!(level.label()));
        entry.insert("severity_number".into(), json!(level.severity_number()));
        entry.insert("time".into(), json!(unix_millis()));
        entry.insert("env".into(), json!(base.env));
        entry.insert("service".into(), json!(base.service));
        entry.insert("version".into(), json!(base.version));
        entry.insert("pid".into(), json!(base.pid));
        entry.insert("hostname".into(), json!(base.hostname));

        if let Some(span) = self.trace.current_span_context() {
            entry.insert("trace_id".into(), json!(span.trace_id().to_string()));
            entry.insert("span_id".into(), json!(span.span_id().to_string()));
        }

        if let Value::Object(fields) = record.to_value() {
            entry.extend(fields);
        }

        let mut value = Value::Object(entry);
        self.redactor.apply(&mut value);
        value
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl<W> LogSink for JsonSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    fn log(&self, level: Level, record: &LogRecord) {
        if level < self.min_level {
            return;
        }

        let value = self.render(level, record);
        let line = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };

        let written = line.map_err(io::Error::from).and_then(|mut line| {
            line.push('\n');
            self.writer.make_writer().write_all(line.as_bytes())
        });
        if let Err(err) = written {
            tracing::warn!(error = %err, "Failed to write request log record");
        }
    }
}

/// Sink keeping records in memory, for embedding and tests.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, LogRecord)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted so far.
    pub fn records(&self) -> Vec<(Level, LogRecord)> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, record: &LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, record.clone()));
        }
    }
}
