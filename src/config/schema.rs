//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.
//! Every section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::http::request::X_REQUEST_ID;
use crate::logger::redact::DEFAULT_CENSOR;
use crate::observability::severity::Level;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration for the bundled service.
    pub listener: ListenerConfig,

    /// Request logging settings.
    pub logger: LoggerConfig,

    /// Telemetry export settings.
    pub telemetry: TelemetryConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Request logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum level (trace, debug, info, warn, error, fatal).
    pub level: Level,

    /// Deployment environment, emitted as `env`.
    pub environment: String,

    /// Service name, emitted as `service`.
    pub service_name: String,

    /// Service version, emitted as `version`.
    pub version: String,

    /// Human-readable output instead of JSON.
    pub prettify: bool,

    /// Header carrying the request ID.
    pub id_field: String,

    /// Routes excluded from request logging.
    pub ignore_paths: Vec<IgnorePathConfig>,

    /// Field redaction.
    pub redact: RedactConfig,

    /// Disable to make the logging layer a pass-through.
    pub interceptor_enabled: bool,

    /// Largest body (bytes) buffered for logging.
    pub max_body_log_bytes: usize,

    /// Include response headers in `http.res.headers`.
    pub include_response_headers: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            environment: "development".to_string(),
            service_name: String::new(),
            version: "v0.0.0".to_string(),
            prettify: false,
            id_field: X_REQUEST_ID.to_string(),
            ignore_paths: Vec::new(),
            redact: RedactConfig::default(),
            interceptor_enabled: true,
            max_body_log_bytes: 1024 * 1024,
            include_response_headers: false,
        }
    }
}

/// Ignore-list entry: a bare string is an exact route,
/// `{ pattern = "..." }` is a regex tested against the upper-cased route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum IgnorePathConfig {
    Exact(String),
    Pattern { pattern: String },
}

/// Redaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedactConfig {
    /// Dotted paths into the record (`*` matches one level).
    pub fields: Vec<String>,

    /// Replacement text.
    pub censor: String,

    /// Remove the field instead of censoring it.
    pub remove: bool,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            censor: DEFAULT_CENSOR.to_string(),
            remove: false,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Install the metrics exporter and the OTLP span exporter at startup.
    pub instrumentation_enabled: bool,

    /// Prometheus scrape endpoint bind address.
    pub metrics_address: String,

    /// OTLP/HTTP collector endpoint. Falls back to `OTEL_EXPORTER_OTLP_ENDPOINT`.
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            instrumentation_enabled: false,
            metrics_address: "0.0.0.0:9464".to_string(),
            otlp_endpoint: None,
        }
    }
}
