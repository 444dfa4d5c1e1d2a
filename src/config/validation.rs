//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that ignore patterns compile and the ID header is a valid name
//! - Validate value ranges (body limit > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use axum::http::HeaderName;
use std::net::SocketAddr;

use crate::config::schema::{AppConfig, IgnorePathConfig};

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("logger.id_field {0:?} is not a valid header name")]
    InvalidIdField(String),

    #[error("logger.ignore_paths pattern {pattern:?} does not compile: {reason}")]
    InvalidIgnorePattern { pattern: String, reason: String },

    #[error("logger.redact.fields entry {0:?} has an empty segment")]
    InvalidRedactPath(String),

    #[error("logger.max_body_log_bytes must be greater than 0")]
    ZeroBodyLimit,

    #[error("listener.request_timeout_secs must be greater than 0")]
    ZeroTimeout,

    #[error("{field} {value:?} is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let logger = &config.logger;

    if HeaderName::from_bytes(logger.id_field.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidIdField(logger.id_field.clone()));
    }

    for entry in &logger.ignore_paths {
        if let IgnorePathConfig::Pattern { pattern } = entry {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError::InvalidIgnorePattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for path in &logger.redact.fields {
        if path.split('.').any(str::is_empty) {
            errors.push(ValidationError::InvalidRedactPath(path.clone()));
        }
    }

    if logger.max_body_log_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.telemetry.instrumentation_enabled
        && config.telemetry.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "telemetry.metrics_address",
            value: config.telemetry.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
