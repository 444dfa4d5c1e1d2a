//! Handler error types and their log classification.
//!
//! # Responsibilities
//! - `HttpException`: error with an explicit status and JSON payload
//! - `InternalError`: any other failure, answered with 500
//! - Attach an `ErrorReport` to the error response so the logging layer
//!   can classify the outcome without re-parsing the body
//!
//! # Design Decisions
//! - The response sent to the client is built exactly as it would be
//!   without the logging layer; the report rides in response extensions
//! - Panics caught by `tower_http::catch_panic` get the same treatment

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

/// Error-like value seen by the log builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Type name of the error (`HttpException`, `Error`, `panic`, ...).
    pub name: String,
    pub message: String,
    /// Source chain, one cause per line.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stack: String,
    /// Present only for HTTP-classified errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Body returned to the client for this error.
    pub payload: Value,
}

impl ErrorReport {
    /// Report for an unclassified error.
    pub fn from_error(name: &str, err: &(dyn StdError + 'static)) -> Self {
        Self {
            name: name.to_string(),
            message: err.to_string(),
            stack: source_chain(err),
            status: None,
            payload: Value::Null,
        }
    }

    /// Report for a failure only known by its display text.
    pub fn from_display(name: &str, err: &dyn fmt::Display) -> Self {
        Self {
            name: name.to_string(),
            message: err.to_string(),
            stack: String::new(),
            status: None,
            payload: Value::Null,
        }
    }

    /// True if the error carries its own HTTP status.
    pub fn is_classified(&self) -> bool {
        self.status.is_some()
    }
}

fn source_chain(err: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        lines.push(format!("    caused by: {}", cause));
        current = cause.source();
    }
    lines.join("\n")
}

/// Last path segment of a type name, without generics.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Error carrying an explicit HTTP status and response payload.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpException {
    status: StatusCode,
    message: String,
    payload: Value,
}

impl HttpException {
    /// Exception with the default payload
    /// `{"statusCode": .., "message": .., "error": <reason>}`.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let payload = json!({
            "statusCode": status.as_u16(),
            "message": message,
            "error": status.canonical_reason().unwrap_or("Error"),
        });
        Self {
            status,
            message,
            payload,
        }
    }

    /// Replace the response payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            name: "HttpException".to_string(),
            message: self.message.clone(),
            stack: String::new(),
            status: Some(self.status.as_u16()),
            payload: self.payload.clone(),
        }
    }
}

impl IntoResponse for HttpException {
    fn into_response(self) -> axum::response::Response {
        let report = self.report();
        let mut response = (self.status, Json(self.payload)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Unclassified handler failure, answered with 500.
///
/// Any `std::error::Error` converts into it, so handlers can use `?`.
#[derive(Debug)]
pub struct InternalError {
    name: &'static str,
    source: Box<dyn StdError + Send + Sync>,
}

impl InternalError {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn report(&self) -> ErrorReport {
        let mut report = ErrorReport::from_error(self.name, self.source.as_ref());
        report.payload = internal_error_payload();
        report
    }
}

impl<E> From<E> for InternalError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self {
            name: short_type_name::<E>(),
            source: Box::new(err),
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl IntoResponse for InternalError {
    fn into_response(self) -> axum::response::Response {
        internal_error_response(self.report())
    }
}

fn internal_error_payload() -> Value {
    json!({
        "statusCode": 500,
        "message": "Internal server error",
    })
}

/// Response for a panicking handler, for `CatchPanicLayer::custom`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };

    let report = ErrorReport {
        name: "panic".to_string(),
        message,
        stack: String::new(),
        status: None,
        payload: Value::Null,
    };
    internal_error_response(report)
}

/// Generic 500 response carrying `report`.
fn internal_error_response(mut report: ErrorReport) -> Response<Body> {
    report.payload = internal_error_payload();
    let mut response =
        (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_payload())).into_response();
    response.extensions_mut().insert(report);
    response
}
