//! Log record assembly.
//!
//! # Responsibilities
//! - Resolve the status code from the outcome
//! - Apply the endpoint's transformer on successful responses
//! - Classify errors (message, stack, kind)
//! - Produce the record, or nothing when the transformer asks to skip
//!
//! # Design Decisions
//! - Hook failures never abort: the original value is kept and the failure
//!   message is written next to it (`transformError`, `skipError`)
//! - A skip hook that fails counts as "do not skip"
//! - Error outcomes are never transformed, even with a status below 400

use axum::http::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::http::error::ErrorReport;
use crate::http::request::{is_body_placeholder, RequestSnapshot};
use crate::transform::BodyLogTransformer;

use super::record::{
    ClientBlock, ErrorBlock, HttpBlock, LogRecord, NetworkBlock, RequestBlock, ResponseBlock,
    UrlDetails,
};

/// Highest status treated as success for transformation.
const MAX_SUCCESS_STATUS: u16 = 399;

/// How the request cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Handler produced a regular response.
    Response {
        status: StatusCode,
        headers: Option<BTreeMap<String, String>>,
        body: Value,
    },
    /// Handler failed; classified if the report carries a status.
    Error(ErrorReport),
}

impl Outcome {
    /// Status code logged for this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Response { status, .. } => status.as_u16(),
            Outcome::Error(report) => report.status.unwrap_or(500),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

/// Upper-snake status name (`422` → `UNPROCESSABLE_ENTITY`).
pub fn status_name(status: u16) -> Option<String> {
    let reason = StatusCode::from_u16(status).ok()?.canonical_reason()?;
    let name = reason
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect::<String>();
    Some(name)
}

/// Fixed message template.
pub fn message_for(method: &str, route_path: &str) -> String {
    format!("[REQUEST] [{method}] [{route_path}]")
}

/// Build the record for a completed request.
///
/// Returns `None` only when the endpoint's transformer asked to skip.
pub fn build(
    request: RequestSnapshot,
    outcome: Outcome,
    elapsed_ms: f64,
    transformer: Option<&dyn BodyLogTransformer>,
) -> Option<LogRecord> {
    let status_code = outcome.status_code();

    let useragent = request.user_agent().map(str::to_string);
    let mut req_body = request.body;
    let mut req_transform_error = None;
    let mut res_transform_error = None;
    let mut skip_error = None;
    let mut error = None;
    let mut raw_exception = None;

    let (mut res_body, res_headers) = match outcome {
        Outcome::Response { headers, body, .. } => (body, headers),
        Outcome::Error(report) => {
            let kind = status_name(status_code).unwrap_or_else(|| report.name.clone());
            error = Some(ErrorBlock {
                message: report.message.clone(),
                stack: report.stack.clone(),
                kind,
            });
            let body = report.payload.clone();
            if report.is_classified() {
                raw_exception = Some(report);
            }
            (body, None)
        }
    };

    let transformer = transformer.filter(|_| error.is_none() && status_code <= MAX_SUCCESS_STATUS);
    if let Some(t) = transformer {
        // Placeholders for uncaptured bodies never reach the hooks.
        let req_captured = !is_body_placeholder(&req_body);
        let res_captured = !is_body_placeholder(&res_body);

        if req_captured && res_captured {
            match t.skip(&req_body, &res_body) {
                Ok(true) => return None,
                Ok(false) => {}
                Err(e) => skip_error = Some(e.to_string()),
            }
        }

        if req_captured {
            match t.transform_request(&req_body) {
                Ok(value) => req_body = value,
                Err(e) => req_transform_error = Some(e.to_string()),
            }
        }

        if res_captured {
            match t.transform_response(&res_body) {
                Ok(value) => res_body = value,
                Err(e) => res_transform_error = Some(e.to_string()),
            }
        }
    }

    // An empty message means there is nothing worth reporting.
    let error = error.filter(|e| !e.message.is_empty());

    Some(LogRecord {
        request_id: request.request_id,
        message: message_for(&request.method, &request.route_path),
        duration: elapsed_ms,
        http: HttpBlock {
            useragent,
            method: request.method,
            url: request.route_path.clone(),
            version: request.http_version,
            status_code,
            url_details: UrlDetails {
                full: request.original_url,
                path: request.route_path,
                query_string: request.query,
                route_params: request.route_params,
            },
            req: RequestBlock {
                headers: request.headers,
                body: req_body,
                transform_error: req_transform_error,
            },
            res: ResponseBlock {
                headers: res_headers,
                body: res_body,
                transform_error: res_transform_error,
                raw_exception,
            },
            skip_error,
        },
        network: NetworkBlock {
            client: ClientBlock {
                ip: request.client_ip,
            },
        },
        error,
    })
}
