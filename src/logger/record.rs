//! Structured request log record.
//!
//! Serialized field names follow the log schema consumed downstream
//! (`status_code`, `url_details.queryString`, `req.transformError`, ...).

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::http::error::ErrorReport;

/// One record per completed request cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub message: String,
    /// Milliseconds.
    pub duration: f64,
    pub http: HttpBlock,
    pub network: NetworkBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpBlock {
    pub method: String,
    /// Route path.
    pub url: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub useragent: Option<String>,
    pub status_code: u16,
    pub url_details: UrlDetails,
    pub req: RequestBlock,
    pub res: ResponseBlock,
    #[serde(rename = "skipError", skip_serializing_if = "Option::is_none")]
    pub skip_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlDetails {
    pub full: String,
    pub path: String,
    #[serde(rename = "queryString")]
    pub query_string: BTreeMap<String, String>,
    #[serde(rename = "routeParams")]
    pub route_params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBlock {
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    #[serde(rename = "transformError", skip_serializing_if = "Option::is_none")]
    pub transform_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Value,
    #[serde(rename = "transformError", skip_serializing_if = "Option::is_none")]
    pub transform_error: Option<String>,
    /// The classified exception itself, kept for diagnostics.
    #[serde(rename = "rawException", skip_serializing_if = "Option::is_none")]
    pub raw_exception: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkBlock {
    pub client: ClientBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientBlock {
    pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBlock {
    pub message: String,
    pub stack: String,
    pub kind: String,
}

impl LogRecord {
    /// Record as a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
