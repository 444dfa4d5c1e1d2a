//! Request capture for logging.
//!
//! # Responsibilities
//! - Resolve or generate the request ID
//! - Snapshot method, route path, URL, query, route params, headers, body,
//!   client IP and protocol version before the handler runs
//! - Decode buffered bodies into loggable JSON values
//!
//! # Design Decisions
//! - Request ID taken from the configured header when present
//! - Snapshot is owned and detached from the request that is forwarded
//! - Multi-valued headers are joined with ", "

use axum::{
    extract::{ConnectInfo, FromRequestParts, MatchedPath, Query, RawPathParams},
    http::{request::Parts, Extensions, HeaderMap, HeaderName, Uri, Version},
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Default request ID header.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Logged in place of a body that was streamed through without buffering.
pub const UNBUFFERED_BODY: &str = "[unbuffered body]";

/// Logged in place of a body whose stream failed while it was buffered.
pub const UNREADABLE_BODY: &str = "[unreadable body]";

/// Whether `value` stands in for a body that was never captured.
pub fn is_body_placeholder(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == UNBUFFERED_BODY || s == UNREADABLE_BODY)
}

/// Request ID attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Value of `header` if present and non-empty, otherwise a new UUID v4.
    pub fn resolve(headers: &HeaderMap, header: &HeaderName) -> Self {
        headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| RequestId(v.to_string()))
            .unwrap_or_else(|| RequestId(uuid::Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Extension trait to read the request ID from a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Everything the log builder needs to know about the inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    pub request_id: Option<String>,
    pub method: String,
    /// Matched route template, e.g. `/orders/{id}`.
    pub route_path: String,
    /// Path and query as received.
    pub original_url: String,
    pub query: BTreeMap<String, String>,
    pub route_params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub client_ip: Option<String>,
    /// `1.1`, `2.0`, ...
    pub http_version: String,
}

impl RequestSnapshot {
    /// Route template if the router matched one, else the raw path.
    pub fn route_path(extensions: &Extensions, uri: &Uri) -> String {
        extensions
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string())
    }

    /// Snapshot the request head; `body` is the already decoded body.
    pub async fn capture(parts: &mut Parts, body: Value, request_id: Option<&RequestId>) -> Self {
        let route_params = match RawPathParams::from_request_parts(parts, &()).await {
            Ok(params) => params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Err(_) => BTreeMap::new(),
        };

        let query = Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let original_url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            request_id: request_id.map(|id| id.0.clone()),
            method: parts.method.to_string(),
            route_path: Self::route_path(&parts.extensions, &parts.uri),
            original_url,
            query,
            route_params,
            headers: header_map(&parts.headers),
            body,
            client_ip,
            http_version: version_str(parts.version).to_string(),
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("user-agent").map(String::as_str)
    }
}

/// Flatten headers into a name → value map.
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

/// Protocol version without the `HTTP/` prefix.
pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "unknown",
    }
}

/// Decode a buffered body for logging.
///
/// Empty → `null`, JSON → the value, UTF-8 → string, otherwise a size marker.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if let Ok(json) = serde_json::from_slice::<Value>(bytes) {
        return json;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::String(format!("[binary: {} bytes]", bytes.len())),
    }
}
