//! Request logging layer.
//!
//! # Responsibilities
//! - Skip ignored routes and act as a pass-through when disabled
//! - Resolve the request ID and the trace context for the request
//! - Buffer request and response bodies (up to a limit) for the record
//! - Classify the outcome, apply the endpoint's transformer, emit one record
//!
//! # Data Flow
//! ```text
//! Request
//!     → route ignored / layer disabled? → inner service, nothing logged
//!     → RequestId + `request` span, child of the caller's `traceparent`
//!     → buffer request body → RequestSnapshot
//!     → inner service
//!     → Ok(response):  ErrorReport in extensions? → Outcome::Error
//!                      body stream failed?       → Outcome::Error
//!                      otherwise buffered body   → Outcome::Response
//!     → Err(e):        Outcome::Error, error returned unchanged
//!     → logger::build → LogSink (level by status) + metrics
//! ```
//!
//! # Design Decisions
//! - Mounted with `Router::route_layer` so the matched route template is known
//! - The client always gets the response the handler produced
//! - Bodies whose size is unknown or over the limit are streamed, not logged
//! - A body that fails while buffered is forwarded as the frames read so far
//!   followed by the same error; the layer never answers on its own

use axum::{
    body::{Body, Bytes, HttpBody},
    http::{
        header::{HeaderName, InvalidHeaderName},
        HeaderMap, Request, Response,
    },
    BoxError,
};
use futures_util::future::BoxFuture;
use futures_util::{stream, StreamExt};
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::LoggerConfig;
use crate::http::error::ErrorReport;
use crate::http::request::{
    decode_body, header_map, RequestId, RequestSnapshot, UNBUFFERED_BODY, UNREADABLE_BODY,
};
use crate::logger::{build, Outcome};
use crate::observability::logging::LogSink;
use crate::observability::metrics;
use crate::observability::severity::Level;
use crate::observability::tracing::extract_parent;
use crate::routing::PathMatcher;
use crate::transform::{BodyLogTransformer, EndpointKey, TransformerRegistry};

/// Error building the layer from configuration.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("invalid request ID header: {0}")]
    IdField(#[from] InvalidHeaderName),

    #[error("invalid ignore pattern: {0}")]
    IgnorePattern(#[from] regex::Error),
}

/// Level for a record with the given final status.
pub fn level_for(status: u16, is_error: bool) -> Level {
    match status {
        500.. => Level::Error,
        400..=499 => Level::Warn,
        _ if is_error => Level::Error,
        _ => Level::Info,
    }
}

#[derive(Clone)]
struct LoggingState {
    matcher: PathMatcher,
    registry: TransformerRegistry,
    sink: Arc<dyn LogSink>,
    id_field: HeaderName,
    max_body_log_bytes: usize,
    include_response_headers: bool,
    enabled: bool,
}

impl LoggingState {
    fn finish(
        &self,
        snapshot: RequestSnapshot,
        outcome: Outcome,
        begin: Instant,
        transformer: Option<&dyn BodyLogTransformer>,
    ) {
        let status = outcome.status_code();
        let level = level_for(status, outcome.is_error());
        let route = snapshot.route_path.clone();
        let elapsed_ms = begin.elapsed().as_secs_f64() * 1000.0;

        metrics::record_request(&snapshot.method, &route, status, begin);

        let Some(record) = build(snapshot, outcome, elapsed_ms, transformer) else {
            metrics::record_skipped(&route);
            tracing::debug!(route = %route, "Request log skipped by transformer");
            return;
        };

        let failures = [
            ("skip", record.http.skip_error.is_some()),
            ("request", record.http.req.transform_error.is_some()),
            ("response", record.http.res.transform_error.is_some()),
        ];
        for (hook, failed) in failures {
            if failed {
                metrics::record_hook_failure(&route, hook);
            }
        }

        self.sink.log(level, &record);
    }
}

/// Layer emitting one structured record per request.
#[derive(Clone)]
pub struct HttpLoggingLayer {
    state: LoggingState,
}

impl HttpLoggingLayer {
    /// Layer with default settings: nothing ignored, `x-request-id`, 1 MiB bodies.
    pub fn new(registry: TransformerRegistry, sink: Arc<dyn LogSink>) -> Self {
        let defaults = LoggerConfig::default();
        Self {
            state: LoggingState {
                matcher: PathMatcher::default(),
                registry,
                sink,
                id_field: HeaderName::from_static(crate::http::request::X_REQUEST_ID),
                max_body_log_bytes: defaults.max_body_log_bytes,
                include_response_headers: defaults.include_response_headers,
                enabled: defaults.interceptor_enabled,
            },
        }
    }

    pub fn from_config(
        config: &LoggerConfig,
        registry: TransformerRegistry,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, LayerError> {
        let id_field = HeaderName::try_from(config.id_field.as_str())?;
        let matcher = PathMatcher::from_config(&config.ignore_paths)?;

        Ok(Self::new(registry, sink)
            .with_ignore_paths(matcher)
            .with_id_field(id_field)
            .with_max_body_log_bytes(config.max_body_log_bytes)
            .with_response_headers(config.include_response_headers)
            .enabled(config.interceptor_enabled))
    }

    pub fn with_ignore_paths(mut self, matcher: PathMatcher) -> Self {
        self.state.matcher = matcher;
        self
    }

    pub fn with_id_field(mut self, header: HeaderName) -> Self {
        self.state.id_field = header;
        self
    }

    pub fn with_max_body_log_bytes(mut self, limit: usize) -> Self {
        self.state.max_body_log_bytes = limit;
        self
    }

    pub fn with_response_headers(mut self, include: bool) -> Self {
        self.state.include_response_headers = include;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.state.enabled = enabled;
        self
    }
}

impl<S> Layer<S> for HttpLoggingLayer {
    type Service = HttpLogging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpLogging {
            inner,
            state: Arc::new(self.state.clone()),
        }
    }
}

/// Service produced by [`HttpLoggingLayer`].
#[derive(Clone)]
pub struct HttpLogging<S> {
    inner: S,
    state: Arc<LoggingState>,
}

impl<S> fmt::Debug for HttpLogging<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLogging")
            .field("enabled", &self.state.enabled)
            .field("ignored", &self.state.matcher.len())
            .finish()
    }
}

impl<S, B> Service<Request<Body>> for HttpLogging<S>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();

        let route = RequestSnapshot::route_path(req.extensions(), req.uri());
        if !state.enabled || state.matcher.should_ignore(&route) {
            return Box::pin(async move { inner.call(req).await.map(|res| res.map(Body::new)) });
        }

        let request_id = RequestId::resolve(req.headers(), &state.id_field);
        let span = tracing::info_span!(
            "request",
            request_id = %request_id.as_str(),
            method = %req.method(),
            route = %route,
        );
        span.set_parent(extract_parent(req.headers()));

        Box::pin(log_request(state, inner, req, request_id).instrument(span))
    }
}

async fn log_request<S, B>(
    state: Arc<LoggingState>,
    mut inner: S,
    req: Request<Body>,
    request_id: RequestId,
) -> Result<Response<Body>, S::Error>
where
    S: Service<Request<Body>, Response = Response<B>>,
    S::Error: fmt::Display,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let begin = Instant::now();
    let (mut parts, body) = req.into_parts();
    parts.extensions.insert(request_id.clone());

    let captured = buffer(body, state.max_body_log_bytes).await;
    if let Some(err) = &captured.error {
        tracing::warn!(error = %err, "Failed to read request body");
    }

    let snapshot = RequestSnapshot::capture(&mut parts, captured.logged, Some(&request_id)).await;
    let response = match inner.call(Request::from_parts(parts, captured.body)).await {
        Ok(response) => response,
        Err(err) => {
            let report = ErrorReport::from_display("Error", &err);
            state.finish(snapshot, Outcome::Error(report), begin, None);
            return Err(err);
        }
    };

    let (res_parts, res_body) = response.into_parts();
    let captured = buffer(res_body, state.max_body_log_bytes).await;

    let outcome = match (res_parts.extensions.get::<ErrorReport>(), &captured.error) {
        (Some(report), _) => Outcome::Error(report.clone()),
        (None, Some(err)) => {
            tracing::warn!(error = %err, "Failed to read response body");
            Outcome::Error(ErrorReport::from_display("Error", err))
        }
        (None, None) => Outcome::Response {
            status: res_parts.status,
            headers: state
                .include_response_headers
                .then(|| header_map(&res_parts.headers)),
            body: captured.logged,
        },
    };

    let transformer = res_parts
        .extensions
        .get::<EndpointKey>()
        .and_then(|key| state.registry.lookup(key));
    state.finish(snapshot, outcome, begin, transformer.as_deref());

    Ok(Response::from_parts(res_parts, captured.body))
}

/// A body as seen by the layer.
struct Captured {
    /// Value written to the record.
    logged: Value,
    /// Body handed on, equivalent to the one read.
    body: Body,
    /// Message of the error the stream failed with.
    error: Option<String>,
}

/// Collect `body` if its size is known and within `limit`.
///
/// When the stream fails, the frames read so far are replayed ahead of
/// the same error, so the consumer sees what it would have seen unlogged.
async fn buffer<B>(body: B, limit: usize) -> Captured
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64);
    if !fits {
        return Captured {
            logged: Value::String(UNBUFFERED_BODY.to_string()),
            body: Body::new(body),
            error: None,
        };
    }

    let mut body = Box::pin(body);
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut trailers: Option<HeaderMap> = None;

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                let err: BoxError = err.into();
                let error = err.to_string();
                let read = stream::iter(chunks)
                    .map(|chunk| Ok::<_, BoxError>(Frame::data(chunk)));
                let failed = stream::once(async move { Err::<Frame<Bytes>, BoxError>(err) });
                return Captured {
                    logged: Value::String(UNREADABLE_BODY.to_string()),
                    body: Body::new(StreamBody::new(read.chain(failed))),
                    error: Some(error),
                };
            }
        };

        match frame.into_data() {
            Ok(data) => chunks.push(data),
            Err(frame) => {
                if let Ok(map) = frame.into_trailers() {
                    trailers.get_or_insert_with(HeaderMap::new).extend(map);
                }
            }
        }
    }

    let bytes = Bytes::from(chunks.concat());
    let logged = decode_body(&bytes);
    let body = match trailers {
        None => Body::from(bytes),
        Some(trailers) => {
            let frames = [Frame::data(bytes), Frame::trailers(trailers)];
            Body::new(StreamBody::new(stream::iter(
                frames.into_iter().map(Ok::<_, BoxError>),
            )))
        }
    };

    Captured {
        logged,
        body,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnorePathConfig;
    use crate::http::error::HttpException;
    use crate::http::request::RequestIdExt;
    use crate::observability::logging::MemorySink;
    use crate::observability::tracing::{layer as otel_layer, OtelTraceProvider, TraceProvider};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use http_body::SizeHint;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use serde_json::json;
    use std::convert::Infallible;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::{service_fn, ServiceExt};
    use tracing_subscriber::layer::SubscriberExt;

    /// Body announcing five bytes and failing on the first read.
    struct FailingBody;

    impl HttpBody for FailingBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))))
        }

        fn size_hint(&self) -> SizeHint {
            SizeHint::with_exact(5)
        }
    }

    fn layer(sink: Arc<MemorySink>) -> HttpLoggingLayer {
        HttpLoggingLayer::new(TransformerRegistry::new(), sink)
    }

    async fn echo(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let bytes = req.into_body().collect().await.unwrap().to_bytes();
        Ok(Response::new(Body::from(bytes)))
    }

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(200, false), Level::Info);
        assert_eq!(level_for(302, false), Level::Info);
        assert_eq!(level_for(404, false), Level::Warn);
        assert_eq!(level_for(422, true), Level::Warn);
        assert_eq!(level_for(500, false), Level::Error);
        assert_eq!(level_for(503, true), Level::Error);
        assert_eq!(level_for(302, true), Level::Error);
    }

    #[tokio::test]
    async fn test_body_forwarded_and_logged() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone()).layer(service_fn(echo));

        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("x-request-id", "abc")
            .body(Body::from(r#"{"qty":2}"#))
            .unwrap();
        let res = svc.oneshot(req).await.unwrap();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"qty":2}"#);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let (level, record) = &records[0];
        assert_eq!(*level, Level::Info);
        assert_eq!(record.request_id.as_deref(), Some("abc"));
        assert_eq!(record.http.req.body, json!({"qty": 2}));
        assert_eq!(record.http.res.body, json!({"qty": 2}));
        assert_eq!(record.message, "[REQUEST] [POST] [/echo]");
    }

    #[tokio::test]
    async fn test_disabled_layer_is_pass_through() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone()).enabled(false).layer(service_fn(echo));

        let res = svc
            .oneshot(Request::new(Body::from("hi")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_ignored_route_not_logged() {
        let sink = Arc::new(MemorySink::new());
        let matcher =
            PathMatcher::from_config(&[IgnorePathConfig::Exact("/health".into())]).unwrap();
        let svc = layer(sink.clone())
            .with_ignore_paths(matcher)
            .layer(service_fn(echo));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        svc.oneshot(req).await.unwrap();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_body_over_limit_not_buffered() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone())
            .with_max_body_log_bytes(4)
            .layer(service_fn(echo));

        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from("0123456789"))
            .unwrap();
        let res = svc.oneshot(req).await.unwrap();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"0123456789");

        let (_, record) = &sink.records()[0];
        assert_eq!(record.http.req.body, json!(UNBUFFERED_BODY));
        assert_eq!(record.http.res.body, json!(UNBUFFERED_BODY));
    }

    #[tokio::test]
    async fn test_error_report_classifies_response() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone()).layer(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(HttpException::not_found("order 7 not found").into_response())
        }));

        let res = svc.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let (level, record) = &sink.records()[0];
        assert_eq!(*level, Level::Warn);
        assert_eq!(record.http.status_code, 404);
        let error = record.error.as_ref().unwrap();
        assert_eq!(error.kind, "NOT_FOUND");
        assert_eq!(error.message, "order 7 not found");
    }

    #[tokio::test]
    async fn test_service_error_logged_and_returned() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone()).layer(service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, _>("backend gone".to_string())
        }));

        let err = svc.oneshot(Request::new(Body::empty())).await.unwrap_err();
        assert_eq!(err, "backend gone");

        let (level, record) = &sink.records()[0];
        assert_eq!(*level, Level::Error);
        assert_eq!(record.http.status_code, 500);
        assert_eq!(record.error.as_ref().unwrap().kind, "INTERNAL_SERVER_ERROR");
    }

    #[tokio::test]
    async fn test_trace_context_from_traceparent() {
        let provider = SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry().with(otel_layer(&provider));
        let _guard = tracing::subscriber::set_default(subscriber);

        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink).layer(service_fn(|_req: Request<Body>| async {
            let ctx = OtelTraceProvider.current_span_context().unwrap();
            Ok::<_, Infallible>(Response::new(Body::from(ctx.trace_id().to_string())))
        }));

        let req = Request::builder()
            .uri("/trace")
            .header(
                "traceparent",
                "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            )
            .body(Body::empty())
            .unwrap();
        let res = svc.oneshot(req).await.unwrap();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"4bf92f3577b34da6a3ce929d0e0e4736");
    }

    #[tokio::test]
    async fn test_unreadable_request_body_still_reaches_handler() {
        let sink = Arc::new(MemorySink::new());
        let called = Arc::new(AtomicBool::new(false));
        let seen = called.clone();
        let svc = layer(sink.clone()).layer(service_fn(move |_req: Request<Body>| {
            let seen = seen.clone();
            async move {
                seen.store(true, Ordering::SeqCst);
                Ok::<_, Infallible>(Response::new(Body::from("ok")))
            }
        }));

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::new(FailingBody))
            .unwrap();
        let res = svc.oneshot(req).await.unwrap();

        assert!(called.load(Ordering::SeqCst));
        assert_eq!(res.status(), StatusCode::OK);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        let (level, record) = &records[0];
        assert_eq!(*level, Level::Info);
        assert_eq!(record.http.status_code, 200);
        assert_eq!(record.http.req.body, json!(UNREADABLE_BODY));
        assert_eq!(record.http.res.body, json!("ok"));
    }

    #[tokio::test]
    async fn test_handler_sees_request_body_error() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone()).layer(service_fn(|req: Request<Body>| async {
            let status = match req.into_body().collect().await {
                Ok(_) => StatusCode::OK,
                Err(err) => {
                    assert!(err.to_string().contains("connection reset"));
                    StatusCode::BAD_REQUEST
                }
            };
            Ok::<_, Infallible>(Response::builder().status(status).body(Body::empty()).unwrap())
        }));

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::new(FailingBody))
            .unwrap();
        let res = svc.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let (level, record) = &sink.records()[0];
        assert_eq!(*level, Level::Warn);
        assert_eq!(record.http.status_code, 400);
    }

    #[tokio::test]
    async fn test_unreadable_response_body_forwarded() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone()).layer(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(FailingBody))
        }));

        let res = svc.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let err = res.into_body().collect().await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));

        let (level, record) = &sink.records()[0];
        assert_eq!(*level, Level::Error);
        assert_eq!(record.http.status_code, 500);
        assert_eq!(record.error.as_ref().unwrap().message, "connection reset");
    }

    #[tokio::test]
    async fn test_buffered_body_keeps_exact_length() {
        let sized = http_body_util::Full::new(Bytes::from_static(b"{\"a\":1}"));
        let captured = buffer(sized, 1024).await;
        assert_eq!(captured.logged, json!({"a": 1}));
        assert!(captured.error.is_none());
        assert_eq!(captured.body.size_hint().exact(), Some(7));
    }

    #[tokio::test]
    async fn test_request_id_visible_to_handler() {
        let sink = Arc::new(MemorySink::new());
        let svc = layer(sink.clone()).layer(service_fn(|req: Request<Body>| async move {
            let id = req.request_id().map(|id| id.as_str().to_string());
            Ok::<_, Infallible>(Response::new(Body::from(id.unwrap_or_default())))
        }));

        let res = svc.oneshot(Request::new(Body::empty())).await.unwrap();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let generated = String::from_utf8(body.to_vec()).unwrap();
        assert!(uuid::Uuid::parse_str(&generated).is_ok());

        let (_, record) = &sink.records()[0];
        assert_eq!(record.request_id.as_deref(), Some(generated.as_str()));
    }

    #[test]
    fn test_from_config_rejects_bad_header() {
        let mut config = LoggerConfig::default();
        config.id_field = "bad header".into();
        let result = HttpLoggingLayer::from_config(
            &config,
            TransformerRegistry::new(),
            Arc::new(MemorySink::new()),
        );
        assert!(matches!(result, Err(LayerError::IdField(_))));
    }
}
