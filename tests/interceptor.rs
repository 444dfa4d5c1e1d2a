//! End-to-end behavior of the logging stack on an in-process router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use http_trace_logger::config::IgnorePathConfig;
use http_trace_logger::observability::severity::Level;

mod common;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", "integration-test")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_ignored_route_is_not_logged() {
    let (app, sink) = common::app(common::config());

    let res = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_ignore_pattern_is_case_insensitive() {
    let mut config = common::config();
    config.logger.ignore_paths = vec![IgnorePathConfig::Pattern {
        pattern: "^/ORDERS/".into(),
    }];
    let (app, sink) = common::app(config);

    app.oneshot(get("/orders/1")).await.unwrap();
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_successful_request_logged_with_transform() {
    let (app, sink) = common::app(common::config());

    let req = post_json(
        "/orders?source=web",
        json!({"item": "coffee", "quantity": 2, "card_number": "4111111111111111"}),
    );
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(body_json(res).await["item"], "coffee");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let (level, record) = &records[0];
    assert_eq!(*level, Level::Info);
    assert_eq!(record.message, "[REQUEST] [POST] [/orders]");
    assert!(record.duration >= 0.0);
    assert!(record.request_id.is_some());
    assert!(record.error.is_none());

    let http = &record.http;
    assert_eq!(http.method, "POST");
    assert_eq!(http.status_code, 201);
    assert_eq!(http.url, "/orders");
    assert_eq!(http.useragent.as_deref(), Some("integration-test"));
    assert_eq!(http.url_details.full, "/orders?source=web");
    assert_eq!(http.url_details.query_string["source"], "web");
    assert_eq!(http.req.body["card_number"], "****");
    assert_eq!(http.res.body["id"], 1);
    assert!(http.res.headers.is_none());
}

#[tokio::test]
async fn test_untagged_route_logged_without_transform() {
    let (app, sink) = common::app(common::config());

    let req = post_json(
        "/carts",
        json!({"item": "tea", "quantity": 1, "card_number": "4111111111111111"}),
    );
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let (level, record) = &records[0];
    assert_eq!(*level, Level::Info);
    assert_eq!(record.message, "[REQUEST] [POST] [/carts]");
    assert!(record.duration >= 0.0);
    assert_eq!(record.http.method, "POST");
    assert_eq!(record.http.status_code, 201);
    assert_eq!(record.http.req.body["card_number"], "4111111111111111");
    assert!(record.http.req.transform_error.is_none());
    assert!(record.http.skip_error.is_none());
}

#[tokio::test]
async fn test_skip_hook_drops_record() {
    let (app, sink) = common::app(common::config());

    let req = post_json(
        "/orders",
        json!({"item": "secret", "quantity": 1, "card_number": "4111"}),
    );
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_http_exception_logged_as_warning() {
    let (app, sink) = common::app(common::config());

    let req = post_json(
        "/orders",
        json!({"item": "secret", "quantity": 0, "card_number": "4111"}),
    );
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["message"], "quantity must be positive");

    // Error outcomes bypass the transformer, skip hook included.
    let records = sink.records();
    assert_eq!(records.len(), 1);
    let (level, record) = &records[0];
    assert_eq!(*level, Level::Warn);
    assert_eq!(record.http.status_code, 422);
    assert_eq!(record.http.req.body["card_number"], "4111");

    let error = record.error.as_ref().unwrap();
    assert_eq!(error.kind, "UNPROCESSABLE_ENTITY");
    assert_eq!(error.message, "quantity must be positive");

    let raw = record.http.res.raw_exception.as_ref().unwrap();
    assert_eq!(raw.name, "HttpException");
    assert_eq!(raw.status, Some(422));
}

#[tokio::test]
async fn test_route_params_recorded() {
    let (app, sink) = common::app(common::config());

    let res = app.oneshot(get("/orders/42")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let (level, record) = &sink.records()[0];
    assert_eq!(*level, Level::Warn);
    assert_eq!(record.message, "[REQUEST] [GET] [/orders/{id}]");
    assert_eq!(record.http.url_details.path, "/orders/{id}");
    assert_eq!(record.http.url_details.full, "/orders/42");
    assert_eq!(record.http.url_details.route_params["id"], "42");
    assert_eq!(record.error.as_ref().unwrap().kind, "NOT_FOUND");
}

#[tokio::test]
async fn test_hook_failures_recorded_next_to_bodies() {
    let (app, sink) = common::app(common::config());

    let res = app
        .oneshot(post_json("/audit", json!({"event": "login"})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (level, record) = &sink.records()[0];
    assert_eq!(*level, Level::Info);
    assert_eq!(record.http.skip_error.as_deref(), Some("skip hook failed"));
    assert_eq!(record.http.req.body, json!({"event": "login"}));
    assert_eq!(
        record.http.req.transform_error.as_deref(),
        Some("request hook failed")
    );
    assert_eq!(
        record.http.res.transform_error.as_deref(),
        Some("response hook failed")
    );
}

#[tokio::test]
async fn test_internal_error_logged_as_error() {
    let (app, sink) = common::app(common::config());

    let res = app.oneshot(get("/broken")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(res).await,
        json!({"statusCode": 500, "message": "Internal server error"})
    );

    let (level, record) = &sink.records()[0];
    assert_eq!(*level, Level::Error);
    assert_eq!(record.http.status_code, 500);
    assert_eq!(record.error.as_ref().unwrap().kind, "INTERNAL_SERVER_ERROR");
    assert!(record.http.res.raw_exception.is_none());
}

#[tokio::test]
async fn test_panic_logged_and_answered() {
    let (app, sink) = common::app(common::config());

    let res = app.oneshot(get("/panic")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let (level, record) = &sink.records()[0];
    assert_eq!(*level, Level::Error);
    assert_eq!(record.error.as_ref().unwrap().message, "handler exploded");
}

#[tokio::test]
async fn test_request_id_header_reused() {
    let (app, sink) = common::app(common::config());

    let req = Request::builder()
        .uri("/orders/1")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    app.oneshot(req).await.unwrap();

    let (_, record) = &sink.records()[0];
    assert_eq!(record.request_id.as_deref(), Some("req-123"));
    assert_eq!(record.http.status_code, 200);
}

#[tokio::test]
async fn test_disabled_interceptor_logs_nothing() {
    let mut config = common::config();
    config.logger.interceptor_enabled = false;
    let (app, sink) = common::app(config);

    let res = app.oneshot(get("/orders/1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_response_headers_included_when_configured() {
    let mut config = common::config();
    config.logger.include_response_headers = true;
    let (app, sink) = common::app(config);

    app.oneshot(get("/orders/1")).await.unwrap();

    let (_, record) = &sink.records()[0];
    let headers = record.http.res.headers.as_ref().unwrap();
    assert_eq!(headers["content-type"], "application/json");
}
