//! Shared fixtures for integration tests.

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use http_trace_logger::config::{AppConfig, IgnorePathConfig};
use http_trace_logger::http::{EndpointLayer, HttpException, InternalError};
use http_trace_logger::lifecycle::instrument;
use http_trace_logger::transform::{
    BodyLogTransformer, TransformError, TransformerRegistry, Typed, TypedTransformer,
};
use http_trace_logger::MemorySink;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrder {
    pub item: String,
    pub quantity: u32,
    pub card_number: String,
}

/// Masks the card number; skips orders of the "secret" item.
pub struct OrdersTransformer;

impl TypedTransformer for OrdersTransformer {
    type Request = CreateOrder;
    type Response = Value;

    fn transform_request(&self, mut request: CreateOrder) -> Result<Value, TransformError> {
        request.card_number = "****".to_string();
        Ok(serde_json::to_value(request)?)
    }

    fn skip(&self, request: &CreateOrder, _response: &Value) -> Result<bool, TransformError> {
        Ok(request.item == "secret")
    }
}

/// Every hook fails.
pub struct BrokenTransformer;

impl BodyLogTransformer for BrokenTransformer {
    fn transform_request(&self, _request: &Value) -> Result<Value, TransformError> {
        Err(TransformError::new("request hook failed"))
    }

    fn transform_response(&self, _response: &Value) -> Result<Value, TransformError> {
        Err(TransformError::new("response hook failed"))
    }

    fn skip(&self, _request: &Value, _response: &Value) -> Result<bool, TransformError> {
        Err(TransformError::new("skip hook failed"))
    }
}

async fn create_order(
    Json(body): Json<CreateOrder>,
) -> Result<(StatusCode, Json<Value>), HttpException> {
    if body.quantity == 0 {
        return Err(HttpException::unprocessable_entity("quantity must be positive"));
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({"id": 1, "item": body.item, "quantity": body.quantity})),
    ))
}

async fn get_order(Path(id): Path<u64>) -> Result<Json<Value>, HttpException> {
    if id != 1 {
        return Err(HttpException::not_found(format!("order {id} not found")));
    }
    Ok(Json(json!({"id": id, "item": "coffee"})))
}

async fn broken() -> Result<Json<Value>, InternalError> {
    let _: Value = serde_json::from_str("{not json")?;
    Ok(Json(Value::Null))
}

async fn panics() -> &'static str {
    panic!("handler exploded")
}

/// Test application logging into a memory sink.
pub fn app(config: AppConfig) -> (Router, Arc<MemorySink>) {
    let registry = TransformerRegistry::new();
    registry
        .register_transformer("OrdersController", "create", Typed(OrdersTransformer))
        .register_transformer("AuditController", "record", BrokenTransformer);

    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/orders",
            post(create_order).layer(EndpointLayer::new("OrdersController", "create")),
        )
        .route("/orders/{id}", get(get_order))
        .route("/carts", post(create_order))
        .route(
            "/audit",
            post(|Json(body): Json<Value>| async move { Json(body) })
                .layer(EndpointLayer::new("AuditController", "record")),
        )
        .route("/broken", get(broken))
        .route("/panic", get(panics));

    let sink = Arc::new(MemorySink::new());
    let router = instrument(router, &config, registry, sink.clone()).unwrap();
    (router, sink)
}

/// Default config with `/health` ignored.
pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.logger.ignore_paths = vec![IgnorePathConfig::Exact("/health".into())];
    config
}
