//! Orders demo service with request logging.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ TraceLayer ─▶ TimeoutLayer ─▶ HttpLoggingLayer ─▶ CatchPanicLayer ─▶ handler
//!                                                        │
//!                                                        ▼
//!                                                  LogSink (JSON on stdout)
//! ```
//!
//! Routes:
//! - `GET  /health` (usually listed in `logger.ignore_paths`)
//! - `POST /orders` (card number masked in the log)
//! - `GET  /orders/{id}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use http_trace_logger::config::{load_config, loader::apply_env_overrides, AppConfig};
use http_trace_logger::http::{EndpointLayer, HttpException};
use http_trace_logger::lifecycle::{instrument, serve, shutdown_signal};
use http_trace_logger::observability;
use http_trace_logger::transform::{TransformError, TransformerRegistry, Typed, TypedTransformer};
use http_trace_logger::JsonSink;

#[derive(Debug, Parser)]
#[command(name = "http-trace-logger", version, about = "Orders demo with request logging")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateOrder {
    item: String,
    quantity: u32,
    card_number: String,
}

#[derive(Debug, Clone, Serialize)]
struct Order {
    id: u64,
    item: String,
    quantity: u32,
}

#[derive(Default)]
struct AppState {
    next_id: AtomicU64,
}

/// Masks all but the last four card digits.
struct MaskCardNumber;

impl TypedTransformer for MaskCardNumber {
    type Request = CreateOrder;
    type Response = Value;

    fn transform_request(&self, mut request: CreateOrder) -> Result<Value, TransformError> {
        let digits: Vec<char> = request.card_number.chars().collect();
        let keep = digits.len().saturating_sub(4);
        request.card_number = digits
            .iter()
            .enumerate()
            .map(|(i, c)| if i < keep { '*' } else { *c })
            .collect();
        Ok(serde_json::to_value(request)?)
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOrder>,
) -> Result<(StatusCode, Json<Order>), HttpException> {
    if body.quantity == 0 {
        return Err(HttpException::unprocessable_entity("quantity must be positive"));
    }

    let order = Order {
        id: state.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        item: body.item,
        quantity: body.quantity,
    };
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(Path(id): Path<u64>) -> Result<Json<Order>, HttpException> {
    if id != 1 {
        return Err(HttpException::not_found(format!("order {id} not found")));
    }
    Ok(Json(Order {
        id,
        item: "coffee".to_string(),
        quantity: 1,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = AppConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        }
    };

    let telemetry = observability::init(&config)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "http-trace-logger starting"
    );

    let registry = TransformerRegistry::new();
    registry.register_transformer("OrdersController", "create", Typed(MaskCardNumber));

    let app = Router::new()
        .route("/health", get(health))
        .route(
            "/orders",
            post(create_order).layer(EndpointLayer::new("OrdersController", "create")),
        )
        .route(
            "/orders/{id}",
            get(get_order).layer(EndpointLayer::new("OrdersController", "find")),
        )
        .with_state(Arc::new(AppState::default()));

    let sink = Arc::new(JsonSink::from_config(&config.logger));
    let app = instrument(app, &config, registry, sink)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    serve(listener, app, shutdown_signal()).await?;

    telemetry.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}
