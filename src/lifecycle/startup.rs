//! Startup orchestration.
//!
//! # Responsibilities
//! - Wrap the application router in the logging stack
//! - Serve it with client addresses and graceful shutdown
//!
//! # Design Decisions
//! - Logging and panic capture are route layers: they only see matched routes
//! - Timeout and HTTP tracing wrap the whole router
//! - Fail fast: an invalid logging setup is a startup error

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::error::panic_response;
use crate::http::middleware::{HttpLoggingLayer, LayerError};
use crate::observability::logging::LogSink;
use crate::transform::TransformerRegistry;

/// Apply request logging, panic capture, timeout and HTTP tracing.
///
/// Call after all routes are registered: route layers only wrap routes
/// that already exist.
#[allow(deprecated)]
pub fn instrument(
    router: Router,
    config: &AppConfig,
    registry: TransformerRegistry,
    sink: Arc<dyn LogSink>,
) -> Result<Router, LayerError> {
    let logging = HttpLoggingLayer::from_config(&config.logger, registry, sink)?;

    tracing::info!(
        enabled = config.logger.interceptor_enabled,
        ignored_paths = config.logger.ignore_paths.len(),
        "Request logging configured"
    );

    Ok(router
        .route_layer(CatchPanicLayer::custom(panic_response))
        .route_layer(logging)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.listener.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http()))
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTP server starting");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
