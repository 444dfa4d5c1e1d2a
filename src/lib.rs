//! Structured request logging for axum services.
//!
//! One record per handled request: method, route, URL, headers, bodies,
//! status, duration, client address, request ID and trace correlation.
//! Bodies can be rewritten or the record dropped per endpoint through a
//! [`transform::TransformerRegistry`].

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod logger;
pub mod observability;
pub mod routing;
pub mod transform;

pub use config::AppConfig;
pub use http::{EndpointLayer, HttpException, HttpLoggingLayer, InternalError};
pub use observability::logging::{JsonSink, LogSink, MemorySink};
pub use transform::{BodyLogTransformer, TransformerRegistry};
