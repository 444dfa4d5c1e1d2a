//! Tower middleware for request logging.
//!
//! # Layering
//! ```text
//! Router
//!     .route(path, handler.layer(EndpointLayer))   // endpoint identity
//!     .route_layer(CatchPanicLayer)                // panics → 500 + report
//!     .route_layer(HttpLoggingLayer)               // one record per request
//! ```

pub mod endpoint;
pub mod logging;

pub use endpoint::{EndpointLayer, EndpointService};
pub use logging::{level_for, HttpLogging, HttpLoggingLayer, LayerError};
