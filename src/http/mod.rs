//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → middleware/logging.rs (ignore check, request ID, trace context)
//!     → request.rs (snapshot of method, route, URL, headers, body)
//!     → middleware/endpoint.rs (endpoint identity for transformer lookup)
//!     → handler
//!     → error.rs (HttpException / InternalError / panic → ErrorReport)
//!     → middleware/logging.rs (outcome → log record)
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod request;

pub use error::{panic_response, ErrorReport, HttpException, InternalError};
pub use middleware::{EndpointLayer, HttpLoggingLayer};
pub use request::{RequestId, RequestIdExt, RequestSnapshot, X_REQUEST_ID};
