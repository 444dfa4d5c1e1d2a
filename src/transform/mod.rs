//! Request/response body transformation for logging.
//!
//! # Data Flow
//! ```text
//! Application bootstrap:
//!     registry.register_transformer("OrdersController", "create", T)
//!     → EndpointKey("OrdersController-create") → Arc<dyn BodyLogTransformer>
//!
//! Request handling:
//!     route tagged with EndpointLayer("OrdersController", "create")
//!     → interceptor reads EndpointKey from the response
//!     → registry.lookup(key)
//!     → log builder applies skip / transform_request / transform_response
//! ```

pub mod registry;
pub mod transformer;

pub use registry::{EndpointKey, TransformerRegistry};
pub use transformer::{BodyLogTransformer, TransformError, Typed, TypedTransformer};
