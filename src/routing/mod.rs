//! Route-level filtering.
//!
//! # Data Flow
//! ```text
//! Configured ignore list (exact strings, patterns)
//!     → matcher.rs (compile once at startup)
//!     → PathMatcher (immutable, shared via Arc)
//!
//! Incoming request:
//!     matched route path (e.g. /orders/{id})
//!     → PathMatcher::should_ignore
//!     → skip logging or continue
//! ```

pub mod matcher;

pub use matcher::{should_ignore, IgnorePath, PathMatcher};
