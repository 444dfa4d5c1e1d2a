//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Initialize observability → Instrument router → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then listeners
//! - Shutdown waits for in-flight requests so their records are written

pub mod signals;
pub mod startup;

pub use signals::shutdown_signal;
pub use startup::{instrument, serve};
