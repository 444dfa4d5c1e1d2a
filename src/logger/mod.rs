//! Request log records.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot + Outcome + elapsed
//!     → builder.rs (status, transforms, error classification)
//!     → record.rs (LogRecord)
//!     → LogSink (level chosen by the interceptor)
//!     → redact.rs (applied at emission)
//! ```

pub mod builder;
pub mod record;
pub mod redact;

pub use builder::{build, status_name, Outcome};
pub use record::LogRecord;
pub use redact::Redactor;
