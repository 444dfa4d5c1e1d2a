//! Internal log levels and their OpenTelemetry severity numbers.
//!
//! # Mapping
//! ```text
//! internal  10  20  30  40  50  60
//! severity   1   5   9  13  17  21
//!           trace debug info warn error fatal
//! ```
//!
//! Unmapped internal levels fall back to INFO (9).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity number used when an internal level has no mapping (INFO).
pub const DEFAULT_SEVERITY: u8 = 9;

/// Map an internal numeric level onto the OpenTelemetry severity scale.
pub fn severity_for(internal_level: u8) -> u8 {
    match internal_level {
        10 => 1,
        20 => 5,
        30 => 9,
        40 => 13,
        50 => 17,
        60 => 21,
        _ => DEFAULT_SEVERITY,
    }
}

/// Internal log level.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 10,
    Debug = 20,
    #[default]
    Info = 30,
    Warn = 40,
    Error = 50,
    Fatal = 60,
}

impl Level {
    /// Internal numeric value (10..=60).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// OpenTelemetry severity number for this level.
    pub fn severity_number(self) -> u8 {
        severity_for(self.as_u8())
    }

    /// Lowercase label emitted alongside the severity number.
    pub fn label(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    ///
    /// `tracing` has no FATAL, so it filters like ERROR.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Level::Fatal => "error",
            other => other.label(),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a level name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}
