//! Ignore-path matching.
//!
//! # Responsibilities
//! - Decide whether a route path is excluded from request logging
//! - Support exact entries and regex patterns
//!
//! # Design Decisions
//! - Exact entries compare case-insensitively
//! - Patterns are tested against the upper-cased path, so they should be
//!   authored in upper case (e.g. `^/INTERNAL/`)
//! - First match wins; an empty list ignores nothing
//! - The list is built once at startup and never mutated

use regex::Regex;

use crate::config::IgnorePathConfig;

/// A single ignore-list entry.
#[derive(Debug, Clone)]
pub enum IgnorePath {
    /// Route path compared case-insensitively.
    Exact(String),
    /// Pattern tested against the upper-cased route path.
    Pattern(Regex),
}

impl IgnorePath {
    /// Exact entry.
    pub fn exact(path: impl Into<String>) -> Self {
        IgnorePath::Exact(path.into())
    }

    /// Pattern entry.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(IgnorePath::Pattern(Regex::new(pattern)?))
    }

    /// Returns true if `path` is covered by this entry.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            IgnorePath::Exact(expected) => path.to_uppercase() == expected.to_uppercase(),
            IgnorePath::Pattern(re) => re.is_match(&path.to_uppercase()),
        }
    }
}

impl TryFrom<&IgnorePathConfig> for IgnorePath {
    type Error = regex::Error;

    fn try_from(entry: &IgnorePathConfig) -> Result<Self, Self::Error> {
        match entry {
            IgnorePathConfig::Exact(path) => Ok(IgnorePath::exact(path.clone())),
            IgnorePathConfig::Pattern { pattern } => IgnorePath::pattern(pattern),
        }
    }
}

/// Returns true if any entry in `ignore_list` matches `path`.
pub fn should_ignore(path: &str, ignore_list: &[IgnorePath]) -> bool {
    ignore_list.iter().any(|entry| entry.matches(path))
}

/// Immutable ignore list.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    entries: Vec<IgnorePath>,
}

impl PathMatcher {
    pub fn new(entries: Vec<IgnorePath>) -> Self {
        Self { entries }
    }

    /// Compile the configured entries.
    pub fn from_config(entries: &[IgnorePathConfig]) -> Result<Self, regex::Error> {
        let entries = entries
            .iter()
            .map(IgnorePath::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(entries))
    }

    /// Returns true if `path` should not be logged.
    pub fn should_ignore(&self, path: &str) -> bool {
        should_ignore(path, &self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
