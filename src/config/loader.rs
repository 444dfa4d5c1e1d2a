//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides and validate a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse `content`, apply overrides from `env` and validate.
pub fn parse_config<F>(content: &str, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: AppConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `LOG_LEVEL`, `DISABLE_LOG_INTERCEPTOR` and `INSTRUMENTATION_ENABLED`.
pub fn apply_env_overrides<F>(config: &mut AppConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = env("LOG_LEVEL") {
        match level.parse() {
            Ok(level) => config.logger.level = level,
            Err(e) => tracing::warn!(error = %e, "Ignoring LOG_LEVEL override"),
        }
    }

    if env("DISABLE_LOG_INTERCEPTOR").is_some_and(|v| !v.is_empty()) {
        config.logger.interceptor_enabled = false;
    }

    if let Some(enabled) = env("INSTRUMENTATION_ENABLED") {
        config.telemetry.instrumentation_enabled = enabled.trim().eq_ignore_ascii_case("true");
    }
}
