//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: TOML file (if any), then environment, then validation.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of file/default values.
///
/// `lookup` abstracts the environment so tests do not mutate process state.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let set = |target: &mut String, key: &str| {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            *target = value;
        }
    };

    set(&mut config.gateway.listener.bind_address, "GATEWAY_BIND_ADDRESS");
    set(&mut config.gateway.resolver_base_url, "RESOLVER_BASE_URL");
    set(&mut config.resolver.listener.bind_address, "RESOLVER_BIND_ADDRESS");
    set(&mut config.resolver.location_api.base_url, "LOCATION_API_BASE_URL");
    set(&mut config.resolver.weather_api.base_url, "WEATHER_API_BASE_URL");
    set(&mut config.resolver.weather_api.api_key, "WEATHER_API_KEY");

    if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()) {
        config.observability.tracing.endpoint = endpoint;
        config.observability.tracing.enabled = true;
    }

    if let Some(flag) = lookup("UPSTREAM_ACCEPT_INVALID_CERTS") {
        config.upstream.accept_invalid_certs = matches!(
            flag.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
    }
}
