//! Configuration validation.
//!
//! Serde handles syntax; this module checks values: addresses parse, URLs
//! are absolute, ranges hold. Every problem is reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate the whole configuration tree.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address(
        "gateway.listener.bind_address",
        &config.gateway.listener.bind_address,
        &mut errors,
    );
    check_bind_address(
        "resolver.listener.bind_address",
        &config.resolver.listener.bind_address,
        &mut errors,
    );

    // The gateway forwards over a plain HTTP connector.
    if let Some(url) = check_url(
        "gateway.resolver_base_url",
        &config.gateway.resolver_base_url,
        &mut errors,
    ) {
        if url.scheme() != "http" {
            errors.push(ValidationError::new(
                "gateway.resolver_base_url",
                format!("scheme must be http, got {}", url.scheme()),
            ));
        }
    }

    check_url(
        "resolver.location_api.base_url",
        &config.resolver.location_api.base_url,
        &mut errors,
    );
    check_url(
        "resolver.weather_api.base_url",
        &config.resolver.weather_api.base_url,
        &mut errors,
    );

    if config.upstream.connect_timeout_secs == Some(0) {
        errors.push(ValidationError::new(
            "upstream.connect_timeout_secs",
            "must be greater than zero when set",
        ));
    }
    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero when set",
        ));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new(
            "limits.max_body_bytes",
            "must be greater than zero",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled {
        check_bind_address(
            "observability.metrics_address",
            &observability.metrics_address,
            &mut errors,
        );
    }
    let ratio = observability.tracing.sampler_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        errors.push(ValidationError::new(
            "observability.tracing.sampler_ratio",
            format!("must be within [0, 1], got {ratio}"),
        ));
    }
    if observability.tracing.enabled {
        check_url(
            "observability.tracing.endpoint",
            &observability.tracing.endpoint,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that only matter when the resolver is the process being started.
pub fn validate_resolver_startup(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    if config.resolver.weather_api.api_key.trim().is_empty() {
        return Err(vec![ValidationError::new(
            "resolver.weather_api.api_key",
            "must be set (config file or WEATHER_API_KEY)",
        )]);
    }
    Ok(())
}

fn check_bind_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(
            field,
            format!("invalid socket address '{value}': {e}"),
        ));
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) -> Option<Url> {
    match Url::parse(value) {
        Ok(url) if url.cannot_be_a_base() => {
            errors.push(ValidationError::new(field, format!("'{value}' is not a base URL")));
            None
        }
        Ok(url) => Some(url),
        Err(e) => {
            errors.push(ValidationError::new(field, format!("invalid URL '{value}': {e}")));
            None
        }
    }
}
