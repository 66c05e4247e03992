//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Attach the OpenTelemetry layer so spans are exported
//! - Configure log level from `RUST_LOG` or config
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` takes precedence over the configured level

use opentelemetry_sdk::trace::Tracer;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, ObservabilityConfig};

/// Filter used when `RUST_LOG` is absent.
pub fn default_filter(cfg: &ObservabilityConfig) -> String {
    format!("weather_relay={level},tower_http={level},{level}", level = cfg.log_level)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(
    cfg: &ObservabilityConfig,
    otel: Option<OpenTelemetryLayer<Registry, Tracer>>,
) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(cfg)));

    let fmt_layer = match cfg.log_format {
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Pretty => fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(otel)
        .with(filter)
        .with(fmt_layer)
        .try_init()
}
