//! Weather relay (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   Client                Gateway (:8080)              Resolver (:8081)
//!     │  POST /weather        │                             │
//!     │  {"postalCode":..}    │                             │
//!     ├──────────────────────▶│  GET /weather?zip=..        │
//!     │                       │  traceparent, x-request-id  │
//!     │                       ├────────────────────────────▶│──▶ location API
//!     │                       │                             │──▶ weather API
//!     │                       │◀────────────────────────────┤
//!     │◀──────────────────────┤  status + body relayed      │
//! ```
//!
//! One binary runs either service: `weather-relay gateway` or
//! `weather-relay resolver`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use weather_relay::config::{load_config, validation::validate_resolver_startup, ConfigError};
use weather_relay::lifecycle::{wait_for_signal, Shutdown};
use weather_relay::observability::{logging, metrics, tracing as otel};
use weather_relay::{gateway, resolver, HttpServer, RelayConfig, Telemetry};

#[derive(Parser)]
#[command(name = "weather-relay")]
#[command(about = "Postal code to temperature relay", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and environment apply without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand, Clone, Copy)]
enum Service {
    /// Run the front gateway (POST /weather)
    Gateway,
    /// Run the resolver (GET /weather?zip=)
    Resolver,
}

impl Service {
    fn name(self) -> &'static str {
        match self {
            Service::Gateway => gateway::SERVICE_NAME,
            Service::Resolver => resolver::SERVICE_NAME,
        }
    }

    fn bind_address(self, config: &RelayConfig) -> &str {
        match self {
            Service::Gateway => &config.gateway.listener.bind_address,
            Service::Resolver => &config.resolver.listener.bind_address,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let service = cli.service;

    let config = load_config(cli.config.as_deref())?;
    if let Service::Resolver = service {
        validate_resolver_startup(&config).map_err(ConfigError::Validation)?;
    }

    let provider = otel::init_tracer_provider(&config.observability.tracing, service.name())?;
    logging::init_logging(
        &config.observability,
        Some(otel::otel_layer(&provider, service.name())),
    )?;

    tracing::info!(
        service = service.name(),
        version = env!("CARGO_PKG_VERSION"),
        "weather-relay starting"
    );

    let tracing_cfg = &config.observability.tracing;
    if tracing_cfg.enabled {
        tracing::info!(
            endpoint = %tracing_cfg.endpoint,
            exporter = ?tracing_cfg.exporter,
            sampler_ratio = tracing_cfg.sampler_ratio,
            "OTLP span export enabled"
        );
    }

    if config.observability.metrics_enabled {
        // Address already checked by validation.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let telemetry = Telemetry::w3c();
    let server: HttpServer = match service {
        Service::Gateway => gateway::build_server(&config, telemetry),
        Service::Resolver => resolver::build_server(&config, telemetry)?,
    };

    let listener = TcpListener::bind(service.bind_address(&config)).await?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    let result = server.run(listener, shutdown.subscribe()).await;
    otel::shutdown_tracer_provider(provider);
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
