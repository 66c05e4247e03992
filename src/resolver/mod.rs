//! Resolver service.
//!
//! # Data Flow
//! ```text
//! GET /weather?zip=..  (trace context extracted from headers)
//!     → handler.rs (validate zip length)
//!     → location.rs (postal-code directory: zip → city name)
//!     → weather.rs (weather provider: city → °C)
//!     → temperature.rs (°C → °C/°F/K)
//!     → 200 {"temp_C", "temp_F", "temp_K"}
//!
//! Failures short-circuit through error.rs, which applies the configured
//! ErrorMapping (legacy: 404, strict: 502 for upstream faults).
//! ```

pub mod error;
pub mod handler;
pub mod location;
pub mod temperature;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RelayConfig, UpstreamConfig};
use crate::http::HttpServer;
use crate::observability::Telemetry;

pub use error::ResolveError;
pub use handler::{resolve, ResolverState};
pub use location::{HttpLocationDirectory, LocationDirectory, LocationError};
pub use temperature::TemperatureReport;
pub use weather::{HttpWeatherSource, WeatherError, WeatherSource};

pub const SERVICE_NAME: &str = "resolver";

/// Build the shared outbound client for the external APIs.
pub fn build_upstream_client(cfg: &UpstreamConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("weather-relay/", env!("CARGO_PKG_VERSION")));

    if let Some(secs) = cfg.connect_timeout_secs {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }

    if cfg.accept_invalid_certs {
        tracing::warn!("TLS certificate verification is DISABLED for upstream APIs");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build()
}

/// Wire the HTTP-backed directory and weather source into handler state.
pub fn build_state(config: &RelayConfig, telemetry: Telemetry) -> Result<ResolverState, reqwest::Error> {
    let client = build_upstream_client(&config.upstream)?;
    let resolver = &config.resolver;

    Ok(ResolverState {
        directory: Arc::new(HttpLocationDirectory::new(
            client.clone(),
            resolver.location_api.base_url.clone(),
        )),
        weather: Arc::new(HttpWeatherSource::new(
            client,
            resolver.weather_api.base_url.clone(),
            resolver.weather_api.api_key.clone(),
        )),
        telemetry,
        error_mapping: resolver.error_mapping,
    })
}

/// Create the resolver HTTP server.
pub fn build_server(config: &RelayConfig, telemetry: Telemetry) -> Result<HttpServer, reqwest::Error> {
    let state = build_state(config, telemetry)?;
    Ok(HttpServer::new(SERVICE_NAME, handler::router(state), config))
}
