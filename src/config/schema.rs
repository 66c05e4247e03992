//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for both
//! services. All types derive Serde traits for deserialization from config
//! files, and every section falls back to its `Default` when omitted.

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration shared by the gateway and the resolver.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Front gateway settings.
    pub gateway: GatewayConfig,

    /// Resolver service settings.
    pub resolver: ResolverConfig,

    /// Outbound HTTP client settings.
    pub upstream: UpstreamConfig,

    /// Server-side timeouts.
    pub timeouts: TimeoutConfig,

    /// Body size limits.
    pub limits: LimitsConfig,

    /// Logging, metrics and trace export.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl ListenerConfig {
    fn on_port(port: u16) -> Self {
        Self {
            bind_address: format!("0.0.0.0:{port}"),
        }
    }
}

const GATEWAY_PORT: u16 = 8080;
const RESOLVER_PORT: u16 = 8081;

/// A `[*.listener]` table as written; unset keys take the service's default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListenerTable {
    bind_address: Option<String>,
}

impl ListenerTable {
    fn or_port(self, port: u16) -> ListenerConfig {
        match self.bind_address {
            Some(bind_address) => ListenerConfig { bind_address },
            None => ListenerConfig::on_port(port),
        }
    }
}

fn gateway_listener<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ListenerConfig, D::Error> {
    Ok(ListenerTable::deserialize(deserializer)?.or_port(GATEWAY_PORT))
}

fn resolver_listener<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ListenerConfig, D::Error> {
    Ok(ListenerTable::deserialize(deserializer)?.or_port(RESOLVER_PORT))
}

/// Front gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    #[serde(deserialize_with = "gateway_listener")]
    pub listener: ListenerConfig,

    /// Base URL of the resolver service, without the `/weather` path.
    pub resolver_base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::on_port(GATEWAY_PORT),
            resolver_base_url: "http://localhost:8081".to_string(),
        }
    }
}

/// Resolver service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    #[serde(deserialize_with = "resolver_listener")]
    pub listener: ListenerConfig,

    /// Postal-code directory.
    pub location_api: LocationApiConfig,

    /// Current-weather provider.
    pub weather_api: WeatherApiConfig,

    /// How upstream failures are reported to callers.
    pub error_mapping: ErrorMapping,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::on_port(RESOLVER_PORT),
            location_api: LocationApiConfig::default(),
            weather_api: WeatherApiConfig::default(),
            error_mapping: ErrorMapping::default(),
        }
    }
}

/// Location directory endpoint. Requests go to `{base_url}/{zip}/json/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationApiConfig {
    pub base_url: String,
}

impl Default for LocationApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://viacep.com.br/ws".to_string(),
        }
    }
}

/// Weather provider endpoint. Requests go to `{base_url}?key=..&q=..`.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherApiConfig {
    pub base_url: String,

    /// Provider API key. Usually supplied through `WEATHER_API_KEY`.
    pub api_key: String,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.weatherapi.com/v1/current.json".to_string(),
            api_key: String::new(),
        }
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for WeatherApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

/// Status-code policy for upstream failures in the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMapping {
    /// Transport and parse failures surface as 404, like a missing record.
    #[default]
    Legacy,
    /// Transport and parse failures surface as 502 Bad Gateway.
    Strict,
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Skip TLS certificate verification on the resolver's outbound calls.
    /// Off by default; only meant for environments with broken trust stores.
    pub accept_invalid_certs: bool,

    /// Connection establishment timeout in seconds. Unset means no limit.
    pub connect_timeout_secs: Option<u64>,
}

/// Server-side timeouts.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed per inbound request in seconds. Unset means the
    /// handler waits on upstreams indefinitely.
    pub request_secs: Option<u64>,
}

/// Body size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound request body and relayed response body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// OpenTelemetry span export.
    pub tracing: TracingConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            tracing: TracingConfig::default(),
        }
    }
}

/// OTLP exporter protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExporterKind {
    #[default]
    OtlpGrpc,
    OtlpHttp,
}

/// OpenTelemetry span export configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Export spans to a collector.
    pub enabled: bool,

    /// Collector endpoint (e.g., "http://otel-collector:4317").
    pub endpoint: String,

    pub exporter: ExporterKind,

    /// Head sampling ratio for root spans; child spans follow their parent.
    pub sampler_ratio: f64,

    /// Exporter timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:4317".to_string(),
            exporter: ExporterKind::default(),
            sampler_ratio: 1.0,
            timeout_ms: None,
        }
    }
}
