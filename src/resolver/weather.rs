//! Current-weather lookup.
//!
//! Talks to a WeatherAPI.com-compatible endpoint:
//! `GET {base_url}?key={api_key}&q={location}` answering
//! `{"current": {"temp_c": 21.0, ...}}`, or `{"error": {"code": .., "message": ..}}`.

use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::observability::metrics;

/// Provider error codes meaning "no such location" rather than a fault.
const LOCATION_NOT_FOUND_CODES: [i64; 3] = [1003, 1005, 1006];

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("no weather available for {location}: {message}")]
    NotFound { location: String, message: String },

    #[error("weather provider rejected the request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("weather provider request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("weather provider returned an unreadable payload: {0}")]
    Malformed(String),
}

/// Source of current temperatures by location name.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_celsius(&self, location: &str) -> Result<f64, WeatherError>;
}

/// Weather source backed by the HTTP API.
#[derive(Clone)]
pub struct HttpWeatherSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpWeatherSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for HttpWeatherSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWeatherSource")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
    #[instrument(name = "weather.lookup", skip(self), fields(otel.kind = "client"))]
    async fn current_celsius(&self, location: &str) -> Result<f64, WeatherError> {
        let started = Instant::now();

        // The query string carries the API key; strip URLs from errors.
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("q", location)])
            .send()
            .await;
        let body = match response {
            Ok(response) => response.bytes().await,
            Err(e) => Err(e),
        };
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                metrics::record_upstream("weather", "transport_error", started);
                return Err(WeatherError::Transport(e.without_url()));
            }
        };

        let result = parse_current_weather(location, &body);
        let outcome = match &result {
            Ok(_) => "ok",
            Err(WeatherError::NotFound { .. }) => "not_found",
            Err(WeatherError::Rejected { .. }) => "rejected",
            Err(_) => "malformed",
        };
        metrics::record_upstream("weather", outcome, started);
        result
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    current: Option<CurrentConditions>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

fn parse_current_weather(location: &str, body: &[u8]) -> Result<f64, WeatherError> {
    let payload: CurrentWeatherResponse =
        serde_json::from_slice(body).map_err(|e| WeatherError::Malformed(e.to_string()))?;

    if let Some(error) = payload.error {
        if LOCATION_NOT_FOUND_CODES.contains(&error.code) {
            return Err(WeatherError::NotFound {
                location: location.to_string(),
                message: error.message,
            });
        }
        return Err(WeatherError::Rejected {
            code: error.code,
            message: error.message,
        });
    }

    payload
        .current
        .map(|current| current.temp_c)
        .ok_or_else(|| WeatherError::Malformed("missing current conditions".to_string()))
}
