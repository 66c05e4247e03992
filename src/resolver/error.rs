//! Resolver error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ErrorMapping;
use crate::resolver::location::LocationError;
use crate::resolver::weather::WeatherError;

pub const INVALID_ZIPCODE: &str = "invalid zipcode";
pub const ZIPCODE_NOT_FOUND: &str = "can not find zipcode";
pub const WEATHER_NOT_FOUND: &str = "can not find weather information";
pub const LOCATION_UNAVAILABLE: &str = "location service unavailable";
pub const WEATHER_UNAVAILABLE: &str = "weather service unavailable";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid zipcode")]
    InvalidZip,

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Weather(#[from] WeatherError),
}

impl ResolveError {
    /// Whether the failure is an upstream fault rather than a missing record.
    pub fn is_upstream_fault(&self) -> bool {
        matches!(
            self,
            ResolveError::Location(
                LocationError::Transport(_)
                    | LocationError::Malformed(_)
                    | LocationError::InvalidUrl { .. }
            )
                | ResolveError::Weather(
                    WeatherError::Transport(_)
                        | WeatherError::Malformed(_)
                        | WeatherError::Rejected { .. }
                )
        )
    }

    /// Status code and client-facing message under `mapping`.
    pub fn status_and_message(&self, mapping: ErrorMapping) -> (StatusCode, &'static str) {
        let strict_fault = mapping == ErrorMapping::Strict && self.is_upstream_fault();
        match self {
            ResolveError::InvalidZip => (StatusCode::UNPROCESSABLE_ENTITY, INVALID_ZIPCODE),
            ResolveError::Location(_) if strict_fault => (StatusCode::BAD_GATEWAY, LOCATION_UNAVAILABLE),
            ResolveError::Location(_) => (StatusCode::NOT_FOUND, ZIPCODE_NOT_FOUND),
            ResolveError::Weather(_) if strict_fault => (StatusCode::BAD_GATEWAY, WEATHER_UNAVAILABLE),
            ResolveError::Weather(_) => (StatusCode::NOT_FOUND, WEATHER_NOT_FOUND),
        }
    }

    pub fn with_mapping(self, mapping: ErrorMapping) -> MappedError {
        MappedError {
            error: self,
            mapping,
        }
    }
}

/// A [`ResolveError`] paired with the policy used to render it.
#[derive(Debug)]
pub struct MappedError {
    pub error: ResolveError,
    pub mapping: ErrorMapping,
}

impl IntoResponse for MappedError {
    fn into_response(self) -> Response {
        let (status, message) = self.error.status_and_message(self.mapping);
        if status == StatusCode::UNPROCESSABLE_ENTITY || !self.error.is_upstream_fault() {
            tracing::warn!(status = status.as_u16(), error = %self.error, "Lookup failed");
        } else {
            tracing::error!(status = status.as_u16(), error = %self.error, "Upstream failure");
        }
        (status, message).into_response()
    }
}
