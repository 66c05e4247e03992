//! Postal-code directory lookup.
//!
//! Resolves a postal code to a city name through a ViaCEP-compatible API:
//! `GET {base_url}/{zip}/json/` answering `{"localidade": "..."}` on success
//! and `{"erro": true}` (older deployments: `"true"`) for unknown codes.
//!
//! The postal code is appended as one percent-encoded path segment, so it
//! cannot alter the rest of the request URL.

use std::time::Instant;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("postal code {0} not found")]
    NotFound(String),

    #[error("location directory request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("location directory returned an unreadable payload: {0}")]
    Malformed(String),

    #[error("invalid location directory URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Source of postal-code → location-name mappings.
#[async_trait]
pub trait LocationDirectory: Send + Sync {
    async fn locate(&self, zip: &str) -> Result<String, LocationError>;
}

/// Directory backed by the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpLocationDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLocationDirectory {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn lookup_url(&self, zip: &str) -> Result<Url, LocationError> {
        let invalid = |reason: String| LocationError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .push(zip)
            .push("json")
            .push("");
        Ok(url)
    }
}

#[async_trait]
impl LocationDirectory for HttpLocationDirectory {
    #[instrument(name = "location.lookup", skip(self), fields(otel.kind = "client"))]
    async fn locate(&self, zip: &str) -> Result<String, LocationError> {
        let url = self.lookup_url(zip)?;
        let started = Instant::now();

        let body = match fetch(&self.client, url).await {
            Ok(body) => body,
            Err(e) => {
                metrics::record_upstream("location", "transport_error", started);
                return Err(LocationError::Transport(e));
            }
        };

        let result = parse_directory_entry(zip, &body);
        let outcome = match &result {
            Ok(_) => "ok",
            Err(LocationError::NotFound(_)) => "not_found",
            Err(_) => "malformed",
        };
        metrics::record_upstream("location", outcome, started);
        result
    }
}

async fn fetch(client: &reqwest::Client, url: Url) -> Result<Bytes, reqwest::Error> {
    client.get(url).send().await?.bytes().await
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    #[serde(rename = "localidade", default)]
    location: Option<String>,

    #[serde(rename = "erro", default)]
    error: Option<ErrorFlag>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorFlag {
    Bool(bool),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl ErrorFlag {
    fn is_set(&self) -> bool {
        match self {
            ErrorFlag::Bool(flag) => *flag,
            ErrorFlag::Text(text) => text.eq_ignore_ascii_case("true"),
            ErrorFlag::Other(_) => false,
        }
    }
}

/// Interpret a directory payload.
///
/// An empty name is "not found" whether or not the error flag is present;
/// the weather lookup never runs without a name.
fn parse_directory_entry(zip: &str, body: &[u8]) -> Result<String, LocationError> {
    let entry: DirectoryEntry =
        serde_json::from_slice(body).map_err(|e| LocationError::Malformed(e.to_string()))?;

    match entry.location {
        Some(name) if !name.is_empty() => {
            tracing::debug!(zip, location = %name, "Postal code resolved");
            Ok(name)
        }
        _ => {
            if entry.error.as_ref().is_some_and(ErrorFlag::is_set) {
                tracing::debug!(zip, "Directory reports postal code as unknown");
            } else {
                tracing::warn!(zip, "Directory returned no location name and no error flag");
            }
            Err(LocationError::NotFound(zip.to_string()))
        }
    }
}
