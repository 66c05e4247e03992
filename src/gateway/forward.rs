//! Resolver hop.
//!
//! One GET per lookup over a pooled hyper client. No retries: the first
//! failure is returned to the caller.

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, Request, StatusCode},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::RelayConfig;
use crate::gateway::error::ForwardError;
use crate::gateway::request::PostalCode;
use crate::observability::metrics;

/// Resolver response, relayed verbatim.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// HTTP client for the resolver service.
#[derive(Clone)]
pub struct ResolverClient {
    client: Client<HttpConnector, Body>,
    base_url: String,
    max_body_bytes: usize,
}

impl ResolverClient {
    pub fn new(config: &RelayConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(config.upstream.connect_timeout_secs.map(Duration::from_secs));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            base_url: config.gateway.resolver_base_url.trim_end_matches('/').to_string(),
            max_body_bytes: config.limits.max_body_bytes,
        }
    }

    pub fn lookup_uri(&self, zip: &PostalCode) -> String {
        format!("{}/weather?zip={}", self.base_url, zip)
    }

    /// Ask the resolver about `zip`, sending `headers` (trace context,
    /// request id) along.
    pub async fn forward(&self, zip: &PostalCode, headers: HeaderMap) -> Result<UpstreamReply, ForwardError> {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(self.lookup_uri(zip))
            .body(Body::empty())?;
        request.headers_mut().extend(headers);

        let started = Instant::now();
        let response = match self.client.request(request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream("resolver", "transport_error", started);
                return Err(e.into());
            }
        };

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes).await?;
        metrics::record_upstream("resolver", "ok", started);

        tracing::debug!(status = %parts.status, bytes = body.len(), "Resolver replied");

        Ok(UpstreamReply {
            status: parts.status,
            content_type: parts.headers.get(CONTENT_TYPE).cloned(),
            body,
        })
    }
}

impl std::fmt::Debug for ResolverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverClient")
            .field("base_url", &self.base_url)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}
