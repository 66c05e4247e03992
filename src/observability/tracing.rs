//! Distributed tracing support.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests
//! - Propagate trace context to upstream requests
//! - Build the OpenTelemetry tracer provider and its `tracing` layer
//!
//! # Design Decisions
//! - W3C Trace Context headers (`traceparent`, `tracestate`)
//! - The propagator lives in a [`Telemetry`] handle that is handed to each
//!   service at construction, so handlers never reach for global state
//! - A tracer provider always exists; with export disabled it still mints
//!   span ids, so context keeps flowing across hops

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{TraceContextExt, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider, Tracer};
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::{OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::Registry;

use crate::config::{ExporterKind, TracingConfig};

/// W3C Trace Context header name.
pub const TRACEPARENT: &str = "traceparent";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),
}

/// Adapter for extracting trace context from HTTP headers.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Adapter for injecting trace context into HTTP headers.
struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Process telemetry handle injected into request handlers.
#[derive(Clone)]
pub struct Telemetry {
    propagator: Arc<dyn TextMapPropagator + Send + Sync>,
}

impl Telemetry {
    pub fn new<P>(propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        Self {
            propagator: Arc::new(propagator),
        }
    }

    /// Handle using the W3C Trace Context propagator.
    pub fn w3c() -> Self {
        Self::new(TraceContextPropagator::new())
    }

    /// Read the remote parent context from inbound headers.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.propagator.extract(&HeaderExtractor(headers))
    }

    /// Write `cx` into outbound headers.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.propagator.inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Parent `span` on the context carried by `headers`.
    ///
    /// Records `trace_id` on the span when it declares that field. Returns
    /// the extracted context for use as an injection fallback.
    pub fn continue_trace(&self, span: &Span, headers: &HeaderMap) -> Context {
        let parent = self.extract(headers);
        let remote = parent.span().span_context().clone();
        if remote.is_valid() {
            let _ = span.set_parent(parent.clone());
            span.record("trace_id", tracing::field::display(remote.trace_id()));
        }
        parent
    }

    /// Inject the context of `span` into outbound headers.
    ///
    /// When `span` carries no OpenTelemetry context (filtered out, or no
    /// OpenTelemetry layer installed) `fallback` is propagated instead, so the
    /// trace is not cut at this hop.
    pub fn inject_span(&self, span: &Span, fallback: &Context, headers: &mut HeaderMap) {
        let cx = span.context();
        if cx.span().span_context().is_valid() {
            self.inject(&cx, headers);
        } else {
            self.inject(fallback, headers);
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::w3c()
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry").finish_non_exhaustive()
    }
}

/// Build the tracer provider for `service_name`.
///
/// With export enabled spans are batched to the configured OTLP collector;
/// otherwise the provider only assigns ids. Nothing is registered globally:
/// spans reach the provider through [`otel_layer`], and propagation goes
/// through [`Telemetry`].
pub fn init_tracer_provider(
    cfg: &TracingConfig,
    service_name: &'static str,
) -> Result<SdkTracerProvider, TelemetryError> {
    let resource = Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", service_name),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();
    let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(cfg.sampler_ratio)));

    let mut builder = SdkTracerProvider::builder()
        .with_sampler(sampler)
        .with_resource(resource);

    if cfg.enabled {
        builder = builder.with_batch_exporter(build_exporter(cfg)?);
    }

    Ok(builder.build())
}

fn build_exporter(cfg: &TracingConfig) -> Result<opentelemetry_otlp::SpanExporter, TelemetryError> {
    let timeout = cfg.timeout_ms.map(Duration::from_millis);

    let exporter = match cfg.exporter {
        ExporterKind::OtlpHttp => {
            let mut b = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(cfg.endpoint.clone());
            if let Some(t) = timeout {
                b = b.with_timeout(t);
            }
            b.build()
        }
        ExporterKind::OtlpGrpc => {
            let mut b = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(cfg.endpoint.clone());
            if let Some(t) = timeout {
                b = b.with_timeout(t);
            }
            b.build()
        }
    };

    exporter.map_err(|e| TelemetryError::Exporter(e.to_string()))
}

/// `tracing` layer that turns spans into OpenTelemetry spans.
pub fn otel_layer(
    provider: &SdkTracerProvider,
    service_name: &'static str,
) -> OpenTelemetryLayer<Registry, Tracer> {
    OpenTelemetryLayer::new(provider.tracer(service_name))
}

/// Flush and stop span export.
pub fn shutdown_tracer_provider(provider: SdkTracerProvider) {
    if let Err(e) = provider.shutdown() {
        tracing::warn!(error = %e, "Tracer provider shutdown failed");
    }
}
