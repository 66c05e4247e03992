//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap a service's Axum router with the shared middleware stack
//!   (request id, tracing, body limit, optional timeout)
//! - Expose the `/health` probe
//! - Serve on a listener until shutdown is signalled

use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::shutdown;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// HTTP server for one of the relay services.
pub struct HttpServer {
    name: &'static str,
    router: Router,
}

impl HttpServer {
    /// Create a server named `name` around an already-stated router.
    pub fn new(name: &'static str, router: Router, config: &RelayConfig) -> Self {
        let router = Self::build_router(name, router, config);
        Self { name, router }
    }

    /// Apply middleware layers. The last layer added runs first.
    #[allow(deprecated)]
    fn build_router(name: &'static str, router: Router, config: &RelayConfig) -> Router {
        let mut router = router
            .route(
                "/health",
                get(move || async move {
                    Json(HealthStatus {
                        status: "ok",
                        service: name,
                        version: env!("CARGO_PKG_VERSION"),
                    })
                }),
            )
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes));

        if let Some(secs) = config.timeouts.request_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }

        router
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(service = self.name, address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::recv(shutdown))
            .await?;

        tracing::info!(service = self.name, "HTTP server stopped");
        Ok(())
    }
}
