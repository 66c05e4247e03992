//! Shared utilities for integration tests.
//!
//! Every server binds `127.0.0.1:0`, so test binaries can run in parallel.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;

use weather_relay::observability::tracing::otel_layer;
use weather_relay::{HttpServer, RelayConfig, Shutdown};

pub const WEATHER_API_KEY: &str = "test-key";

/// Install an OpenTelemetry-backed subscriber for the whole test binary, so
/// spans carry real ids across spawned server tasks.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry().with(otel_layer(&provider, "tests"));
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Start a raw TCP backend that answers every request with the same bytes.
pub async fn start_fixed_backend(status_line: &'static str, content_type: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                // Drain the request head before answering.
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A request seen by a [`RecordingBackend`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Backend that records every request and answers with a fixed reply.
#[derive(Clone)]
pub struct RecordingBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingBackend {
    pub async fn start(status: StatusCode, content_type: &'static str, body: &'static str) -> Self {
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let seen = requests.clone();

        let app = Router::new().fallback(move |method: Method, uri: Uri, headers: HeaderMap, _: Bytes| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(Recorded { method, uri, headers });
                (status, [("content-type", content_type)], body).into_response()
            }
        });

        let addr = serve(app).await;
        Self { addr, requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serve a plain router on an ephemeral port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A relay service running on an ephemeral port. Stops when dropped.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl RunningServer {
    pub async fn start(server: HttpServer) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        tokio::spawn(server.run(listener, shutdown.subscribe()));
        Self { addr, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn gateway_config(resolver: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.gateway.resolver_base_url = format!("http://{resolver}");
    config
}

pub fn resolver_config(location_api: SocketAddr, weather_api: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.resolver.location_api.base_url = format!("http://{location_api}/ws");
    config.resolver.weather_api.base_url = format!("http://{weather_api}/v1/current.json");
    config.resolver.weather_api.api_key = WEATHER_API_KEY.into();
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
