//! `GET /weather?zip=<code>`: postal code → city → current temperature.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{field, Instrument};

use crate::config::ErrorMapping;
use crate::http::request_id;
use crate::observability::{metrics, Telemetry};
use crate::resolver::error::ResolveError;
use crate::resolver::location::LocationDirectory;
use crate::resolver::temperature::TemperatureReport;
use crate::resolver::weather::WeatherSource;
use crate::resolver::SERVICE_NAME;

/// Accepted length of the `zip` parameter, in bytes.
pub const ZIP_LEN: usize = 8;

/// State shared by resolver handlers.
#[derive(Clone)]
pub struct ResolverState {
    pub directory: Arc<dyn LocationDirectory>,
    pub weather: Arc<dyn WeatherSource>,
    pub telemetry: Telemetry,
    pub error_mapping: ErrorMapping,
}

#[derive(Debug, Deserialize)]
pub struct ZipQuery {
    #[serde(default)]
    pub zip: Option<String>,
}

pub fn router(state: ResolverState) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .with_state(state)
}

async fn get_weather(
    State(state): State<ResolverState>,
    headers: HeaderMap,
    query: Result<Query<ZipQuery>, QueryRejection>,
) -> Response {
    let zip = query.ok().and_then(|Query(q)| q.zip);

    let span = tracing::info_span!(
        "resolver.lookup",
        otel.kind = "server",
        trace_id = field::Empty,
        request_id = request_id(&headers).unwrap_or_default(),
        zip = zip.as_deref().unwrap_or_default(),
    );
    state.telemetry.continue_trace(&span, &headers);

    async move {
        let response = match resolve(&*state.directory, &*state.weather, zip.as_deref()).await {
            Ok(report) => {
                tracing::info!(temp_c = report.celsius, "Temperature resolved");
                (StatusCode::OK, Json(report)).into_response()
            }
            Err(e) => e.with_mapping(state.error_mapping).into_response(),
        };
        metrics::record_request(SERVICE_NAME, response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}

/// Validate `zip`, resolve it to a location, fetch the weather, convert.
pub async fn resolve(
    directory: &dyn LocationDirectory,
    weather: &dyn WeatherSource,
    zip: Option<&str>,
) -> Result<TemperatureReport, ResolveError> {
    let zip = zip
        .filter(|zip| zip.len() == ZIP_LEN)
        .ok_or(ResolveError::InvalidZip)?;

    let location = directory.locate(zip).await?;
    let celsius = weather.current_celsius(&location).await?;

    Ok(TemperatureReport::from_celsius(celsius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::location::LocationError;
    use crate::resolver::weather::WeatherError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use crate::observability::tracing::otel_layer;
    use opentelemetry::trace::{SpanContext, TraceContextExt};
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;
    use tracing_subscriber::layer::SubscriberExt;

    enum Directory {
        Found(&'static str),
        Missing,
        Broken,
    }

    struct FakeDirectory {
        mode: Directory,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationDirectory for FakeDirectory {
        async fn locate(&self, zip: &str) -> Result<String, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Directory::Found(name) => Ok(name.to_string()),
                Directory::Missing => Err(LocationError::NotFound(zip.to_string())),
                Directory::Broken => Err(LocationError::Malformed("eof".into())),
            }
        }
    }

    struct FakeWeather {
        celsius: Option<f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn current_celsius(&self, location: &str) -> Result<f64, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.celsius.ok_or_else(|| WeatherError::NotFound {
                location: location.to_string(),
                message: "No matching location found.".into(),
            })
        }
    }

    struct Fixture {
        directory: Arc<FakeDirectory>,
        weather: Arc<FakeWeather>,
    }

    impl Fixture {
        fn new(mode: Directory, celsius: Option<f64>) -> Self {
            Self {
                directory: Arc::new(FakeDirectory {
                    mode,
                    calls: AtomicUsize::new(0),
                }),
                weather: Arc::new(FakeWeather {
                    celsius,
                    calls: AtomicUsize::new(0),
                }),
            }
        }

        fn router(&self, error_mapping: ErrorMapping) -> Router {
            router(ResolverState {
                directory: self.directory.clone(),
                weather: self.weather.clone(),
                telemetry: Telemetry::w3c(),
                error_mapping,
            })
        }

        async fn get(&self, uri: &str, error_mapping: ErrorMapping) -> (StatusCode, String) {
            let response = self
                .router(error_mapping)
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
            (status, String::from_utf8(body.to_vec()).unwrap())
        }
    }

    #[tokio::test]
    async fn returns_converted_temperatures() {
        let fixture = Fixture::new(Directory::Found("Sao Paulo"), Some(100.0));

        let (status, body) = fixture.get("/weather?zip=01001000", ErrorMapping::Legacy).await;

        assert_eq!(status, StatusCode::OK);
        let report: TemperatureReport = serde_json::from_str(&body).unwrap();
        assert_eq!(report, TemperatureReport::from_celsius(100.0));
    }

    #[tokio::test]
    async fn wrong_length_zip_is_422_without_upstream_calls() {
        let fixture = Fixture::new(Directory::Found("Sao Paulo"), Some(20.0));

        for uri in [
            "/weather?zip=123",
            "/weather?zip=123456789",
            "/weather",
            "/weather?zip=",
            "/weather?zip=S%C3%A3o%20Paul",
        ] {
            let (status, body) = fixture.get(uri, ErrorMapping::Legacy).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert_eq!(body, "invalid zipcode");
        }
        assert_eq!(fixture.directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_zip_is_404_and_skips_weather() {
        let fixture = Fixture::new(Directory::Missing, Some(20.0));

        let (status, body) = fixture.get("/weather?zip=00000000", ErrorMapping::Legacy).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "can not find zipcode");
        assert_eq!(fixture.weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weather_failure_is_404() {
        let fixture = Fixture::new(Directory::Found("Atlantis"), None);

        let (status, body) = fixture.get("/weather?zip=01001000", ErrorMapping::Legacy).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "can not find weather information");
    }

    #[tokio::test]
    async fn broken_directory_depends_on_mapping() {
        let fixture = Fixture::new(Directory::Broken, Some(20.0));

        let (legacy, _) = fixture.get("/weather?zip=01001000", ErrorMapping::Legacy).await;
        let (strict, body) = fixture.get("/weather?zip=01001000", ErrorMapping::Strict).await;

        assert_eq!(legacy, StatusCode::NOT_FOUND);
        assert_eq!(strict, StatusCode::BAD_GATEWAY);
        assert_eq!(body, "location service unavailable");
    }

    #[tokio::test]
    async fn only_get_is_routed() {
        let fixture = Fixture::new(Directory::Found("Sao Paulo"), Some(20.0));
        let response = fixture
            .router(ErrorMapping::Legacy)
            .oneshot(
                Request::post("/weather?zip=01001000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    /// Directory that remembers the span context it was called under.
    #[derive(Default)]
    struct SpanRecordingDirectory {
        seen: Mutex<Option<SpanContext>>,
    }

    #[async_trait]
    impl LocationDirectory for SpanRecordingDirectory {
        async fn locate(&self, _zip: &str) -> Result<String, LocationError> {
            let cx = tracing::Span::current().context();
            *self.seen.lock().unwrap() = Some(cx.span().span_context().clone());
            Ok("Sao Paulo".to_string())
        }
    }

    #[tokio::test]
    async fn lookup_runs_inside_inbound_trace() {
        let provider = SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry().with(otel_layer(&provider, "test"));
        let _guard = tracing::subscriber::set_default(subscriber);

        let directory = Arc::new(SpanRecordingDirectory::default());
        let app = router(ResolverState {
            directory: directory.clone(),
            weather: Arc::new(FakeWeather {
                celsius: Some(20.0),
                calls: AtomicUsize::new(0),
            }),
            telemetry: Telemetry::w3c(),
            error_mapping: ErrorMapping::Legacy,
        });

        let response = app
            .oneshot(
                Request::get("/weather?zip=01001000")
                    .header("traceparent", "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = directory.seen.lock().unwrap().clone().expect("directory was called");
        assert!(seen.is_valid());
        assert!(!seen.is_remote());
        assert_eq!(seen.trace_id().to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_ne!(seen.span_id().to_string(), "00f067aa0ba902b7");
    }

    #[tokio::test]
    async fn lookup_without_traceparent_starts_new_trace() {
        let provider = SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry().with(otel_layer(&provider, "test"));
        let _guard = tracing::subscriber::set_default(subscriber);

        let directory = Arc::new(SpanRecordingDirectory::default());
        let app = router(ResolverState {
            directory: directory.clone(),
            weather: Arc::new(FakeWeather {
                celsius: Some(20.0),
                calls: AtomicUsize::new(0),
            }),
            telemetry: Telemetry::w3c(),
            error_mapping: ErrorMapping::Legacy,
        });

        app.oneshot(Request::get("/weather?zip=01001000").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let seen = directory.seen.lock().unwrap().clone().expect("directory was called");
        assert!(seen.is_valid());
        assert_ne!(seen.trace_id().to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
    }
}
