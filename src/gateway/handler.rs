//! `POST /weather`: validate the postal code and relay the resolver's answer.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tracing::{field, Instrument};

use crate::gateway::error::GatewayError;
use crate::gateway::forward::{ResolverClient, UpstreamReply};
use crate::gateway::request::LookupRequest;
use crate::gateway::SERVICE_NAME;
use crate::http::{request_id, X_REQUEST_ID};
use crate::observability::{metrics, Telemetry};

#[derive(Clone, Debug)]
pub struct GatewayState {
    pub resolver: ResolverClient,
    pub telemetry: Telemetry,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/weather", post(lookup_weather).fallback(method_not_allowed))
        .with_state(state)
}

async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

async fn lookup_weather(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    let span = tracing::info_span!(
        "gateway.lookup",
        otel.kind = "server",
        trace_id = field::Empty,
        request_id = request_id(&headers).unwrap_or_default(),
        zip = field::Empty,
    );
    let parent = state.telemetry.continue_trace(&span, &headers);

    async move {
        let response = match relay(&state, &headers, &parent, &body).await {
            Ok(reply) => reply_response(reply),
            Err(e) => e.into_response(),
        };
        metrics::record_request(SERVICE_NAME, response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}

async fn relay(
    state: &GatewayState,
    inbound: &HeaderMap,
    parent: &opentelemetry::Context,
    body: &[u8],
) -> Result<UpstreamReply, GatewayError> {
    let request = LookupRequest::from_body(body)?;
    tracing::Span::current().record("zip", request.postal_code.as_str());

    let span = tracing::info_span!("gateway.forward", otel.kind = "client");
    let mut outbound = HeaderMap::new();
    state.telemetry.inject_span(&span, parent, &mut outbound);
    if let Some(id) = inbound.get(&X_REQUEST_ID) {
        outbound.insert(X_REQUEST_ID, id.clone());
    }

    let reply = state
        .resolver
        .forward(&request.postal_code, outbound)
        .instrument(span)
        .await?;

    tracing::info!(status = %reply.status, "Relaying resolver response");
    Ok(reply)
}

fn reply_response(reply: UpstreamReply) -> Response {
    let mut response = Response::new(Body::from(reply.body));
    *response.status_mut() = reply.status;
    let content_type = reply
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static("text/plain; charset=utf-8"));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}
