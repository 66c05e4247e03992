//! Gateway error taxonomy and its HTTP mapping.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures reaching or reading from the resolver.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build resolver request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("resolver request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read resolver response: {0}")]
    Body(#[from] axum::Error),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid request method")]
    MethodNotAllowed,

    #[error("{0}")]
    MalformedBody(serde_json::Error),

    #[error("invalid zipcode")]
    InvalidZip,

    #[error(transparent)]
    Upstream(#[from] ForwardError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::InvalidZip => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render an error with its whole source chain, `outer: inner: root`.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::Upstream(e) => {
                let text = error_chain(e);
                tracing::error!(error = %text, "Resolver unreachable");
                text
            }
            other => {
                tracing::warn!(status = status.as_u16(), error = %other, "Rejected lookup request");
                other.to_string()
            }
        };
        (status, body).into_response()
    }
}
