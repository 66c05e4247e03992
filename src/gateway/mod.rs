//! Front gateway.
//!
//! # Data Flow
//! ```text
//! POST /weather {"postalCode": ".."}
//!     → request.rs (decode body, validate 8 digits: 400 / 422)
//!     → handler.rs (open server span, derive client span)
//!     → forward.rs (GET resolver /weather?zip=.., traceparent injected)
//!     → resolver status and body relayed unchanged
//!
//! Resolver unreachable → 500 with the error text (error.rs).
//! ```

pub mod error;
pub mod forward;
pub mod handler;
pub mod request;

use crate::config::RelayConfig;
use crate::http::HttpServer;
use crate::observability::Telemetry;

pub use error::{ForwardError, GatewayError};
pub use forward::{ResolverClient, UpstreamReply};
pub use handler::GatewayState;
pub use request::{InvalidPostalCode, LookupRequest, PostalCode};

pub const SERVICE_NAME: &str = "gateway";

/// Create the gateway HTTP server.
pub fn build_server(config: &RelayConfig, telemetry: Telemetry) -> HttpServer {
    let state = GatewayState {
        resolver: ResolverClient::new(config),
        telemetry,
    };
    HttpServer::new(SERVICE_NAME, handler::router(state), config)
}
