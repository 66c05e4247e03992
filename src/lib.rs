//! Weather relay library.
//!
//! Two services share this crate: the front [`gateway`] accepts a postal
//! code over `POST /weather` and forwards it to the [`resolver`], which
//! turns it into a city name and then into the current temperature.

// Services
pub mod gateway;
pub mod resolver;

// Shared plumbing
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Telemetry;
