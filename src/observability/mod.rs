//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (spans carrying W3C trace context)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//!     → OTLP collector (optional)
//! ```

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::tracing::{Telemetry, TelemetryError};
