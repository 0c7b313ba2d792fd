//! Prometheus metrics and structured logging for meters.
//!
//! - Prometheus counters for transitions, broadcasts and discovery candidates
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use metrics::Metrics;
