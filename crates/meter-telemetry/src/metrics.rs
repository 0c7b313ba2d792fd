//! Prometheus metrics for meters.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_int_gauge, CounterVec, Encoder, IntGauge, TextEncoder};

use crate::error::{TelemetryError, TelemetryResult};

/// Transitions attempted.
/// Labels: direction (increment/decrement), outcome (ok/build_failed/wallet_failed/broadcast_failed)
pub static TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "meter_transitions_total",
        "Total meter transitions by direction and outcome",
        &["direction", "outcome"]
    )
    .unwrap()
});

/// Broadcast results.
/// Labels: status (success/error)
pub static BROADCAST_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "meter_broadcast_total",
        "Total broadcasts by overlay status",
        &["status"]
    )
    .unwrap()
});

/// Discovery candidates.
/// Labels: outcome (accepted/skipped)
pub static DISCOVERY_CANDIDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "meter_discovery_candidates_total",
        "Total discovery candidates by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Meters currently held by the repository.
pub static REPOSITORY_METERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("meter_repository_meters", "Meters held in the repository").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a transition attempt.
    pub fn transition(direction: &str, outcome: &str) {
        TRANSITIONS_TOTAL
            .with_label_values(&[direction, outcome])
            .inc();
    }

    /// Record a broadcast answer.
    pub fn broadcast(success: bool) {
        let status = if success { "success" } else { "error" };
        BROADCAST_TOTAL.with_label_values(&[status]).inc();
    }

    /// Record the outcome of one discovery pass.
    pub fn discovery(accepted: usize, skipped: usize) {
        DISCOVERY_CANDIDATES_TOTAL
            .with_label_values(&["accepted"])
            .inc_by(accepted as f64);
        DISCOVERY_CANDIDATES_TOTAL
            .with_label_values(&["skipped"])
            .inc_by(skipped as f64);
    }

    pub fn repository_size(count: usize) {
        REPOSITORY_METERS.set(count as i64);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
