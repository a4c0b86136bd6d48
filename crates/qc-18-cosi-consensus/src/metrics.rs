//! # Collective Signing Metrics
//!
//! Prometheus metrics for monitoring signing instances.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-cosi-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `cosi_rounds_completed_total` - Rounds completed at the root (by round)
//! - `cosi_exceptions_total` - Exceptions contributed by this process's nodes (by round)
//! - `cosi_threshold_aborts_total` - Commit-round refusals due to too many prepare exceptions
//! - `cosi_block_verification_seconds` - Histogram of block verification times
//! - `cosi_block_verifications_total` - Block verifications (by outcome)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Rounds completed at the root, labeled by round
    pub static ref ROUNDS_COMPLETED: IntCounterVec = register_int_counter_vec!(
        "cosi_rounds_completed_total",
        "Total number of signing rounds completed at the root",
        &["round"]
    )
    .expect("Failed to create ROUNDS_COMPLETED metric");

    /// Exceptions contributed, labeled by round
    pub static ref EXCEPTIONS: IntCounterVec = register_int_counter_vec!(
        "cosi_exceptions_total",
        "Total number of exceptions contributed instead of response shares",
        &["round"]
    )
    .expect("Failed to create EXCEPTIONS metric");

    /// Commit-round refusals caused by the fault threshold
    pub static ref THRESHOLD_ABORTS: IntCounter = register_int_counter!(
        "cosi_threshold_aborts_total",
        "Total number of commit refusals due to too many prepare exceptions"
    )
    .expect("Failed to create THRESHOLD_ABORTS metric");

    /// Histogram of block verification latency
    pub static ref VERIFICATION_LATENCY: Histogram = register_histogram!(
        "cosi_block_verification_seconds",
        "Time taken to verify a proposed block in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to create VERIFICATION_LATENCY metric");

    /// Block verifications, labeled by outcome
    pub static ref VERIFICATIONS: IntCounterVec = register_int_counter_vec!(
        "cosi_block_verifications_total",
        "Total number of block verifications",
        &["outcome"]
    )
    .expect("Failed to create VERIFICATIONS metric");
}

/// Record a round completed at the root
#[cfg(feature = "metrics")]
pub fn record_round_completed(round: &str) {
    ROUNDS_COMPLETED.with_label_values(&[round]).inc();
}

/// Record an exception contributed in a round
#[cfg(feature = "metrics")]
pub fn record_exception(round: &str) {
    EXCEPTIONS.with_label_values(&[round]).inc();
}

/// Record a threshold-triggered commit refusal
#[cfg(feature = "metrics")]
pub fn record_threshold_abort() {
    THRESHOLD_ABORTS.inc();
}

/// Record a finished block verification
#[cfg(feature = "metrics")]
pub fn record_block_verification(seconds: f64, verified: bool) {
    VERIFICATION_LATENCY.observe(seconds);
    let outcome = if verified { "valid" } else { "invalid" };
    VERIFICATIONS.with_label_values(&[outcome]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_round_completed(_round: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_exception(_round: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_threshold_abort() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_verification(_seconds: f64, _verified: bool) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_round_completed("prepare");
        record_exception("commit");
        record_threshold_abort();
        record_block_verification(0.01, true);
    }
}
