//! Request metrics and timing
//!
//! Feed and destination counters go through the `metrics` facade; without an
//! installed recorder they are no-ops. The Prometheus exporter is wired up in
//! the binary behind the `prometheus` feature.

use metrics::{counter, histogram};
use serde::Serialize;
use std::time::Instant;

pub const FEED_REQUESTS: &str = "agora_feed_requests_total";
pub const FEED_FAILURES: &str = "agora_feed_failures_total";
pub const FEED_DURATION: &str = "agora_feed_duration_seconds";
pub const FEED_ITEMS: &str = "agora_feed_items";
pub const FEED_SKIPPED_EDGES: &str = "agora_feed_skipped_edges_total";
pub const DESTINATION_LOOKUPS: &str = "agora_destination_lookups_total";
pub const STORE_TIMEOUTS: &str = "agora_store_timeouts_total";

/// Summary of one feed build, logged at the end of the request
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedMetrics {
    pub user_id: String,
    pub edges: usize,
    pub skipped_edges: usize,
    pub tier_one: usize,
    pub universe: usize,
    pub tier_two: usize,
    pub duration_ms: u64,
}

impl FeedMetrics {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    /// Items dropped from discovery because tier 1 already had them
    pub fn deduplicated(&self) -> usize {
        self.universe.saturating_sub(self.tier_two)
    }

    pub fn record(&self) {
        counter!(FEED_REQUESTS).increment(1);
        histogram!(FEED_DURATION).record(self.duration_ms as f64 / 1000.0);
        histogram!(FEED_ITEMS).record((self.tier_one + self.tier_two) as f64);
        if self.skipped_edges > 0 {
            counter!(FEED_SKIPPED_EDGES).increment(self.skipped_edges as u64);
        }
    }
}

pub fn record_feed_failure(code: &'static str) {
    counter!(FEED_FAILURES, "code" => code).increment(1);
}

pub fn record_destination_lookup(outcome: &'static str) {
    counter!(DESTINATION_LOOKUPS, "outcome" => outcome).increment(1);
}

pub fn record_store_timeout(op: &'static str) {
    counter!(STORE_TIMEOUTS, "op" => op).increment(1);
}

/// Logs how long a scope took when dropped
pub struct PerformanceTimer {
    start: Instant,
    label: &'static str,
}

impl PerformanceTimer {
    pub fn new(label: &'static str) -> Self {
        Self {
            start: Instant::now(),
            label,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn log_if_slow(&self, threshold_ms: u64) {
        let elapsed = self.elapsed_ms();
        if elapsed > threshold_ms {
            tracing::warn!(
                "Slow operation: {} took {}ms (threshold: {}ms)",
                self.label,
                elapsed,
                threshold_ms
            );
        }
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        tracing::debug!("{} completed in {}ms", self.label, self.elapsed_ms());
    }
}
