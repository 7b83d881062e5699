//! Per-provider health records
//!
//! These are pure data: the disable/re-enable state machine that mutates
//! them lives in the service crate's health monitor. All state is in-memory
//! and process-lifetime scoped; a restart resets every provider to the
//! optimistic default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum stored length for a recorded error message
const MAX_ERROR_LEN: usize = 200;

/// Weight of success rate vs latency in the composite health score
const SUCCESS_RATE_WEIGHT: f64 = 0.7;
const LATENCY_WEIGHT: f64 = 0.3;

/// Milliseconds of average latency per point of latency score; ~30s average
/// drives the latency component to zero.
const LATENCY_MS_PER_POINT: f64 = 300.0;

/// Rolling request statistics for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetrics {
	pub total_requests: u64,
	pub successful_requests: u64,
	pub failed_requests: u64,
	pub consecutive_failures: u32,
	/// Rolling average latency over all recorded calls, in milliseconds
	pub avg_latency_ms: f64,
	/// Truncated message of the most recent failure
	pub last_error: Option<String>,
	pub last_error_at: Option<DateTime<Utc>>,
}

impl ProviderMetrics {
	pub fn new() -> Self {
		Self {
			total_requests: 0,
			successful_requests: 0,
			failed_requests: 0,
			consecutive_failures: 0,
			avg_latency_ms: 0.0,
			last_error: None,
			last_error_at: None,
		}
	}

	/// Record a successful call and fold its latency into the rolling average
	pub fn record_success(&mut self, latency_ms: u64) {
		self.total_requests += 1;
		self.successful_requests += 1;
		self.consecutive_failures = 0;

		let prev_total = self.avg_latency_ms * (self.total_requests - 1) as f64;
		self.avg_latency_ms = (prev_total + latency_ms as f64) / self.total_requests as f64;
	}

	/// Record a failed call
	pub fn record_failure(&mut self, error: &str) {
		self.total_requests += 1;
		self.failed_requests += 1;
		self.consecutive_failures += 1;

		let mut message = error.to_string();
		if message.len() > MAX_ERROR_LEN {
			// Vendor messages can be non-ASCII; back off to a char boundary
			// so the cut never lands inside a multi-byte character
			let mut cut = MAX_ERROR_LEN;
			while !message.is_char_boundary(cut) {
				cut -= 1;
			}
			message.truncate(cut);
		}
		self.last_error = Some(message);
		self.last_error_at = Some(Utc::now());
	}

	/// Lifetime success rate, 0.0 to 1.0; 1.0 when no requests recorded
	pub fn success_rate(&self) -> f64 {
		if self.total_requests == 0 {
			1.0
		} else {
			self.successful_requests as f64 / self.total_requests as f64
		}
	}

	/// Composite 0-100 health score.
	///
	/// Unused providers score 100. Otherwise success rate contributes 70%
	/// and a latency score 30%, so correctness outweighs speed roughly
	/// 2.3 to 1.
	pub fn health_score(&self) -> u8 {
		if self.total_requests == 0 {
			return 100;
		}

		let success_component = self.success_rate() * 100.0 * SUCCESS_RATE_WEIGHT;
		let latency_score = (100.0 - self.avg_latency_ms / LATENCY_MS_PER_POINT).max(0.0);
		let score = success_component + latency_score * LATENCY_WEIGHT;

		score.round().clamp(0.0, 100.0) as u8
	}
}

impl Default for ProviderMetrics {
	fn default() -> Self {
		Self::new()
	}
}

/// Full health record for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
	pub provider: String,

	/// Whether the provider is currently in rotation
	pub enabled: bool,

	/// Set when the health monitor tripped the provider out of rotation
	pub auto_disabled: bool,
	pub disabled_reason: Option<String>,
	pub disabled_at: Option<DateTime<Utc>>,

	pub metrics: ProviderMetrics,
	pub health_score: u8,

	pub last_health_check: Option<DateTime<Utc>>,
}

impl ProviderHealth {
	/// Fresh optimistic record for a provider seen for the first time
	pub fn new(provider: impl Into<String>) -> Self {
		Self {
			provider: provider.into(),
			enabled: true,
			auto_disabled: false,
			disabled_reason: None,
			disabled_at: None,
			metrics: ProviderMetrics::new(),
			health_score: 100,
			last_health_check: None,
		}
	}

	/// Recompute the derived score from the current metrics
	pub fn refresh_score(&mut self) {
		self.health_score = self.metrics.health_score();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_fresh_metrics_score_100() {
		let metrics = ProviderMetrics::new();
		assert_eq!(metrics.health_score(), 100);
		assert_eq!(metrics.success_rate(), 1.0);
	}

	#[test]
	fn test_score_70_percent_success_low_latency() {
		let mut metrics = ProviderMetrics::new();
		for _ in 0..7 {
			metrics.record_success(1);
		}
		for _ in 0..3 {
			metrics.record_failure("boom");
		}

		// 70 * 0.7 + ~100 * 0.3 = ~79
		assert_eq!(metrics.health_score(), 79);
	}

	#[test]
	fn test_latency_component_floors_at_zero() {
		let mut metrics = ProviderMetrics::new();
		// 60s average latency: latency score bottoms out at 0
		metrics.record_success(60_000);
		assert_eq!(metrics.health_score(), 70);
	}

	#[test]
	fn test_rolling_average_latency() {
		let mut metrics = ProviderMetrics::new();
		metrics.record_success(100);
		metrics.record_success(200);
		assert_eq!(metrics.avg_latency_ms, 150.0);

		// Failures count toward the denominator with zero added latency
		metrics.record_failure("x");
		assert!((metrics.avg_latency_ms - 150.0).abs() < f64::EPSILON);
		assert_eq!(metrics.total_requests, 3);
	}

	#[test]
	fn test_consecutive_failures_reset_on_success() {
		let mut metrics = ProviderMetrics::new();
		metrics.record_failure("a");
		metrics.record_failure("b");
		assert_eq!(metrics.consecutive_failures, 2);

		metrics.record_success(10);
		assert_eq!(metrics.consecutive_failures, 0);
		assert_eq!(metrics.last_error.as_deref(), Some("b"));
	}

	#[test]
	fn test_error_message_truncated() {
		let mut metrics = ProviderMetrics::new();
		metrics.record_failure(&"x".repeat(500));
		assert_eq!(metrics.last_error.as_ref().unwrap().len(), 200);
	}

	#[test]
	fn test_truncation_respects_char_boundaries() {
		let mut metrics = ProviderMetrics::new();
		// 67 three-byte characters: 201 bytes, and byte 200 splits the last one
		metrics.record_failure(&"€".repeat(67));

		let stored = metrics.last_error.as_ref().unwrap();
		assert_eq!(stored.chars().count(), 66);
		assert!(stored.len() <= 200);
	}
}
