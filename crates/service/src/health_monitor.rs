//! Provider health monitor
//!
//! Tracks per-provider request outcomes and drives the automatic
//! disable/re-enable state machine that keeps consistently failing providers
//! out of the rate-shop rotation. All state is in-memory and resets to the
//! optimistic default on restart; that is a documented limitation, not an
//! oversight.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use rateshop_config::HealthSettings;
use rateshop_providers::ProviderRegistry;
use rateshop_types::{CoinListing, ProviderHealth};

/// Aggregate verdict over the whole provider fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
	Healthy,
	Degraded,
	Critical,
}

/// Outcome of one [`HealthMonitor::run_health_check`] sweep
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthReport {
	pub status: SystemStatus,
	pub providers: Vec<ProviderHealth>,
	pub average_score: f64,
	pub total_providers: usize,
	pub active_providers: usize,
	pub auto_disabled_providers: usize,
	pub checked_at: DateTime<Utc>,
}

/// Per-provider health tracking with automatic disable and re-enable.
///
/// Records are created lazily on first mention of a provider id, so the
/// monitor needs no registration step and unknown providers are treated
/// optimistically.
pub struct HealthMonitor {
	settings: HealthSettings,
	records: RwLock<HashMap<String, ProviderHealth>>,
}

impl HealthMonitor {
	pub fn new(settings: HealthSettings) -> Self {
		Self {
			settings,
			records: RwLock::new(HashMap::new()),
		}
	}

	/// Record a successful provider call and its latency.
	///
	/// An auto-disabled provider that has rebuilt a success rate at or above
	/// the re-enable threshold is put back into rotation here.
	pub async fn record_success(&self, provider_id: &str, latency_ms: u64) {
		let mut records = self.records.write().await;
		let record = records
			.entry(provider_id.to_string())
			.or_insert_with(|| ProviderHealth::new(provider_id));

		record.metrics.record_success(latency_ms);
		record.refresh_score();

		if record.auto_disabled
			&& record.metrics.total_requests >= self.settings.reenable_min_requests
			&& record.metrics.success_rate() >= self.settings.reenable_success_rate
		{
			record.enabled = true;
			record.auto_disabled = false;
			record.disabled_reason = None;
			record.disabled_at = None;
			info!(
				"Provider '{}' auto-re-enabled (success rate {:.0}%, {} requests)",
				provider_id,
				record.metrics.success_rate() * 100.0,
				record.metrics.total_requests
			);
		}
	}

	/// Record a failed provider call.
	///
	/// Auto-disable is evaluated only once the sample is large enough to be
	/// meaningful; a brand-new provider is never tripped by its first few
	/// errors.
	pub async fn record_failure(&self, provider_id: &str, error: &str) {
		let mut records = self.records.write().await;
		let record = records
			.entry(provider_id.to_string())
			.or_insert_with(|| ProviderHealth::new(provider_id));

		record.metrics.record_failure(error);
		record.refresh_score();

		if !record.enabled || record.metrics.total_requests < self.settings.min_sample_size {
			return;
		}

		let reason = if record.metrics.consecutive_failures
			>= self.settings.max_consecutive_failures
		{
			Some(format!(
				"{} consecutive failures",
				record.metrics.consecutive_failures
			))
		} else if record.metrics.success_rate() < self.settings.disable_success_rate {
			Some(format!(
				"success rate {:.0}% below {:.0}%",
				record.metrics.success_rate() * 100.0,
				self.settings.disable_success_rate * 100.0
			))
		} else {
			None
		};

		if let Some(reason) = reason {
			warn!("Auto-disabling provider '{}': {}", provider_id, reason);
			record.enabled = false;
			record.auto_disabled = true;
			record.disabled_reason = Some(reason);
			record.disabled_at = Some(Utc::now());
		}
	}

	/// Manually take a provider out of rotation. Clears any auto-disable
	/// state; a manually disabled provider is never auto-re-enabled.
	pub async fn disable(&self, provider_id: &str, reason: impl Into<String>) {
		let mut records = self.records.write().await;
		let record = records
			.entry(provider_id.to_string())
			.or_insert_with(|| ProviderHealth::new(provider_id));

		let reason = reason.into();
		info!("Provider '{}' manually disabled: {}", provider_id, reason);
		record.enabled = false;
		record.auto_disabled = false;
		record.disabled_reason = Some(reason);
		record.disabled_at = Some(Utc::now());
	}

	/// Manually put a provider back into rotation, clearing disable state.
	/// The failure streak is reset so a stale streak cannot instantly re-trip
	/// auto-disable, while lifetime counters are preserved.
	pub async fn enable(&self, provider_id: &str) {
		let mut records = self.records.write().await;
		let record = records
			.entry(provider_id.to_string())
			.or_insert_with(|| ProviderHealth::new(provider_id));

		info!("Provider '{}' manually enabled", provider_id);
		record.enabled = true;
		record.auto_disabled = false;
		record.disabled_reason = None;
		record.disabled_at = None;
		record.metrics.consecutive_failures = 0;
	}

	/// Whether a provider is in rotation. Unknown providers are optimistically
	/// enabled.
	pub async fn is_enabled(&self, provider_id: &str) -> bool {
		self.records
			.read()
			.await
			.get(provider_id)
			.map_or(true, |record| record.enabled)
	}

	pub async fn get(&self, provider_id: &str) -> Option<ProviderHealth> {
		self.records.read().await.get(provider_id).cloned()
	}

	pub async fn all(&self) -> Vec<ProviderHealth> {
		self.records.read().await.values().cloned().collect()
	}

	/// Sweep every registered provider with a lightweight liveness probe and
	/// compute the fleet-wide verdict.
	///
	/// Providers without credentials are not probed: configuration excludes
	/// them from rotation, so their probes would only poison scores that
	/// rotation never consults. Auto-disabled providers are not probed
	/// either; their road back into rotation is direct-dispatch traffic
	/// rebuilding their success rate. A probe fetches the coin list under
	/// the short probe timeout; a listing that fell back to the hardcoded
	/// list counts as a failure, since it means the provider could not
	/// actually be reached.
	pub async fn run_health_check(&self, registry: &ProviderRegistry) -> SystemHealthReport {
		let providers = registry.all();
		debug!("Running health check over {} provider(s)", providers.len());

		for provider in &providers {
			if !provider.enabled() {
				continue;
			}
			let provider_id = provider.id().to_string();
			if let Some(record) = self.get(&provider_id).await {
				if record.auto_disabled {
					continue;
				}
			}

			let probe_timeout = Duration::from_millis(self.settings.probe_timeout_ms);
			let started = Instant::now();
			let outcome =
				tokio::time::timeout(probe_timeout, provider.supported_coins()).await;
			let latency_ms = started.elapsed().as_millis() as u64;

			match outcome {
				Ok(CoinListing::Fetched(_)) => {
					self.record_success(&provider_id, latency_ms).await;
				},
				Ok(CoinListing::Fallback(_)) => {
					self.record_failure(
						&provider_id,
						"health probe: coin listing fell back to hardcoded list",
					)
					.await;
				},
				Err(_) => {
					self.record_failure(
						&provider_id,
						&format!(
							"health probe timed out after {}ms",
							self.settings.probe_timeout_ms
						),
					)
					.await;
				},
			}

			let mut records = self.records.write().await;
			if let Some(record) = records.get_mut(&provider_id) {
				record.last_health_check = Some(Utc::now());
			}
		}

		self.report(&providers).await
	}

	async fn report(
		&self,
		providers: &[std::sync::Arc<dyn rateshop_types::SwapProvider>],
	) -> SystemHealthReport {
		let records = self.records.read().await;

		let mut snapshots = Vec::with_capacity(providers.len());
		for provider in providers {
			let snapshot = records
				.get(provider.id())
				.cloned()
				.unwrap_or_else(|| ProviderHealth::new(provider.id()));
			snapshots.push(snapshot);
		}

		let total = snapshots.len();
		let auto_disabled = snapshots.iter().filter(|h| h.auto_disabled).count();
		// In rotation: credentials configured and not health-disabled
		let active = providers
			.iter()
			.zip(&snapshots)
			.filter(|(p, h)| p.enabled() && h.enabled && !h.auto_disabled)
			.count();
		let average_score = if total == 0 {
			100.0
		} else {
			snapshots.iter().map(|h| h.health_score as f64).sum::<f64>() / total as f64
		};

		let status = if active == 0 || average_score < 50.0 || auto_disabled * 2 > total {
			SystemStatus::Critical
		} else if average_score < 70.0 || auto_disabled > 0 {
			SystemStatus::Degraded
		} else {
			SystemStatus::Healthy
		};

		if status != SystemStatus::Healthy {
			warn!(
				"System health {:?}: {}/{} provider(s) active, {} auto-disabled, average score {:.0}",
				status, active, total, auto_disabled, average_score
			);
		}

		SystemHealthReport {
			status,
			providers: snapshots,
			average_score,
			total_providers: total,
			active_providers: active,
			auto_disabled_providers: auto_disabled,
			checked_at: Utc::now(),
		}
	}
}

impl std::fmt::Debug for HealthMonitor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HealthMonitor")
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn monitor() -> HealthMonitor {
		HealthMonitor::new(HealthSettings::default())
	}

	#[tokio::test]
	async fn test_unknown_provider_is_enabled() {
		let monitor = monitor();
		assert!(monitor.is_enabled("never-seen").await);
		assert!(monitor.get("never-seen").await.is_none());
	}

	#[tokio::test]
	async fn test_records_created_lazily_and_optimistic() {
		let monitor = monitor();
		monitor.record_success("changenow", 120).await;

		let record = monitor.get("changenow").await.unwrap();
		assert!(record.enabled);
		assert!(!record.auto_disabled);
		assert_eq!(record.metrics.total_requests, 1);
		assert_eq!(record.health_score, 100);
	}

	#[tokio::test]
	async fn test_auto_disable_on_consecutive_failures() {
		let monitor = monitor();

		// Enough successes that the rate condition cannot trip first
		for _ in 0..14 {
			monitor.record_success("flaky", 50).await;
		}
		for _ in 0..4 {
			monitor.record_failure("flaky", "connect refused").await;
		}
		// 4 consecutive failures: still enabled
		assert!(monitor.is_enabled("flaky").await);

		monitor.record_failure("flaky", "connect refused").await;
		// The 5th trips the breaker
		assert!(!monitor.is_enabled("flaky").await);

		let record = monitor.get("flaky").await.unwrap();
		assert!(record.auto_disabled);
		assert_eq!(
			record.disabled_reason.as_deref(),
			Some("5 consecutive failures")
		);
		assert!(record.disabled_at.is_some());
	}

	#[tokio::test]
	async fn test_auto_disable_on_low_success_rate() {
		let monitor = monitor();

		// Alternate so the consecutive streak never reaches 5, but the rate
		// sinks below 70% once the sample is big enough
		for _ in 0..4 {
			monitor.record_success("lossy", 50).await;
			monitor.record_failure("lossy", "boom").await;
		}
		monitor.record_failure("lossy", "boom").await;
		assert!(monitor.is_enabled("lossy").await);

		monitor.record_failure("lossy", "boom").await;
		// 4 successes / 10 total = 40% < 70%
		assert!(!monitor.is_enabled("lossy").await);

		let record = monitor.get("lossy").await.unwrap();
		assert!(record
			.disabled_reason
			.as_deref()
			.unwrap()
			.contains("success rate"));
	}

	#[tokio::test]
	async fn test_small_sample_never_disables() {
		let monitor = monitor();
		for _ in 0..9 {
			monitor.record_failure("newcomer", "boom").await;
		}
		// 9 straight failures, but under the 10-request sample floor
		assert!(monitor.is_enabled("newcomer").await);

		monitor.record_failure("newcomer", "boom").await;
		assert!(!monitor.is_enabled("newcomer").await);
	}

	#[tokio::test]
	async fn test_auto_reenable_hysteresis() {
		let monitor = monitor();
		for _ in 0..10 {
			monitor.record_failure("recovering", "boom").await;
		}
		assert!(!monitor.is_enabled("recovering").await);

		// 89 successes: 89/99 = 89.9%, still below the 90% bar
		for _ in 0..89 {
			monitor.record_success("recovering", 50).await;
		}
		assert!(!monitor.is_enabled("recovering").await);

		// 90/100 = 90% exactly: back in rotation
		monitor.record_success("recovering", 50).await;
		assert!(monitor.is_enabled("recovering").await);

		let record = monitor.get("recovering").await.unwrap();
		assert!(!record.auto_disabled);
		assert!(record.disabled_reason.is_none());
		// Lifetime counters survive the round trip
		assert_eq!(record.metrics.total_requests, 100);
	}

	#[tokio::test]
	async fn test_manual_disable_not_auto_reenabled() {
		let monitor = monitor();
		monitor.disable("parked", "maintenance window").await;
		assert!(!monitor.is_enabled("parked").await);

		for _ in 0..20 {
			monitor.record_success("parked", 10).await;
		}
		// A perfect success rate does not override an operator decision
		assert!(!monitor.is_enabled("parked").await);

		let record = monitor.get("parked").await.unwrap();
		assert!(!record.auto_disabled);
		assert_eq!(record.disabled_reason.as_deref(), Some("maintenance window"));
	}

	#[tokio::test]
	async fn test_manual_enable_clears_streak() {
		let monitor = monitor();
		// Healthy rate overall, disabled by a failure streak
		for _ in 0..30 {
			monitor.record_success("flaky", 50).await;
		}
		for _ in 0..5 {
			monitor.record_failure("flaky", "boom").await;
		}
		assert!(!monitor.is_enabled("flaky").await);

		monitor.enable("flaky").await;
		assert!(monitor.is_enabled("flaky").await);

		let record = monitor.get("flaky").await.unwrap();
		assert_eq!(record.metrics.consecutive_failures, 0);
		assert_eq!(record.metrics.total_requests, 35);

		// One fresh failure must not instantly re-trip on the stale streak
		monitor.record_failure("flaky", "boom").await;
		assert!(monitor.is_enabled("flaky").await);
	}
}
