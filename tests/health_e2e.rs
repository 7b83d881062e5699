//! Health monitor integration: auto-disable feeding back into the fan-out,
//! and the system-wide health check verdict

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use rateshop::mocks::MockProvider;
use rateshop::{QuoteRequest, RateShop, SwapProvider, SystemStatus};

fn request() -> QuoteRequest {
	QuoteRequest::new("BTC", "BTC", "USDC", "POLYGON", dec!(100))
}

#[tokio::test]
async fn test_failing_provider_drops_out_of_rotation() {
	let failing = Arc::new(MockProvider::failing("flaky"));
	let healthy = Arc::new(MockProvider::quoting("steady", dec!(1)));

	let rateshop = RateShop::builder()
		.with_provider(Arc::clone(&failing) as Arc<dyn SwapProvider>)
		.with_provider(Arc::clone(&healthy) as Arc<dyn SwapProvider>)
		.build();

	// Ten straight failures reach the sample floor and trip auto-disable
	for _ in 0..10 {
		let _ = rateshop.best_quote(&request()).await.unwrap();
	}
	assert_eq!(failing.quote_calls(), 10);

	let record = rateshop.health().get("flaky").await.unwrap();
	assert!(!record.enabled);
	assert!(record.auto_disabled);
	assert!(record
		.disabled_reason
		.as_deref()
		.unwrap()
		.contains("consecutive failures"));

	// Subsequent fan-outs no longer touch the disabled provider
	let result = rateshop.best_quote(&request()).await.unwrap().unwrap();
	assert_eq!(failing.quote_calls(), 10);
	assert!(result.failed_providers.is_empty());
	assert_eq!(result.best_quote.provider, "steady");
}

#[tokio::test]
async fn test_health_check_all_good_is_healthy() {
	let rateshop = RateShop::builder()
		.with_provider(Arc::new(MockProvider::quoting("a", dec!(1))))
		.with_provider(Arc::new(MockProvider::quoting("b", dec!(2))))
		.build();

	let report = rateshop.run_health_check().await;

	assert_eq!(report.status, SystemStatus::Healthy);
	assert_eq!(report.total_providers, 2);
	assert_eq!(report.active_providers, 2);
	assert_eq!(report.auto_disabled_providers, 0);
	assert_eq!(report.average_score, 100.0);

	// Probes run through the normal recording path
	for snapshot in &report.providers {
		assert_eq!(snapshot.metrics.total_requests, 1);
		assert!(snapshot.last_health_check.is_some());
	}
}

#[tokio::test]
async fn test_health_check_with_auto_disabled_provider_is_degraded() {
	let rateshop = RateShop::builder()
		.with_provider(Arc::new(MockProvider::quoting("steady", dec!(1))))
		.with_provider(Arc::new(MockProvider::failing("flaky")))
		.build();

	for _ in 0..10 {
		rateshop.health().record_failure("flaky", "boom").await;
	}

	let flaky_before = rateshop.health().get("flaky").await.unwrap();
	assert!(flaky_before.auto_disabled);

	let report = rateshop.run_health_check().await;

	assert_eq!(report.status, SystemStatus::Degraded);
	assert_eq!(report.active_providers, 1);
	assert_eq!(report.auto_disabled_providers, 1);

	// Auto-disabled providers are not probed
	let flaky_after = rateshop.health().get("flaky").await.unwrap();
	assert_eq!(flaky_after.metrics.total_requests, 10);
}

#[tokio::test]
async fn test_health_check_skips_keyless_providers() {
	// Unreachable, but out of rotation for lack of credentials rather than
	// for health; sweeps must leave it alone
	let keyless = Arc::new(MockProvider::failing("keyless").without_credentials());
	let rateshop = RateShop::builder()
		.with_provider(Arc::new(MockProvider::quoting("steady", dec!(1))))
		.with_provider(Arc::clone(&keyless) as Arc<dyn SwapProvider>)
		.build();

	// Enough sweeps that a probed always-failing provider would trip
	for _ in 0..12 {
		let _ = rateshop.run_health_check().await;
	}
	let report = rateshop.run_health_check().await;

	assert_eq!(keyless.coin_calls(), 0);
	assert!(rateshop.health().get("keyless").await.is_none());
	assert_eq!(report.status, SystemStatus::Healthy);
	assert_eq!(report.total_providers, 2);
	assert_eq!(report.active_providers, 1);
	assert_eq!(report.auto_disabled_providers, 0);
}

#[tokio::test]
async fn test_health_check_no_active_providers_is_critical() {
	let rateshop = RateShop::builder()
		.with_provider(Arc::new(MockProvider::failing("only")))
		.build();

	for _ in 0..10 {
		rateshop.health().record_failure("only", "boom").await;
	}

	let report = rateshop.run_health_check().await;
	assert_eq!(report.status, SystemStatus::Critical);
	assert_eq!(report.active_providers, 0);
}

#[tokio::test]
async fn test_health_check_probe_timeout_recorded_as_failure() {
	let mut settings = rateshop::Settings::default();
	settings.health.probe_timeout_ms = 10;

	let slow = Arc::new(
		MockProvider::timing_out("molasses").with_delay(Duration::from_millis(100)),
	);
	let rateshop = RateShop::builder()
		.with_settings(settings)
		.with_provider(Arc::new(MockProvider::quoting("steady", dec!(1))))
		.with_provider(Arc::clone(&slow) as Arc<dyn SwapProvider>)
		.build();

	let report = rateshop.run_health_check().await;

	let record = rateshop.health().get("molasses").await.unwrap();
	assert_eq!(record.metrics.failed_requests, 1);
	assert!(record
		.metrics
		.last_error
		.as_deref()
		.unwrap()
		.contains("timed out"));

	// steady: 100, molasses: 30 after one failure; the average drags the
	// fleet under the degraded line
	assert_eq!(report.status, SystemStatus::Degraded);
}

#[tokio::test]
async fn test_fallback_coin_listing_counts_as_failure() {
	let rateshop = RateShop::builder()
		.with_provider(Arc::new(MockProvider::failing("down")))
		.with_provider(Arc::new(MockProvider::quoting("up", dec!(1))))
		.build();

	let _ = rateshop.all_supported_coins().await.unwrap();

	let down = rateshop.health().get("down").await.unwrap();
	assert_eq!(down.metrics.failed_requests, 1);
	assert!(down
		.metrics
		.last_error
		.as_deref()
		.unwrap()
		.contains("fell back"));

	let up = rateshop.health().get("up").await.unwrap();
	assert_eq!(up.metrics.successful_requests, 1);
}
