//! Rateshop
//!
//! Rate-shopping core for crypto checkout: quote a fixed-receive swap across
//! multiple exchange providers concurrently, pick the cheapest deposit, and
//! keep unhealthy providers out of rotation automatically.
//!
//! ```no_run
//! use rateshop::{QuoteRequest, RateShop};
//! use rust_decimal_macros::dec;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rateshop = RateShop::from_env()?;
//!
//! let request = QuoteRequest::new("BTC", "BTC", "USDC", "POLYGON", dec!(100));
//! if let Some(result) = rateshop.best_quote(&request).await? {
//! 	println!(
//! 		"best: deposit {} BTC via {}",
//! 		result.best_quote.deposit_amount, result.best_quote.provider
//! 	);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mocks;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

pub use rateshop_config::{
	load_config, ConfigError, HealthSettings, LogFormat, LoggingSettings, ProviderSettings,
	Settings,
};
pub use rateshop_providers::{
	ChangeNowProvider, ProviderRegistry, SimpleSwapProvider, StealthExProvider,
};
pub use rateshop_service::{
	HealthMonitor, RateShopper, ServiceError, ServiceResult, SystemHealthReport, SystemStatus,
};
pub use rateshop_types::{
	CoinListing, CreateSwapRequest, NormalizedStatus, ProviderError, ProviderFailure,
	ProviderHealth, ProviderInfo, ProviderMetrics, ProviderResult, ProviderRuntimeConfig,
	QuoteRequest, RateShopResult, SupportedCoin, SwapDetails, SwapProvider, SwapQuote, SwapStatus,
};

/// Builder wiring registry, health monitor and rate shopper together
pub struct RateShopBuilder {
	settings: Settings,
	custom_providers: Vec<Arc<dyn SwapProvider>>,
}

impl RateShopBuilder {
	pub fn new() -> Self {
		Self {
			settings: Settings::default(),
			custom_providers: Vec::new(),
		}
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}

	/// Add a custom provider adapter. Supplying any custom provider replaces
	/// the default adapter set entirely, which is what tests want.
	pub fn with_provider(mut self, provider: Arc<dyn SwapProvider>) -> Self {
		self.custom_providers.push(provider);
		self
	}

	pub fn build(self) -> RateShop {
		let registry = if self.custom_providers.is_empty() {
			ProviderRegistry::with_defaults(&self.settings)
		} else {
			let mut registry = ProviderRegistry::new();
			for provider in self.custom_providers {
				registry.register(provider);
			}
			registry
		};

		let registry = Arc::new(registry);
		let health = Arc::new(HealthMonitor::new(self.settings.health.clone()));
		let shopper = RateShopper::new(Arc::clone(&registry), Arc::clone(&health))
			.with_probe_amount(self.settings.quote_probe_amount);

		RateShop {
			registry,
			health,
			shopper,
		}
	}
}

impl Default for RateShopBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// The assembled rate-shopping core
pub struct RateShop {
	registry: Arc<ProviderRegistry>,
	health: Arc<HealthMonitor>,
	shopper: RateShopper,
}

impl RateShop {
	pub fn builder() -> RateShopBuilder {
		RateShopBuilder::new()
	}

	/// Build from config file and environment: loads `.env` if present, then
	/// `config/config.*`, then environment overrides
	pub fn from_env() -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();
		let settings = load_config()?;
		Ok(Self::builder().with_settings(settings).build())
	}

	pub fn registry(&self) -> &Arc<ProviderRegistry> {
		&self.registry
	}

	pub fn health(&self) -> &Arc<HealthMonitor> {
		&self.health
	}

	pub fn shopper(&self) -> &RateShopper {
		&self.shopper
	}

	pub async fn best_quote(
		&self,
		request: &QuoteRequest,
	) -> ServiceResult<Option<RateShopResult>> {
		self.shopper.best_quote(request).await
	}

	pub async fn create_swap(
		&self,
		provider_id: &str,
		request: &CreateSwapRequest,
	) -> ServiceResult<SwapDetails> {
		self.shopper.create_swap(provider_id, request).await
	}

	pub async fn swap_status(
		&self,
		provider_id: &str,
		swap_id: &str,
	) -> ServiceResult<SwapStatus> {
		self.shopper.swap_status(provider_id, swap_id).await
	}

	pub async fn is_pair_supported(
		&self,
		from_currency: &str,
		from_network: &str,
		to_currency: &str,
		to_network: &str,
	) -> ServiceResult<bool> {
		self.shopper
			.is_pair_supported(from_currency, from_network, to_currency, to_network)
			.await
	}

	pub async fn all_supported_coins(&self) -> ServiceResult<Vec<SupportedCoin>> {
		self.shopper.all_supported_coins().await
	}

	pub async fn run_health_check(&self) -> SystemHealthReport {
		self.health.run_health_check(&self.registry).await
	}
}

/// Initialize tracing from logging settings. Safe to call more than once;
/// later calls are no-ops.
pub fn init_tracing(settings: &LoggingSettings) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&settings.level))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	let builder = tracing_subscriber::fmt().with_env_filter(filter);
	let result = match settings.format {
		LogFormat::Json => builder.json().try_init(),
		LogFormat::Pretty => builder.pretty().try_init(),
		LogFormat::Compact => builder.compact().try_init(),
	};
	if result.is_err() {
		tracing::debug!("Tracing subscriber already initialized");
	}
}
