//! Rate shopper
//!
//! Fans a fixed-receive quote request out to every provider in rotation,
//! isolates per-provider faults, and picks the quote with the smallest
//! deposit amount. Swap creation and status polling dispatch directly to one
//! named provider; every call's outcome feeds the health monitor.

use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use rateshop_providers::ProviderRegistry;
use rateshop_types::{
	CreateSwapRequest, ProviderFailure, QuoteRequest, RateShopResult, SupportedCoin, SwapDetails,
	SwapProvider, SwapQuote, SwapStatus,
};

use crate::errors::{ServiceError, ServiceResult};
use crate::health_monitor::HealthMonitor;

/// Fans quote requests out across providers and picks the cheapest deposit
#[derive(Debug)]
pub struct RateShopper {
	registry: Arc<ProviderRegistry>,
	health: Arc<HealthMonitor>,
	probe_amount: Decimal,
}

impl RateShopper {
	pub fn new(registry: Arc<ProviderRegistry>, health: Arc<HealthMonitor>) -> Self {
		Self {
			registry,
			health,
			probe_amount: Decimal::ONE_HUNDRED,
		}
	}

	/// Nominal withdraw amount used by pair-support probes
	pub fn with_probe_amount(mut self, probe_amount: Decimal) -> Self {
		self.probe_amount = probe_amount;
		self
	}

	pub fn registry(&self) -> &Arc<ProviderRegistry> {
		&self.registry
	}

	pub fn health(&self) -> &Arc<HealthMonitor> {
		&self.health
	}

	/// Providers in rotation: credentials configured and not health-disabled
	async fn active_providers(&self) -> Vec<Arc<dyn SwapProvider>> {
		let mut active = Vec::new();
		for provider in self.registry.enabled() {
			if self.health.is_enabled(provider.id()).await {
				active.push(provider);
			}
		}
		active
	}

	/// Quote all active providers concurrently and select the quote with the
	/// minimum deposit amount.
	///
	/// Individual provider faults never abort the fan-out; they land in
	/// `failed_providers`. `Ok(None)` means every provider either failed or
	/// declined the pair. On an exact deposit-amount tie the provider that
	/// settled first in registry order wins.
	pub async fn best_quote(
		&self,
		request: &QuoteRequest,
	) -> ServiceResult<Option<RateShopResult>> {
		let providers = self.active_providers().await;
		if providers.is_empty() {
			return Err(ServiceError::NoProvidersAvailable);
		}

		debug!(
			"Rate shopping {} {} -> {} {} across {} provider(s)",
			request.withdraw_amount,
			request.to_currency,
			request.from_currency,
			request.from_network,
			providers.len()
		);

		let mut tasks = Vec::with_capacity(providers.len());
		for provider in providers {
			let request = request.clone();
			let health = Arc::clone(&self.health);
			tasks.push(tokio::spawn(async move {
				let provider_id = provider.id().to_string();
				let started = Instant::now();
				let outcome = provider.quote(&request).await;
				let latency_ms = started.elapsed().as_millis() as u64;

				match outcome {
					Ok(quote) => {
						health.record_success(&provider_id, latency_ms).await;
						Ok((provider_id, quote))
					},
					Err(e) => {
						health.record_failure(&provider_id, &e.to_string()).await;
						Err((provider_id, e))
					},
				}
			}));
		}

		let mut quotes: Vec<SwapQuote> = Vec::new();
		let mut failed_providers: Vec<ProviderFailure> = Vec::new();
		for joined in join_all(tasks).await {
			match joined {
				Ok(Ok((_, Some(quote)))) => quotes.push(quote),
				Ok(Ok((provider_id, None))) => {
					debug!("Provider '{}' has no quote for this pair", provider_id);
					failed_providers.push(ProviderFailure {
						provider: provider_id,
						error: "no quote available for the requested pair".to_string(),
					});
				},
				Ok(Err((provider_id, e))) => {
					warn!("Provider '{}' quote failed: {}", provider_id, e);
					failed_providers.push(ProviderFailure {
						provider: provider_id,
						error: e.to_string(),
					});
				},
				Err(e) => {
					warn!("Quote task panicked: {}", e);
				},
			}
		}

		// First minimum wins: strict comparison keeps the earlier-settled
		// quote on an exact tie
		let mut best: Option<&SwapQuote> = None;
		for quote in &quotes {
			if best.map_or(true, |b| quote.deposit_amount < b.deposit_amount) {
				best = Some(quote);
			}
		}

		let Some(best) = best.cloned() else {
			info!(
				"No usable quotes: {} provider(s) failed or declined",
				failed_providers.len()
			);
			return Ok(None);
		};

		info!(
			"Best quote from '{}': deposit {} {} ({} candidate(s), {} failure(s))",
			best.provider,
			best.deposit_amount,
			best.deposit_currency,
			quotes.len(),
			failed_providers.len()
		);

		Ok(Some(RateShopResult {
			best_quote: best,
			all_quotes: quotes,
			failed_providers,
		}))
	}

	/// Create a swap with one named provider. Transactional, so any provider
	/// fault propagates to the caller unchanged.
	pub async fn create_swap(
		&self,
		provider_id: &str,
		request: &CreateSwapRequest,
	) -> ServiceResult<SwapDetails> {
		let provider = self
			.registry
			.get(provider_id)
			.ok_or_else(|| ServiceError::provider_not_found(provider_id))?;

		let started = Instant::now();
		match provider.create_swap(request).await {
			Ok(details) => {
				self.health
					.record_success(provider_id, started.elapsed().as_millis() as u64)
					.await;
				info!(
					"Created swap '{}' with provider '{}'",
					details.swap_id, provider_id
				);
				Ok(details)
			},
			Err(e) => {
				self.health.record_failure(provider_id, &e.to_string()).await;
				Err(e.into())
			},
		}
	}

	/// Poll a swap's status with the provider that created it
	pub async fn swap_status(
		&self,
		provider_id: &str,
		swap_id: &str,
	) -> ServiceResult<SwapStatus> {
		let provider = self
			.registry
			.get(provider_id)
			.ok_or_else(|| ServiceError::provider_not_found(provider_id))?;

		let started = Instant::now();
		match provider.swap_status(swap_id).await {
			Ok(status) => {
				self.health
					.record_success(provider_id, started.elapsed().as_millis() as u64)
					.await;
				Ok(status)
			},
			Err(e) => {
				self.health.record_failure(provider_id, &e.to_string()).await;
				Err(e.into())
			},
		}
	}

	/// Whether any active provider can trade the pair, checked by probing
	/// with a nominal quote.
	///
	/// Advisory only, so probe outcomes are not recorded with the health
	/// monitor; a declined or failed probe just means "not this provider".
	pub async fn is_pair_supported(
		&self,
		from_currency: &str,
		from_network: &str,
		to_currency: &str,
		to_network: &str,
	) -> ServiceResult<bool> {
		let providers = self.active_providers().await;
		if providers.is_empty() {
			return Err(ServiceError::NoProvidersAvailable);
		}

		let probe = QuoteRequest::new(
			from_currency,
			from_network,
			to_currency,
			to_network,
			self.probe_amount,
		);

		let probes = providers.iter().map(|provider| {
			let probe = probe.clone();
			async move { matches!(provider.quote(&probe).await, Ok(Some(_))) }
		});

		Ok(join_all(probes).await.into_iter().any(|supported| supported))
	}

	/// Union of every active provider's coin list, merged by coin code.
	///
	/// Fallback listings still contribute coins but are recorded as failures
	/// with the health monitor, since they mean the provider was unreachable.
	/// Output is sorted by code; each coin's networks keep first-seen order.
	pub async fn all_supported_coins(&self) -> ServiceResult<Vec<SupportedCoin>> {
		let providers = self.active_providers().await;
		if providers.is_empty() {
			return Err(ServiceError::NoProvidersAvailable);
		}

		let mut tasks = Vec::with_capacity(providers.len());
		for provider in providers {
			let health = Arc::clone(&self.health);
			tasks.push(tokio::spawn(async move {
				let provider_id = provider.id().to_string();
				let started = Instant::now();
				let listing = provider.supported_coins().await;
				let latency_ms = started.elapsed().as_millis() as u64;

				if listing.is_fallback() {
					health
						.record_failure(
							&provider_id,
							"coin listing fell back to hardcoded list",
						)
						.await;
				} else {
					health.record_success(&provider_id, latency_ms).await;
				}
				listing
			}));
		}

		let mut merged: BTreeMap<String, SupportedCoin> = BTreeMap::new();
		for joined in join_all(tasks).await {
			let listing = match joined {
				Ok(listing) => listing,
				Err(e) => {
					warn!("Coin listing task panicked: {}", e);
					continue;
				},
			};
			for coin in listing.into_coins() {
				match merged.get_mut(&coin.code) {
					Some(existing) => existing.merge(&coin),
					None => {
						merged.insert(coin.code.clone(), coin);
					},
				}
			}
		}

		Ok(merged.into_values().collect())
	}
}
