//! StealthEX adapter
//!
//! StealthEX keeps currency and network as separate fields and natively
//! supports reverse (fixed-receive) estimation, so no direction inversion is
//! needed. Public endpoints work without credentials; an API key only lifts
//! rate limits, so the adapter stays enabled when no key is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rateshop_types::{
	CoinListing, CreateSwapRequest, NormalizedStatus, ProviderError, ProviderInfo,
	ProviderResult, ProviderRuntimeConfig, QuoteRequest, SupportedCoin, SwapDetails, SwapProvider,
	SwapQuote, SwapStatus,
};

use crate::http::{build_client, json_body, send_bounded};

pub const PROVIDER_ID: &str = "stealthex";

const API_BASE: &str = "https://api.stealthex.io/api/v2";

/// Canonical network code <-> StealthEX network name
const NETWORKS: &[(&str, &str)] = &[
	("BTC", "btc"),
	("ERC20", "eth"),
	("TRC20", "trx"),
	("BSC", "bsc"),
	("POLYGON", "polygon"),
	("SOL", "sol"),
	("LTC", "ltc"),
	("XRP", "xrp"),
	("DOGE", "doge"),
	("AVAX", "avax"),
	("ARBITRUM", "arbitrum"),
	("OPTIMISM", "optimism"),
	("BASE", "base"),
];

// ================================
// STEALTHEX API MODELS
// ================================

#[derive(Debug, Clone, Deserialize)]
struct EstimateResponse {
	estimated_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
struct RangeResponse {
	min_amount: Option<Decimal>,
	max_amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct CreateExchangeBody<'a> {
	currency_from: &'a str,
	network_from: &'a str,
	currency_to: &'a str,
	network_to: &'a str,
	/// Fixed receive amount; `reverse` makes the vendor solve for the deposit
	amount_to: Decimal,
	fixed: bool,
	reverse: bool,
	address_to: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	extra_id_to: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExchangeResponse {
	id: String,
	status: String,
	address_from: String,
	extra_id_from: Option<String>,
	amount_from: Decimal,
	amount_to: Decimal,
	address_to: String,
	#[serde(default)]
	expires_at: Option<DateTime<Utc>>,
	#[serde(default)]
	tx_from: Option<String>,
	#[serde(default)]
	tx_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CurrencyEntry {
	symbol: String,
	network: String,
	name: String,
	image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
	#[serde(default)]
	message: String,
}

/// StealthEX provider adapter
#[derive(Debug)]
pub struct StealthExProvider {
	info: ProviderInfo,
	config: ProviderRuntimeConfig,
	client: Client,
	base_url: String,
}

impl StealthExProvider {
	pub fn new(config: ProviderRuntimeConfig) -> Self {
		Self::with_base_url(config, API_BASE)
	}

	pub fn with_base_url(config: ProviderRuntimeConfig, base_url: impl Into<String>) -> Self {
		let client = build_client(HeaderMap::new(), config.timeout_ms);
		Self {
			info: ProviderInfo::new(PROVIDER_ID, "StealthEX", "StealthEX", "2"),
			config,
			client,
			base_url: base_url.into(),
		}
	}

	fn vendor_network(canonical: &str) -> Option<&'static str> {
		let canonical = canonical.to_uppercase();
		NETWORKS
			.iter()
			.find(|(c, _)| *c == canonical)
			.map(|(_, v)| *v)
	}

	fn canonical_network(vendor: &str) -> Option<&'static str> {
		NETWORKS.iter().find(|(_, v)| *v == vendor).map(|(c, _)| *c)
	}

	fn normalize_status(raw: &str) -> NormalizedStatus {
		match raw {
			"waiting" => NormalizedStatus::AwaitingDeposit,
			"confirming" => NormalizedStatus::Confirming,
			"exchanging" | "verifying" => NormalizedStatus::Exchanging,
			"sending" => NormalizedStatus::Sending,
			"finished" => NormalizedStatus::Completed,
			"failed" => NormalizedStatus::Failed,
			"expired" => NormalizedStatus::Expired,
			"refunded" => NormalizedStatus::Refunded,
			_ => NormalizedStatus::Pending,
		}
	}

	/// Query params shared by every call; the key is optional
	fn base_params(&self) -> Vec<(&'static str, String)> {
		match &self.config.api_key {
			Some(key) => vec![("api_key", key.clone())],
			None => Vec::new(),
		}
	}

	async fn reverse_estimate(
		&self,
		from: (&str, &str),
		to: (&str, &str),
		withdraw_amount: Decimal,
	) -> ProviderResult<Option<Decimal>> {
		let url = format!("{}/estimate", self.base_url);
		let mut params = self.base_params();
		params.push(("currency_from", from.0.to_string()));
		params.push(("network_from", from.1.to_string()));
		params.push(("currency_to", to.0.to_string()));
		params.push(("network_to", to.1.to_string()));
		params.push(("amount", withdraw_amount.to_string()));
		params.push(("fixed", "true".to_string()));
		params.push(("reverse", "true".to_string()));

		let request = self.client.get(&url).query(&params);
		let response = send_bounded(request, self.config.timeout_ms).await?;
		let status = response.status().as_u16();

		match status {
			200 => {
				let body: EstimateResponse = json_body(response).await?;
				if body.estimated_amount <= Decimal::ZERO {
					return Ok(None);
				}
				Ok(Some(body.estimated_amount))
			},
			// Unknown pairs and out-of-range amounts are expected absences
			400 | 404 | 422 => {
				let body = response
					.json::<ApiError>()
					.await
					.unwrap_or(ApiError {
						message: String::new(),
					});
				debug!("StealthEX estimate rejected ({}): {}", status, body.message);
				Ok(None)
			},
			401 | 403 => Err(ProviderError::Api {
				code: status.to_string(),
				message: "API key rejected".to_string(),
			}),
			_ => Err(ProviderError::http_failure(status, "estimate request failed")),
		}
	}

	/// Deposit bounds for a pair. Best effort: a failed lookup degrades the
	/// quote to unbounded rather than failing it.
	async fn deposit_range(&self, from: (&str, &str), to: (&str, &str)) -> RangeResponse {
		let url = format!("{}/range", self.base_url);
		let mut params = self.base_params();
		params.push(("currency_from", from.0.to_string()));
		params.push(("network_from", from.1.to_string()));
		params.push(("currency_to", to.0.to_string()));
		params.push(("network_to", to.1.to_string()));
		params.push(("fixed", "true".to_string()));

		let request = self.client.get(&url).query(&params);
		let fallback = RangeResponse {
			min_amount: None,
			max_amount: None,
		};

		match send_bounded(request, self.config.timeout_ms).await {
			Ok(response) if response.status().is_success() => {
				json_body(response).await.unwrap_or(fallback)
			},
			Ok(response) => {
				debug!(
					"StealthEX range lookup returned {}, quoting unbounded",
					response.status()
				);
				fallback
			},
			Err(e) => {
				debug!("StealthEX range lookup failed: {}, quoting unbounded", e);
				fallback
			},
		}
	}

	async fn fetch_coins(&self) -> ProviderResult<Vec<SupportedCoin>> {
		let url = format!("{}/currency", self.base_url);
		let request = self.client.get(&url).query(&self.base_params());

		let response = send_bounded(request, self.config.timeout_ms).await?;
		if !response.status().is_success() {
			return Err(ProviderError::http_failure(
				response.status().as_u16(),
				"currency listing failed",
			));
		}

		let entries: Vec<CurrencyEntry> = json_body(response).await?;
		let mut coins: Vec<SupportedCoin> = Vec::new();
		for entry in entries {
			// Entries on networks outside the canonical vocabulary are
			// unreachable through this gateway and are skipped
			let Some(network) = Self::canonical_network(&entry.network) else {
				continue;
			};
			let code = entry.symbol.to_uppercase();
			match coins.iter_mut().find(|c| c.code == code) {
				Some(coin) => {
					if !coin.networks.iter().any(|n| n == network) {
						coin.networks.push(network.to_string());
					}
				},
				None => {
					let mut coin = SupportedCoin::new(code, entry.name, vec![network.to_string()]);
					if let Some(image) = entry.image {
						coin = coin.with_icon(image);
					}
					coins.push(coin);
				},
			}
		}
		Ok(coins)
	}

	fn fallback_coins() -> Vec<SupportedCoin> {
		vec![
			SupportedCoin::new("BTC", "Bitcoin", vec!["BTC".to_string()]),
			SupportedCoin::new("ETH", "Ethereum", vec!["ERC20".to_string()]),
			SupportedCoin::new(
				"USDT",
				"Tether",
				vec!["ERC20".to_string(), "TRC20".to_string()],
			),
			SupportedCoin::new(
				"USDC",
				"USD Coin",
				vec!["ERC20".to_string(), "SOL".to_string()],
			),
			SupportedCoin::new("XMR", "Monero", vec!["XMR".to_string()]),
		]
	}
}

#[async_trait]
impl SwapProvider for StealthExProvider {
	fn info(&self) -> &ProviderInfo {
		&self.info
	}

	/// The public API needs no key, so this adapter is always in rotation
	fn enabled(&self) -> bool {
		true
	}

	async fn supported_coins(&self) -> CoinListing {
		match self.fetch_coins().await {
			Ok(coins) if !coins.is_empty() => CoinListing::Fetched(coins),
			Ok(_) => {
				warn!("StealthEX returned an empty currency list, using fallback");
				CoinListing::Fallback(Self::fallback_coins())
			},
			Err(e) => {
				warn!("StealthEX currency listing failed: {}, using fallback", e);
				CoinListing::Fallback(Self::fallback_coins())
			},
		}
	}

	async fn quote(&self, request: &QuoteRequest) -> ProviderResult<Option<SwapQuote>> {
		let (Some(from_network), Some(to_network)) = (
			Self::vendor_network(&request.from_network),
			Self::vendor_network(&request.to_network),
		) else {
			return Ok(None);
		};

		let from = (request.from_currency.to_lowercase(), from_network);
		let to = (request.to_currency.to_lowercase(), to_network);

		let Some(deposit_amount) = self
			.reverse_estimate(
				(&from.0, from.1),
				(&to.0, to.1),
				request.withdraw_amount,
			)
			.await?
		else {
			return Ok(None);
		};

		let range = self.deposit_range((&from.0, from.1), (&to.0, to.1)).await;

		Ok(Some(SwapQuote {
			provider: PROVIDER_ID.to_string(),
			deposit_amount,
			deposit_currency: request.from_currency.clone(),
			deposit_network: request.from_network.clone(),
			withdraw_amount: request.withdraw_amount,
			withdraw_currency: request.to_currency.clone(),
			withdraw_network: request.to_network.clone(),
			rate: request.withdraw_amount / deposit_amount,
			min_deposit: range.min_amount,
			max_deposit: range.max_amount,
			eta_minutes: None,
		}))
	}

	async fn create_swap(&self, request: &CreateSwapRequest) -> ProviderResult<SwapDetails> {
		let (Some(from_network), Some(to_network)) = (
			Self::vendor_network(&request.from_network),
			Self::vendor_network(&request.to_network),
		) else {
			return Err(ProviderError::invalid_response(format!(
				"pair {}/{} -> {}/{} not supported by StealthEX",
				request.from_currency,
				request.from_network,
				request.to_currency,
				request.to_network
			)));
		};

		let from_currency = request.from_currency.to_lowercase();
		let to_currency = request.to_currency.to_lowercase();
		let body = CreateExchangeBody {
			currency_from: &from_currency,
			network_from: from_network,
			currency_to: &to_currency,
			network_to: to_network,
			amount_to: request.withdraw_amount,
			fixed: true,
			reverse: true,
			address_to: &request.withdraw_address,
			extra_id_to: request.withdraw_memo.as_deref(),
		};

		let url = format!("{}/exchange", self.base_url);
		let http_request = self
			.client
			.post(&url)
			.query(&self.base_params())
			.json(&body);

		let response = send_bounded(http_request, self.config.timeout_ms).await?;
		if !response.status().is_success() {
			let status = response.status().as_u16();
			return match response.json::<ApiError>().await {
				Ok(body) => Err(ProviderError::Api {
					code: status.to_string(),
					message: body.message,
				}),
				Err(_) => Err(ProviderError::http_failure(status, "exchange creation failed")),
			};
		}

		let created: ExchangeResponse = json_body(response).await?;
		debug!(
			"StealthEX exchange {} created (status: {})",
			created.id, created.status
		);

		Ok(SwapDetails {
			provider: PROVIDER_ID.to_string(),
			swap_id: created.id,
			deposit_address: created.address_from,
			deposit_memo: created.extra_id_from,
			deposit_amount: created.amount_from,
			deposit_currency: request.from_currency.clone(),
			deposit_network: request.from_network.clone(),
			withdraw_amount: created.amount_to,
			withdraw_address: created.address_to,
			expires_at: created.expires_at,
		})
	}

	async fn swap_status(&self, swap_id: &str) -> ProviderResult<SwapStatus> {
		let url = format!("{}/exchange/{}", self.base_url, swap_id);
		let request = self.client.get(&url).query(&self.base_params());

		let response = send_bounded(request, self.config.timeout_ms).await?;
		if response.status().as_u16() == 404 {
			return Err(ProviderError::NotFound {
				provider: PROVIDER_ID.to_string(),
			});
		}
		if !response.status().is_success() {
			return Err(ProviderError::http_failure(
				response.status().as_u16(),
				format!("status lookup failed for exchange {}", swap_id),
			));
		}

		let payload: ExchangeResponse = json_body(response).await?;
		Ok(SwapStatus {
			provider: PROVIDER_ID.to_string(),
			swap_id: payload.id,
			status: Self::normalize_status(&payload.status),
			raw_status: payload.status,
			deposit_tx: payload.tx_from,
			withdraw_tx: payload.tx_to,
			confirmations: None,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_network_translation_roundtrip() {
		assert_eq!(StealthExProvider::vendor_network("ERC20"), Some("eth"));
		assert_eq!(StealthExProvider::vendor_network("erc20"), Some("eth"));
		assert_eq!(StealthExProvider::canonical_network("eth"), Some("ERC20"));
		assert_eq!(StealthExProvider::vendor_network("LIGHTNING"), None);
		assert_eq!(StealthExProvider::canonical_network("lightning"), None);
	}

	#[test]
	fn test_status_normalization() {
		assert_eq!(
			StealthExProvider::normalize_status("waiting"),
			NormalizedStatus::AwaitingDeposit
		);
		assert_eq!(
			StealthExProvider::normalize_status("verifying"),
			NormalizedStatus::Exchanging
		);
		assert_eq!(
			StealthExProvider::normalize_status("finished"),
			NormalizedStatus::Completed
		);
		assert_eq!(
			StealthExProvider::normalize_status("something-new"),
			NormalizedStatus::Pending
		);
	}

	#[test]
	fn test_enabled_without_api_key() {
		let provider = StealthExProvider::new(ProviderRuntimeConfig::new(None));
		assert!(provider.enabled());
		assert!(provider.base_params().is_empty());
	}

	#[test]
	fn test_api_key_forwarded_when_present() {
		let provider =
			StealthExProvider::new(ProviderRuntimeConfig::new(Some("secret".to_string())));
		assert_eq!(
			provider.base_params(),
			vec![("api_key", "secret".to_string())]
		);
	}
}
