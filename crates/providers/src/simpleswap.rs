//! SimpleSwap adapter
//!
//! SimpleSwap fuses currency and network into a single ticker ("usdterc20",
//! "usdttrc20") and only exposes forward estimation. The fixed-receive quote
//! therefore inverts direction: it estimates what the fixed withdraw amount
//! converts to in the pay currency, and uses that as the required deposit.
//! Requires an API key.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use rateshop_types::{
	CoinListing, CreateSwapRequest, NormalizedStatus, ProviderError, ProviderInfo,
	ProviderResult, ProviderRuntimeConfig, QuoteRequest, SupportedCoin, SwapDetails, SwapProvider,
	SwapQuote, SwapStatus,
};

use crate::http::{build_client, json_body, send_bounded};

pub const PROVIDER_ID: &str = "simpleswap";

const API_BASE: &str = "https://api.simpleswap.io";

/// Coins whose bare lowercase ticker already implies a network
const NATIVE_TICKERS: &[(&str, &str)] = &[
	("BTC", "BTC"),
	("ETH", "ERC20"),
	("LTC", "LTC"),
	("XRP", "XRP"),
	("DOGE", "DOGE"),
	("SOL", "SOL"),
	("TRX", "TRC20"),
	("BNB", "BSC"),
	("MATIC", "POLYGON"),
	("AVAX", "AVAX"),
];

/// Canonical network code -> ticker suffix for fused tickers.
/// Longest suffixes first so ticker parsing never matches a prefix of a
/// longer suffix.
const TICKER_SUFFIXES: &[(&str, &str)] = &[
	("AVAX", "avaxc"),
	("ERC20", "erc20"),
	("TRC20", "trc20"),
	("BSC", "bep20"),
	("POLYGON", "matic"),
	("BASE", "base"),
	("ARBITRUM", "arb"),
	("OPTIMISM", "op"),
	("SOL", "sol"),
];

// ================================
// SIMPLESWAP API MODELS
// ================================

#[derive(Debug, Serialize)]
struct CreateExchangeBody<'a> {
	fixed: bool,
	currency_from: String,
	currency_to: String,
	amount: Decimal,
	address_to: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	extra_id_to: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExchangeResponse {
	id: String,
	status: Option<String>,
	address_from: String,
	extra_id_from: Option<String>,
	amount_from: Decimal,
	amount_to: Decimal,
	address_to: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ExchangeStatusResponse {
	id: String,
	status: String,
	tx_from: Option<String>,
	tx_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CurrencyEntry {
	symbol: String,
	name: String,
	image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
	#[serde(default)]
	code: u16,
	#[serde(default)]
	description: String,
}

/// SimpleSwap provider adapter
#[derive(Debug)]
pub struct SimpleSwapProvider {
	info: ProviderInfo,
	config: ProviderRuntimeConfig,
	client: Client,
	base_url: String,
}

impl SimpleSwapProvider {
	pub fn new(config: ProviderRuntimeConfig) -> Self {
		Self::with_base_url(config, API_BASE)
	}

	pub fn with_base_url(config: ProviderRuntimeConfig, base_url: impl Into<String>) -> Self {
		let client = build_client(HeaderMap::new(), config.timeout_ms);
		Self {
			info: ProviderInfo::new(PROVIDER_ID, "SimpleSwap", "SimpleSwap", "1"),
			config,
			client,
			base_url: base_url.into(),
		}
	}

	/// Build the fused vendor ticker for a currency on a network.
	/// Returns None for networks this provider has no vocabulary for.
	fn vendor_symbol(currency: &str, network: &str) -> Option<String> {
		let currency = currency.to_uppercase();
		let network = network.to_uppercase();

		if NATIVE_TICKERS
			.iter()
			.any(|(coin, net)| *coin == currency && *net == network)
		{
			return Some(currency.to_lowercase());
		}

		TICKER_SUFFIXES
			.iter()
			.find(|(canonical, _)| *canonical == network)
			.map(|(_, suffix)| format!("{}{}", currency.to_lowercase(), suffix))
	}

	/// Split a fused vendor ticker back into (code, canonical network)
	fn parse_symbol(symbol: &str) -> (String, String) {
		let lower = symbol.to_lowercase();

		if let Some((coin, network)) = NATIVE_TICKERS
			.iter()
			.find(|(coin, _)| coin.to_lowercase() == lower)
		{
			return (coin.to_string(), network.to_string());
		}

		for (canonical, suffix) in TICKER_SUFFIXES {
			if let Some(stem) = lower.strip_suffix(suffix) {
				if !stem.is_empty() {
					return (stem.to_uppercase(), canonical.to_string());
				}
			}
		}

		let code = symbol.to_uppercase();
		(code.clone(), code)
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

	fn api_key(&self) -> &str {
		self.config.api_key.as_deref().unwrap_or("")
	}

	/// Forward estimate of `amount` of `from` into `to`, in vendor tickers.
	/// `Ok(None)` when the vendor reports the pair or amount as unusable.
	async fn estimate(
		&self,
		currency_from: &str,
		currency_to: &str,
		amount: Decimal,
	) -> ProviderResult<Option<Decimal>> {
		let url = format!("{}/get_estimated", self.base_url);
		let amount_param = amount.to_string();
		let request = self.client.get(&url).query(&[
			("api_key", self.api_key()),
			("fixed", "true"),
			("currency_from", currency_from),
			("currency_to", currency_to),
			("amount", amount_param.as_str()),
		]);

		let response = send_bounded(request, self.config.timeout_ms).await?;
		let status = response.status();

		if status.as_u16() == 422 {
			// Out-of-range amounts and unsupported pairs come back as 422
			let body = response.json::<ApiError>().await.unwrap_or(ApiError {
				code: 422,
				description: String::new(),
			});
			debug!(
				"SimpleSwap estimate rejected ({}): {}",
				body.code, body.description
			);
			return Ok(None);
		}
		if !status.is_success() {
			return Err(ProviderError::http_failure(
				status.as_u16(),
				"estimate request failed",
			));
		}

		// The endpoint returns a bare JSON string ("0.0021") or null
		let value: Value = json_body(response).await?;
		match value {
			Value::Null => Ok(None),
			Value::String(s) => {
				let parsed = s
					.parse::<Decimal>()
					.map_err(|_| ProviderError::invalid_response(format!(
						"unparseable estimate: {}",
						s
					)))?;
				Ok(Some(parsed))
			},
			Value::Number(n) => {
				let parsed = n.to_string().parse::<Decimal>().map_err(|_| {
					ProviderError::invalid_response(format!("unparseable estimate: {}", n))
				})?;
				Ok(Some(parsed))
			},
			other => Err(ProviderError::invalid_response(format!(
				"unexpected estimate shape: {}",
				other
			))),
		}
	}

	async fn fetch_coins(&self) -> ProviderResult<Vec<SupportedCoin>> {
		let url = format!("{}/get_all_currencies", self.base_url);
		let request = self
			.client
			.get(&url)
			.query(&[("api_key", self.api_key())]);

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
			let (code, network) = Self::parse_symbol(&entry.symbol);
			match coins.iter_mut().find(|c| c.code == code) {
				Some(coin) => {
					if !coin.networks.contains(&network) {
						coin.networks.push(network);
					}
				},
				None => {
					let mut coin = SupportedCoin::new(code, entry.name, vec![network]);
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
				vec!["ERC20".to_string(), "TRC20".to_string(), "BSC".to_string()],
			),
			SupportedCoin::new("USDC", "USD Coin", vec!["ERC20".to_string()]),
		]
	}
}

#[async_trait]
impl SwapProvider for SimpleSwapProvider {
	fn info(&self) -> &ProviderInfo {
		&self.info
	}

	fn enabled(&self) -> bool {
		self.config.has_api_key()
	}

	async fn supported_coins(&self) -> CoinListing {
		match self.fetch_coins().await {
			Ok(coins) if !coins.is_empty() => CoinListing::Fetched(coins),
			Ok(_) => {
				warn!("SimpleSwap returned an empty currency list, using fallback");
				CoinListing::Fallback(Self::fallback_coins())
			},
			Err(e) => {
				warn!("SimpleSwap currency listing failed: {}, using fallback", e);
				CoinListing::Fallback(Self::fallback_coins())
			},
		}
	}

	async fn quote(&self, request: &QuoteRequest) -> ProviderResult<Option<SwapQuote>> {
		let (Some(from_symbol), Some(to_symbol)) = (
			Self::vendor_symbol(&request.from_currency, &request.from_network),
			Self::vendor_symbol(&request.to_currency, &request.to_network),
		) else {
			return Ok(None);
		};

		// Forward-only API: estimate the fixed withdraw amount converted
		// back into the pay currency to solve for the deposit.
		let Some(deposit_amount) = self
			.estimate(&to_symbol, &from_symbol, request.withdraw_amount)
			.await?
		else {
			return Ok(None);
		};
		if deposit_amount <= Decimal::ZERO {
			return Ok(None);
		}

		Ok(Some(SwapQuote {
			provider: PROVIDER_ID.to_string(),
			deposit_amount,
			deposit_currency: request.from_currency.clone(),
			deposit_network: request.from_network.clone(),
			withdraw_amount: request.withdraw_amount,
			withdraw_currency: request.to_currency.clone(),
			withdraw_network: request.to_network.clone(),
			rate: request.withdraw_amount / deposit_amount,
			min_deposit: None,
			max_deposit: None,
			eta_minutes: None,
		}))
	}

	async fn create_swap(&self, request: &CreateSwapRequest) -> ProviderResult<SwapDetails> {
		let (Some(from_symbol), Some(to_symbol)) = (
			Self::vendor_symbol(&request.from_currency, &request.from_network),
			Self::vendor_symbol(&request.to_currency, &request.to_network),
		) else {
			return Err(ProviderError::invalid_response(format!(
				"pair {}/{} -> {}/{} not supported by SimpleSwap",
				request.from_currency,
				request.from_network,
				request.to_currency,
				request.to_network
			)));
		};

		// Creation is forward-direction only, so solve for the deposit
		// amount first and submit that.
		let deposit_amount = self
			.estimate(&to_symbol, &from_symbol, request.withdraw_amount)
			.await?
			.ok_or_else(|| ProviderError::invalid_response(
				"no deposit estimate available for swap creation",
			))?;

		let body = CreateExchangeBody {
			fixed: true,
			currency_from: from_symbol,
			currency_to: to_symbol,
			amount: deposit_amount,
			address_to: &request.withdraw_address,
			extra_id_to: request.withdraw_memo.as_deref(),
		};

		let url = format!("{}/create_exchange", self.base_url);
		let http_request = self
			.client
			.post(&url)
			.query(&[("api_key", self.api_key())])
			.json(&body);

		let response = send_bounded(http_request, self.config.timeout_ms).await?;
		if !response.status().is_success() {
			let status = response.status().as_u16();
			return match response.json::<ApiError>().await {
				Ok(body) => Err(ProviderError::Api {
					code: body.code.to_string(),
					message: body.description,
				}),
				Err(_) => Err(ProviderError::http_failure(status, "exchange creation failed")),
			};
		}

		let created: ExchangeResponse = json_body(response).await?;
		debug!(
			"SimpleSwap exchange {} created (status: {:?})",
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
			expires_at: None,
		})
	}

	async fn swap_status(&self, swap_id: &str) -> ProviderResult<SwapStatus> {
		let url = format!("{}/get_exchange", self.base_url);
		let request = self
			.client
			.get(&url)
			.query(&[("api_key", self.api_key()), ("id", swap_id)]);

		let response = send_bounded(request, self.config.timeout_ms).await?;
		if !response.status().is_success() {
			return Err(ProviderError::http_failure(
				response.status().as_u16(),
				format!("status lookup failed for exchange {}", swap_id),
			));
		}

		let payload: ExchangeStatusResponse = json_body(response).await?;
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
