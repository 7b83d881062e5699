//! ChangeNOW adapter
//!
//! ChangeNOW exposes a native fixed-rate reverse estimate (`type=reverse`),
//! so the fixed-receive quote maps directly onto its estimate endpoint.
//! Requires an API key; without one the adapter constructs fine but reports
//! itself disabled.

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

pub const PROVIDER_ID: &str = "changenow";

const API_BASE: &str = "https://api.changenow.io/v2";
const API_KEY_HEADER: &str = "x-changenow-api-key";

/// Canonical network code -> ChangeNOW network name
const NETWORKS: &[(&str, &str)] = &[
	("BTC", "btc"),
	("ERC20", "eth"),
	("TRC20", "trx"),
	("BSC", "bsc"),
	("POLYGON", "matic"),
	("SOL", "sol"),
	("LTC", "ltc"),
	("XRP", "xrp"),
	("DOGE", "doge"),
	("AVAX", "cchain"),
	("ARBITRUM", "arbitrum"),
	("OPTIMISM", "op"),
	("BASE", "base"),
];

/// Vendor error codes that mean "no quote for this pair/amount", not a fault
const EXPECTED_ABSENCE_CODES: &[&str] = &[
	"pair_is_inactive",
	"out_of_range",
	"deposit_too_small",
	"not_valid_params",
];

// ================================
// CHANGENOW API MODELS
// ================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateResponse {
	/// Deposit amount solved for by the reverse estimate; null when the
	/// pair is inactive
	from_amount: Option<Decimal>,
	/// Forecast like "10-60" (minutes)
	transaction_speed_forecast: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateExchangeRequest<'a> {
	from_currency: String,
	to_currency: String,
	from_network: &'a str,
	to_network: &'a str,
	to_amount: Decimal,
	address: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	extra_id: Option<&'a str>,
	flow: &'static str,
	#[serde(rename = "type")]
	kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateExchangeResponse {
	id: String,
	payin_address: String,
	payin_extra_id: Option<String>,
	from_amount: Decimal,
	to_amount: Decimal,
	payout_address: String,
	valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeStatusResponse {
	id: String,
	status: String,
	payin_hash: Option<String>,
	payout_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CurrencyEntry {
	ticker: String,
	name: String,
	network: String,
	image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
	error: String,
	message: Option<String>,
}

/// ChangeNOW provider adapter
#[derive(Debug)]
pub struct ChangeNowProvider {
	info: ProviderInfo,
	config: ProviderRuntimeConfig,
	client: Client,
	base_url: String,
}

impl ChangeNowProvider {
	pub fn new(config: ProviderRuntimeConfig) -> Self {
		Self::with_base_url(config, API_BASE)
	}

	/// Point the adapter at a non-default endpoint (tests, sandboxes)
	pub fn with_base_url(config: ProviderRuntimeConfig, base_url: impl Into<String>) -> Self {
		let client = build_client(HeaderMap::new(), config.timeout_ms);
		Self {
			info: ProviderInfo::new(PROVIDER_ID, "ChangeNOW", "ChangeNOW", "2"),
			config,
			client,
			base_url: base_url.into(),
		}
	}

	fn to_vendor_network(network: &str) -> Option<&'static str> {
		NETWORKS
			.iter()
			.find(|(canonical, _)| *canonical == network)
			.map(|(_, vendor)| *vendor)
	}

	fn from_vendor_network(vendor: &str) -> String {
		NETWORKS
			.iter()
			.find(|(_, v)| *v == vendor)
			.map(|(canonical, _)| canonical.to_string())
			.unwrap_or_else(|| vendor.to_uppercase())
	}

	fn normalize_status(raw: &str) -> NormalizedStatus {
		match raw {
			"new" | "waiting" => NormalizedStatus::AwaitingDeposit,
			"confirming" => NormalizedStatus::Confirming,
			"exchanging" => NormalizedStatus::Exchanging,
			"sending" => NormalizedStatus::Sending,
			"finished" => NormalizedStatus::Completed,
			"failed" => NormalizedStatus::Failed,
			"expired" => NormalizedStatus::Expired,
			"refunded" => NormalizedStatus::Refunded,
			_ => NormalizedStatus::Pending,
		}
	}

	/// Parse the leading number out of a forecast like "10-60"
	fn parse_eta_minutes(forecast: Option<&str>) -> Option<u64> {
		let forecast = forecast?;
		let leading: String = forecast.chars().take_while(|c| c.is_ascii_digit()).collect();
		leading.parse().ok()
	}

	fn api_key(&self) -> &str {
		self.config.api_key.as_deref().unwrap_or("")
	}

	/// Decide whether a non-2xx body means expected absence or a real fault
	async fn classify_failure(response: reqwest::Response) -> ProviderResult<Option<SwapQuote>> {
		let status = response.status().as_u16();
		match response.json::<ApiError>().await {
			Ok(body) if EXPECTED_ABSENCE_CODES.contains(&body.error.as_str()) => Ok(None),
			Ok(body) => Err(ProviderError::Api {
				code: body.error,
				message: body.message.unwrap_or_default(),
			}),
			Err(_) => Err(ProviderError::http_failure(
				status,
				"unexpected error body from ChangeNOW",
			)),
		}
	}

	async fn fetch_coins(&self) -> ProviderResult<Vec<SupportedCoin>> {
		let url = format!("{}/exchange/currencies", self.base_url);
		let request = self
			.client
			.get(&url)
			.header(API_KEY_HEADER, self.api_key())
			.query(&[("active", "true"), ("flow", "fixed-rate")]);

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
			let network = Self::from_vendor_network(&entry.network);
			let code = entry.ticker.to_uppercase();
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
				vec!["ERC20".to_string(), "TRC20".to_string()],
			),
			SupportedCoin::new(
				"USDC",
				"USD Coin",
				vec!["ERC20".to_string(), "POLYGON".to_string()],
			),
		]
	}
}

#[async_trait]
impl SwapProvider for ChangeNowProvider {
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
				warn!("ChangeNOW returned an empty currency list, using fallback");
				CoinListing::Fallback(Self::fallback_coins())
			},
			Err(e) => {
				warn!("ChangeNOW currency listing failed: {}, using fallback", e);
				CoinListing::Fallback(Self::fallback_coins())
			},
		}
	}

	async fn quote(&self, request: &QuoteRequest) -> ProviderResult<Option<SwapQuote>> {
		let (Some(from_network), Some(to_network)) = (
			Self::to_vendor_network(&request.from_network),
			Self::to_vendor_network(&request.to_network),
		) else {
			// Networks this provider has no name for cannot be quoted
			return Ok(None);
		};

		let url = format!("{}/exchange/estimated-amount", self.base_url);
		let amount_param = request.withdraw_amount.to_string();
		let http_request = self
			.client
			.get(&url)
			.header(API_KEY_HEADER, self.api_key())
			.query(&[
				("fromCurrency", request.from_currency.to_lowercase().as_str()),
				("toCurrency", request.to_currency.to_lowercase().as_str()),
				("fromNetwork", from_network),
				("toNetwork", to_network),
				("toAmount", amount_param.as_str()),
				("flow", "fixed-rate"),
				("type", "reverse"),
			]);

		debug!(
			"ChangeNOW reverse estimate {}/{} -> {}/{} toAmount={}",
			request.from_currency,
			request.from_network,
			request.to_currency,
			request.to_network,
			request.withdraw_amount
		);

		let response = send_bounded(http_request, self.config.timeout_ms).await?;
		if !response.status().is_success() {
			return Self::classify_failure(response).await;
		}

		let estimate: EstimateResponse = json_body(response).await?;
		let Some(deposit_amount) = estimate.from_amount else {
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
			// The merchant-side amount is fixed by contract; the vendor echo
			// of it is never trusted
			withdraw_amount: request.withdraw_amount,
			withdraw_currency: request.to_currency.clone(),
			withdraw_network: request.to_network.clone(),
			rate: request.withdraw_amount / deposit_amount,
			min_deposit: None,
			max_deposit: None,
			eta_minutes: Self::parse_eta_minutes(estimate.transaction_speed_forecast.as_deref()),
		}))
	}

	async fn create_swap(&self, request: &CreateSwapRequest) -> ProviderResult<SwapDetails> {
		let (Some(from_network), Some(to_network)) = (
			Self::to_vendor_network(&request.from_network),
			Self::to_vendor_network(&request.to_network),
		) else {
			return Err(ProviderError::invalid_response(format!(
				"network pair {}/{} not supported by ChangeNOW",
				request.from_network, request.to_network
			)));
		};

		let body = CreateExchangeRequest {
			from_currency: request.from_currency.to_lowercase(),
			to_currency: request.to_currency.to_lowercase(),
			from_network,
			to_network,
			to_amount: request.withdraw_amount,
			address: &request.withdraw_address,
			extra_id: request.withdraw_memo.as_deref(),
			flow: "fixed-rate",
			kind: "reverse",
		};

		let url = format!("{}/exchange", self.base_url);
		let http_request = self
			.client
			.post(&url)
			.header(API_KEY_HEADER, self.api_key())
			.json(&body);

		let response = send_bounded(http_request, self.config.timeout_ms).await?;
		if !response.status().is_success() {
			let status = response.status().as_u16();
			return match response.json::<ApiError>().await {
				Ok(body) => Err(ProviderError::Api {
					code: body.error,
					message: body.message.unwrap_or_default(),
				}),
				Err(_) => Err(ProviderError::http_failure(status, "exchange creation failed")),
			};
		}

		let created: CreateExchangeResponse = json_body(response).await?;
		debug!("ChangeNOW exchange {} created", created.id);

		Ok(SwapDetails {
			provider: PROVIDER_ID.to_string(),
			swap_id: created.id,
			deposit_address: created.payin_address,
			deposit_memo: created.payin_extra_id,
			deposit_amount: created.from_amount,
			deposit_currency: request.from_currency.clone(),
			deposit_network: request.from_network.clone(),
			withdraw_amount: created.to_amount,
			withdraw_address: created.payout_address,
			expires_at: created.valid_until,
		})
	}

	async fn swap_status(&self, swap_id: &str) -> ProviderResult<SwapStatus> {
		let url = format!("{}/exchange/by-id", self.base_url);
		let http_request = self
			.client
			.get(&url)
			.header(API_KEY_HEADER, self.api_key())
			.query(&[("id", swap_id)]);

		let response = send_bounded(http_request, self.config.timeout_ms).await?;
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
			deposit_tx: payload.payin_hash,
			withdraw_tx: payload.payout_hash,
			confirmations: None,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;

	/// Serve one request with a fixed JSON body on an ephemeral port
	async fn serve_once(body: &'static str) -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut buf = [0u8; 2048];
			let _ = socket.read(&mut buf).await;
			let response = format!(
				"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
				body.len(),
				body
			);
			let _ = socket.write_all(response.as_bytes()).await;
		});
		format!("http://{}", addr)
	}

	#[test]
	fn test_network_mapping() {
		assert_eq!(ChangeNowProvider::to_vendor_network("POLYGON"), Some("matic"));
		assert_eq!(ChangeNowProvider::to_vendor_network("ERC20"), Some("eth"));
		assert_eq!(ChangeNowProvider::to_vendor_network("LIGHTNING"), None);

		assert_eq!(ChangeNowProvider::from_vendor_network("trx"), "TRC20");
		assert_eq!(ChangeNowProvider::from_vendor_network("near"), "NEAR");
	}

	#[test]
	fn test_status_normalization() {
		assert_eq!(
			ChangeNowProvider::normalize_status("waiting"),
			NormalizedStatus::AwaitingDeposit
		);
		assert_eq!(
			ChangeNowProvider::normalize_status("finished"),
			NormalizedStatus::Completed
		);
		assert_eq!(
			ChangeNowProvider::normalize_status("something_new"),
			NormalizedStatus::Pending
		);
	}

	#[test]
	fn test_eta_parsing() {
		assert_eq!(ChangeNowProvider::parse_eta_minutes(Some("10-60")), Some(10));
		assert_eq!(ChangeNowProvider::parse_eta_minutes(Some("25")), Some(25));
		assert_eq!(ChangeNowProvider::parse_eta_minutes(Some("unknown")), None);
		assert_eq!(ChangeNowProvider::parse_eta_minutes(None), None);
	}

	#[test]
	fn test_enabled_requires_api_key() {
		let keyless = ChangeNowProvider::new(ProviderRuntimeConfig::new(None));
		assert!(!keyless.enabled());

		let keyed =
			ChangeNowProvider::new(ProviderRuntimeConfig::new(Some("secret".to_string())));
		assert!(keyed.enabled());
	}

	#[tokio::test]
	async fn test_quote_pins_requested_withdraw_amount() {
		let base = serve_once(
			r#"{"fromAmount":0.005,"toAmount":99.7,"transactionSpeedForecast":"10-60"}"#,
		)
		.await;
		let provider =
			ChangeNowProvider::with_base_url(ProviderRuntimeConfig::new(Some("key".into())), base);

		let quote = provider
			.quote(&QuoteRequest::new("BTC", "BTC", "USDC", "POLYGON", dec!(100)))
			.await
			.unwrap()
			.unwrap();

		assert_eq!(quote.deposit_amount, dec!(0.005));
		// The vendor's slightly-off echo must not leak into the fixed amount
		assert_eq!(quote.withdraw_amount, dec!(100));
		assert_eq!(quote.rate, dec!(100) / dec!(0.005));
		assert_eq!(quote.eta_minutes, Some(10));
	}

	#[tokio::test]
	async fn test_quote_unknown_network_is_expected_absence() {
		let provider =
			ChangeNowProvider::new(ProviderRuntimeConfig::new(Some("key".to_string())));
		let request = QuoteRequest::new("BTC", "LIGHTNING", "USDC", "POLYGON", dec!(100));

		let quote = provider.quote(&request).await.unwrap();
		assert!(quote.is_none());
	}

	#[test]
	fn test_fallback_coins_cover_stablecoins() {
		let coins = ChangeNowProvider::fallback_coins();
		let usdt = coins.iter().find(|c| c.code == "USDT").unwrap();
		assert!(usdt.networks.contains(&"ERC20".to_string()));
		assert!(usdt.networks.contains(&"TRC20".to_string()));
	}
}
