//! Mock provider adapters for tests and examples
//!
//! A [`MockProvider`] behaves like a real adapter without any network I/O.
//! Call counters let tests assert exactly which providers a fan-out touched.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rateshop_types::{
	CoinListing, CreateSwapRequest, NormalizedStatus, ProviderError, ProviderInfo,
	ProviderResult, QuoteRequest, SupportedCoin, SwapDetails, SwapProvider, SwapQuote, SwapStatus,
};

/// What a [`MockProvider`] does when asked for a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
	/// Return a quote with this deposit amount
	Quote(Decimal),
	/// Decline the pair: `Ok(None)` from quotes, fetched coin list
	NoQuote,
	/// Fail every call; coin listing degrades to the fallback list
	Fail,
	/// Sleep for the configured delay, then fail with a timeout error
	TimeOut,
}

/// Configurable in-memory provider
#[derive(Debug)]
pub struct MockProvider {
	info: ProviderInfo,
	behavior: MockBehavior,
	enabled: bool,
	coins: Vec<SupportedCoin>,
	delay: Duration,
	quote_calls: AtomicUsize,
	create_calls: AtomicUsize,
	status_calls: AtomicUsize,
	coin_calls: AtomicUsize,
}

impl MockProvider {
	pub fn with_config(id: &str, behavior: MockBehavior) -> Self {
		Self {
			info: ProviderInfo::new(id, id, id, "mock"),
			behavior,
			enabled: true,
			coins: vec![
				SupportedCoin::new("BTC", "Bitcoin", vec!["BTC".to_string()]),
				SupportedCoin::new("ETH", "Ethereum", vec!["ERC20".to_string()]),
			],
			delay: Duration::from_millis(50),
			quote_calls: AtomicUsize::new(0),
			create_calls: AtomicUsize::new(0),
			status_calls: AtomicUsize::new(0),
			coin_calls: AtomicUsize::new(0),
		}
	}

	/// A provider that always quotes the given deposit amount
	pub fn quoting(id: &str, deposit_amount: Decimal) -> Self {
		Self::with_config(id, MockBehavior::Quote(deposit_amount))
	}

	/// A provider whose every call errors
	pub fn failing(id: &str) -> Self {
		Self::with_config(id, MockBehavior::Fail)
	}

	/// A provider that times out on every call
	pub fn timing_out(id: &str) -> Self {
		Self::with_config(id, MockBehavior::TimeOut)
	}

	/// A reachable provider that declines every pair
	pub fn no_quote(id: &str) -> Self {
		Self::with_config(id, MockBehavior::NoQuote)
	}

	/// A provider without credentials, excluded from rotation
	pub fn disabled(id: &str) -> Self {
		Self::with_config(id, MockBehavior::NoQuote).without_credentials()
	}

	/// Drop credentials, so `enabled()` reports false for any behavior
	pub fn without_credentials(mut self) -> Self {
		self.enabled = false;
		self
	}

	pub fn with_coins(mut self, coins: Vec<SupportedCoin>) -> Self {
		self.coins = coins;
		self
	}

	/// Sleep applied by the time-out behavior
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	pub fn quote_calls(&self) -> usize {
		self.quote_calls.load(Ordering::SeqCst)
	}

	pub fn create_calls(&self) -> usize {
		self.create_calls.load(Ordering::SeqCst)
	}

	pub fn status_calls(&self) -> usize {
		self.status_calls.load(Ordering::SeqCst)
	}

	pub fn coin_calls(&self) -> usize {
		self.coin_calls.load(Ordering::SeqCst)
	}

	fn timeout_error(&self) -> ProviderError {
		ProviderError::Timeout {
			timeout_ms: self.delay.as_millis() as u64,
		}
	}
}

#[async_trait]
impl SwapProvider for MockProvider {
	fn info(&self) -> &ProviderInfo {
		&self.info
	}

	fn enabled(&self) -> bool {
		self.enabled
	}

	async fn supported_coins(&self) -> CoinListing {
		self.coin_calls.fetch_add(1, Ordering::SeqCst);
		match self.behavior {
			MockBehavior::Fail => CoinListing::Fallback(self.coins.clone()),
			MockBehavior::TimeOut => {
				tokio::time::sleep(self.delay).await;
				CoinListing::Fallback(self.coins.clone())
			},
			_ => CoinListing::Fetched(self.coins.clone()),
		}
	}

	async fn quote(&self, request: &QuoteRequest) -> ProviderResult<Option<SwapQuote>> {
		self.quote_calls.fetch_add(1, Ordering::SeqCst);
		match self.behavior {
			MockBehavior::Quote(deposit_amount) => Ok(Some(SwapQuote {
				provider: self.id().to_string(),
				deposit_amount,
				deposit_currency: request.from_currency.clone(),
				deposit_network: request.from_network.clone(),
				withdraw_amount: request.withdraw_amount,
				withdraw_currency: request.to_currency.clone(),
				withdraw_network: request.to_network.clone(),
				rate: request.withdraw_amount / deposit_amount,
				min_deposit: None,
				max_deposit: None,
				eta_minutes: Some(10),
			})),
			MockBehavior::NoQuote => Ok(None),
			MockBehavior::Fail => Err(ProviderError::invalid_response("mock quote failure")),
			MockBehavior::TimeOut => {
				tokio::time::sleep(self.delay).await;
				Err(self.timeout_error())
			},
		}
	}

	async fn create_swap(&self, request: &CreateSwapRequest) -> ProviderResult<SwapDetails> {
		self.create_calls.fetch_add(1, Ordering::SeqCst);
		match self.behavior {
			MockBehavior::Quote(deposit_amount) => Ok(SwapDetails {
				provider: self.id().to_string(),
				swap_id: format!("{}-swap-1", self.id()),
				deposit_address: format!("{}-deposit-address", self.id()),
				deposit_memo: None,
				deposit_amount,
				deposit_currency: request.from_currency.clone(),
				deposit_network: request.from_network.clone(),
				withdraw_amount: request.withdraw_amount,
				withdraw_address: request.withdraw_address.clone(),
				expires_at: None,
			}),
			MockBehavior::NoQuote => Err(ProviderError::invalid_response(
				"mock provider declines all pairs",
			)),
			MockBehavior::Fail => Err(ProviderError::invalid_response("mock create failure")),
			MockBehavior::TimeOut => {
				tokio::time::sleep(self.delay).await;
				Err(self.timeout_error())
			},
		}
	}

	async fn swap_status(&self, swap_id: &str) -> ProviderResult<SwapStatus> {
		self.status_calls.fetch_add(1, Ordering::SeqCst);
		match self.behavior {
			MockBehavior::Quote(_) | MockBehavior::NoQuote => Ok(SwapStatus {
				provider: self.id().to_string(),
				swap_id: swap_id.to_string(),
				raw_status: "waiting".to_string(),
				status: NormalizedStatus::AwaitingDeposit,
				deposit_tx: None,
				withdraw_tx: None,
				confirmations: None,
			}),
			MockBehavior::Fail => Err(ProviderError::NotFound {
				provider: self.id().to_string(),
			}),
			MockBehavior::TimeOut => {
				tokio::time::sleep(self.delay).await;
				Err(self.timeout_error())
			},
		}
	}
}
