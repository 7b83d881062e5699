//! Quote request and quote result models
//!
//! All quotes are fixed-receive: the merchant's withdraw amount is held
//! constant and the customer's deposit amount is what each provider solves
//! for.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A fixed-receive quote request for one trading pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
	/// Currency the customer pays with, e.g. "BTC"
	pub from_currency: String,
	/// Canonical network code for the pay currency, e.g. "BTC"
	pub from_network: String,
	/// Currency the merchant receives, e.g. "USDC"
	pub to_currency: String,
	/// Canonical network code for the receive currency, e.g. "POLYGON"
	pub to_network: String,
	/// Exact amount the merchant must receive
	pub withdraw_amount: Decimal,
}

impl QuoteRequest {
	pub fn new(
		from_currency: impl Into<String>,
		from_network: impl Into<String>,
		to_currency: impl Into<String>,
		to_network: impl Into<String>,
		withdraw_amount: Decimal,
	) -> Self {
		Self {
			from_currency: from_currency.into().to_uppercase(),
			from_network: from_network.into().to_uppercase(),
			to_currency: to_currency.into().to_uppercase(),
			to_network: to_network.into().to_uppercase(),
			withdraw_amount,
		}
	}
}

/// Immutable snapshot of one provider's pricing for one requested trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
	/// Provider that produced this quote
	pub provider: String,

	/// Amount the customer must deposit
	pub deposit_amount: Decimal,
	pub deposit_currency: String,
	pub deposit_network: String,

	/// Fixed amount the merchant receives; always equals the requested
	/// withdraw amount
	pub withdraw_amount: Decimal,
	pub withdraw_currency: String,
	pub withdraw_network: String,

	/// Exchange rate reported by the provider (withdraw per deposit unit)
	pub rate: Decimal,

	/// Provider deposit bounds for this pair, when reported
	pub min_deposit: Option<Decimal>,
	pub max_deposit: Option<Decimal>,

	/// Estimated completion time in minutes, when reported
	pub eta_minutes: Option<u64>,
}

/// One provider's failure during a rate-shop fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
	pub provider: String,
	pub error: String,
}

/// Outcome of one rate-shop call across all enabled providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateShopResult {
	/// The quote with the minimum deposit amount
	pub best_quote: SwapQuote,
	/// Every usable quote, including the best one
	pub all_quotes: Vec<SwapQuote>,
	/// Providers that failed or returned no quote
	pub failed_providers: Vec<ProviderFailure>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_quote_request_normalizes_case() {
		let request = QuoteRequest::new("btc", "btc", "usdc", "polygon", dec!(100));
		assert_eq!(request.from_currency, "BTC");
		assert_eq!(request.to_network, "POLYGON");
	}

	#[test]
	fn test_quote_serializes_decimal_amounts() {
		let quote = SwapQuote {
			provider: "changenow".to_string(),
			deposit_amount: dec!(0.0021),
			deposit_currency: "BTC".to_string(),
			deposit_network: "BTC".to_string(),
			withdraw_amount: dec!(100),
			withdraw_currency: "USDC".to_string(),
			withdraw_network: "POLYGON".to_string(),
			rate: dec!(47619.05),
			min_deposit: Some(dec!(0.0005)),
			max_deposit: None,
			eta_minutes: Some(15),
		};

		let json = serde_json::to_value(&quote).unwrap();
		assert_eq!(json["deposit_amount"], "0.0021");
		assert_eq!(json["withdraw_amount"], "100");
	}
}
