//! Supported-coin listing models

use serde::{Deserialize, Serialize};

/// One coin a provider can trade, with the networks it trades on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedCoin {
	/// Uppercase currency code, e.g. "BTC" or "USDT"
	pub code: String,

	/// Human-readable display name
	pub name: String,

	/// Canonical network codes this coin trades on, in provider order
	pub networks: Vec<String>,

	/// Optional icon URL supplied by the provider
	pub icon_url: Option<String>,
}

impl SupportedCoin {
	pub fn new(code: impl Into<String>, name: impl Into<String>, networks: Vec<String>) -> Self {
		Self {
			code: code.into().to_uppercase(),
			name: name.into(),
			networks,
			icon_url: None,
		}
	}

	pub fn with_icon(mut self, icon_url: impl Into<String>) -> Self {
		self.icon_url = Some(icon_url.into());
		self
	}

	/// Merge another provider's view of the same coin: union the networks,
	/// preserving first-seen order, and keep the first non-empty icon.
	pub fn merge(&mut self, other: &SupportedCoin) {
		for network in &other.networks {
			if !self.networks.contains(network) {
				self.networks.push(network.clone());
			}
		}
		if self.icon_url.is_none() {
			self.icon_url = other.icon_url.clone();
		}
	}
}

/// Result of a provider coin-listing call.
///
/// Coin listing is advisory (UI population), so adapters degrade to a small
/// hardcoded list instead of failing. The variant keeps the "we degraded"
/// signal available for logging and health tracking while callers that only
/// want the list use [`CoinListing::coins`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinListing {
	/// List fetched live from the provider
	Fetched(Vec<SupportedCoin>),
	/// Hardcoded fallback used because the live fetch failed
	Fallback(Vec<SupportedCoin>),
}

impl CoinListing {
	pub fn coins(&self) -> &[SupportedCoin] {
		match self {
			CoinListing::Fetched(coins) | CoinListing::Fallback(coins) => coins,
		}
	}

	pub fn into_coins(self) -> Vec<SupportedCoin> {
		match self {
			CoinListing::Fetched(coins) | CoinListing::Fallback(coins) => coins,
		}
	}

	pub fn is_fallback(&self) -> bool {
		matches!(self, CoinListing::Fallback(_))
	}

	pub fn len(&self) -> usize {
		self.coins().len()
	}

	pub fn is_empty(&self) -> bool {
		self.coins().is_empty()
	}
}
