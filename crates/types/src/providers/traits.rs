//! The uniform provider contract
//!
//! Every third-party swap service is wrapped in one implementation of
//! [`SwapProvider`]. The uniformity is the point: the rate shopper and
//! health monitor only ever see this interface, never vendor specifics.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt::Debug;

use crate::coins::CoinListing;
use crate::quotes::{QuoteRequest, SwapQuote};
use crate::swaps::{CreateSwapRequest, SwapDetails, SwapStatus};

use super::errors::ProviderResult;
use super::ProviderInfo;

/// Uniform contract for swap-exchange provider adapters
#[async_trait]
pub trait SwapProvider: Send + Sync + Debug {
	/// Static identity for this adapter
	fn info(&self) -> &ProviderInfo;

	/// Registry identifier
	fn id(&self) -> &str {
		&self.info().id
	}

	fn name(&self) -> &str {
		&self.info().name
	}

	fn display_name(&self) -> &str {
		&self.info().display_name
	}

	/// Whether required credentials are configured. Disabled providers stay
	/// registered but are excluded from rotation.
	fn enabled(&self) -> bool;

	/// Fetch the provider's currency list.
	///
	/// Never fails: on any network or parse fault the adapter returns its
	/// hardcoded [`CoinListing::Fallback`] list, since coin listing is
	/// advisory rather than transactional.
	async fn supported_coins(&self) -> CoinListing;

	/// Fixed-receive quote: the withdraw amount is held constant and the
	/// deposit amount is solved for.
	///
	/// Returns `Ok(None)` when the provider indicates the pair is
	/// unsupported or the amount is out of bounds; `Err` only on
	/// transport-level faults.
	async fn quote(&self, request: &QuoteRequest) -> ProviderResult<Option<SwapQuote>>;

	/// Pair support is probed with a nominal-amount quote rather than a
	/// separate endpoint: vendor pair-support APIs may not exist or may
	/// disagree with actual quote behavior.
	async fn is_pair_supported(
		&self,
		from_currency: &str,
		from_network: &str,
		to_currency: &str,
		to_network: &str,
	) -> bool {
		let probe = QuoteRequest::new(
			from_currency,
			from_network,
			to_currency,
			to_network,
			Decimal::ONE_HUNDRED,
		);
		matches!(self.quote(&probe).await, Ok(Some(_)))
	}

	/// Submit the fixed-receive exchange order. Transactional with real
	/// money implications, so faults propagate; there is no silent fallback.
	async fn create_swap(&self, request: &CreateSwapRequest) -> ProviderResult<SwapDetails>;

	/// Poll a swap by its provider-assigned id and normalize the status.
	/// Unknown vendor statuses normalize to pending rather than failing.
	async fn swap_status(&self, swap_id: &str) -> ProviderResult<SwapStatus>;
}
