//! Swap creation and status models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to create a fixed-receive swap with a specific provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSwapRequest {
	pub from_currency: String,
	pub from_network: String,
	pub to_currency: String,
	pub to_network: String,
	/// Exact amount the merchant must receive
	pub withdraw_amount: Decimal,
	/// Address the provider pays the merchant at
	pub withdraw_address: String,
	/// Memo/tag for memo-requiring withdraw networks
	pub withdraw_memo: Option<String>,
}

/// A created swap, as returned by a provider.
///
/// `swap_id` is the provider-assigned durable handle; callers persist it and
/// use it for all subsequent status polling. The core itself persists
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapDetails {
	pub provider: String,
	pub swap_id: String,

	/// Address the customer must deposit to
	pub deposit_address: String,
	/// Memo/tag the customer must attach, for memo-requiring networks
	pub deposit_memo: Option<String>,
	pub deposit_amount: Decimal,
	pub deposit_currency: String,
	pub deposit_network: String,

	pub withdraw_amount: Decimal,
	pub withdraw_address: String,

	/// When the deposit window closes, if the provider reports one
	pub expires_at: Option<DateTime<Utc>>,
}

/// Shared status vocabulary every provider's raw status is mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedStatus {
	AwaitingDeposit,
	Confirming,
	Exchanging,
	Sending,
	Completed,
	Failed,
	Expired,
	Refunded,
	/// Safe default for provider statuses we do not recognize
	Pending,
}

impl NormalizedStatus {
	/// Terminal states require no further polling
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			NormalizedStatus::Completed
				| NormalizedStatus::Failed
				| NormalizedStatus::Expired
				| NormalizedStatus::Refunded
		)
	}
}

/// Fresh status snapshot produced on every poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStatus {
	pub provider: String,
	pub swap_id: String,
	/// The provider's own status string, unmodified
	pub raw_status: String,
	pub status: NormalizedStatus,
	pub deposit_tx: Option<String>,
	pub withdraw_tx: Option<String>,
	pub confirmations: Option<u32>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_terminal_states() {
		assert!(NormalizedStatus::Completed.is_terminal());
		assert!(NormalizedStatus::Failed.is_terminal());
		assert!(NormalizedStatus::Expired.is_terminal());
		assert!(NormalizedStatus::Refunded.is_terminal());
		assert!(!NormalizedStatus::AwaitingDeposit.is_terminal());
		assert!(!NormalizedStatus::Pending.is_terminal());
	}

	#[test]
	fn test_status_serde_snake_case() {
		let json = serde_json::to_string(&NormalizedStatus::AwaitingDeposit).unwrap();
		assert_eq!(json, "\"awaiting_deposit\"");

		let parsed: NormalizedStatus = serde_json::from_str("\"pending\"").unwrap();
		assert_eq!(parsed, NormalizedStatus::Pending);
	}
}
