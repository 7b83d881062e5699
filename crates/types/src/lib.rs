//! Rateshop Types
//!
//! Domain models and the uniform provider contract shared by every crate in
//! the workspace. Nothing here performs I/O; adapters and services build on
//! these types.

pub mod coins;
pub mod health;
pub mod providers;
pub mod quotes;
pub mod swaps;

pub use coins::{CoinListing, SupportedCoin};
pub use health::{ProviderHealth, ProviderMetrics};
pub use providers::{
	errors::{ProviderError, ProviderResult},
	traits::SwapProvider,
	ProviderInfo, ProviderRuntimeConfig,
};
pub use quotes::{ProviderFailure, QuoteRequest, RateShopResult, SwapQuote};
pub use swaps::{CreateSwapRequest, NormalizedStatus, SwapDetails, SwapStatus};

// Re-export external dependencies used in public signatures
pub use chrono;
pub use rust_decimal::Decimal;
pub use serde_json;
