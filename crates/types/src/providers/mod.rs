//! Provider identity and runtime configuration

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod traits;

pub use errors::{ProviderError, ProviderResult};
pub use traits::SwapProvider;

/// Default bound on every outbound provider call
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Static identity of a provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
	/// Stable identifier used for registry lookup, e.g. "changenow"
	pub id: String,
	/// Short name, e.g. "ChangeNOW"
	pub name: String,
	/// Name shown to end users
	pub display_name: String,
	pub version: String,
}

impl ProviderInfo {
	pub fn new(
		id: impl Into<String>,
		name: impl Into<String>,
		display_name: impl Into<String>,
		version: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			display_name: display_name.into(),
			version: version.into(),
		}
	}
}

/// Runtime configuration supplied to an adapter at construction time.
///
/// A missing API key is not an error: adapters that require one construct
/// fine and report `enabled() == false`, silently excluding themselves from
/// rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRuntimeConfig {
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	/// Route calls at the provider's sandbox where one exists
	pub test_mode: bool,
}

impl ProviderRuntimeConfig {
	pub fn new(api_key: Option<String>) -> Self {
		Self {
			api_key,
			timeout_ms: DEFAULT_TIMEOUT_MS,
			test_mode: false,
		}
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	pub fn with_test_mode(mut self, test_mode: bool) -> Self {
		self.test_mode = test_mode;
		self
	}

	pub fn has_api_key(&self) -> bool {
		self.api_key.as_deref().is_some_and(|k| !k.is_empty())
	}
}

impl Default for ProviderRuntimeConfig {
	fn default() -> Self {
		Self::new(None)
	}
}
