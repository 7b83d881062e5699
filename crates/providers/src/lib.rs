//! Rateshop Providers
//!
//! One adapter per third-party swap service, all implementing the uniform
//! [`SwapProvider`] contract, plus the process-wide [`ProviderRegistry`].
//!
//! Currency and network naming is provider-specific; each adapter owns its
//! private translation tables and they are deliberately never shared.

pub mod changenow;
pub mod simpleswap;
pub mod stealthex;

mod http;

pub use changenow::ChangeNowProvider;
pub use simpleswap::SimpleSwapProvider;
pub use stealthex::StealthExProvider;

pub use rateshop_types::{ProviderError, ProviderResult, SwapProvider};

use rateshop_config::Settings;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Collection of provider adapters, keyed by provider id.
///
/// Explicitly constructed and passed to the services that need it, so tests
/// can run isolated instances side by side.
#[derive(Debug)]
pub struct ProviderRegistry {
	providers: HashMap<String, Arc<dyn SwapProvider>>,
}

impl ProviderRegistry {
	/// Create an empty registry
	pub fn new() -> Self {
		Self {
			providers: HashMap::new(),
		}
	}

	/// Create a registry populated with the default adapter set, configured
	/// from settings. Providers administratively disabled in settings are
	/// not registered at all; providers lacking required credentials are
	/// registered but report `enabled() == false`.
	pub fn with_defaults(settings: &Settings) -> Self {
		let mut registry = Self::new();

		if settings.provider(changenow::PROVIDER_ID).enabled {
			registry.register(Arc::new(ChangeNowProvider::new(
				settings.provider_runtime(changenow::PROVIDER_ID),
			)));
		}
		if settings.provider(simpleswap::PROVIDER_ID).enabled {
			registry.register(Arc::new(SimpleSwapProvider::new(
				settings.provider_runtime(simpleswap::PROVIDER_ID),
			)));
		}
		if settings.provider(stealthex::PROVIDER_ID).enabled {
			registry.register(Arc::new(StealthExProvider::new(
				settings.provider_runtime(stealthex::PROVIDER_ID),
			)));
		}

		info!(
			"Provider registry initialized with {} provider(s), {} enabled",
			registry.len(),
			registry.enabled().len()
		);

		registry
	}

	/// Register an adapter under its own id, replacing any previous entry
	pub fn register(&mut self, provider: Arc<dyn SwapProvider>) {
		debug!(
			"Registering provider '{}' (enabled: {})",
			provider.id(),
			provider.enabled()
		);
		self.providers.insert(provider.id().to_string(), provider);
	}

	/// Remove an adapter, returning it if it was registered
	pub fn unregister(&mut self, provider_id: &str) -> Option<Arc<dyn SwapProvider>> {
		self.providers.remove(provider_id)
	}

	pub fn get(&self, provider_id: &str) -> Option<Arc<dyn SwapProvider>> {
		self.providers.get(provider_id).cloned()
	}

	pub fn has(&self, provider_id: &str) -> bool {
		self.providers.contains_key(provider_id)
	}

	/// Point-in-time snapshot of every registered adapter
	pub fn all(&self) -> Vec<Arc<dyn SwapProvider>> {
		self.providers.values().cloned().collect()
	}

	/// Point-in-time snapshot of adapters with credentials configured.
	/// Health-based exclusion is layered on top by the rate shopper.
	pub fn enabled(&self) -> Vec<Arc<dyn SwapProvider>> {
		self.providers
			.values()
			.filter(|p| p.enabled())
			.cloned()
			.collect()
	}

	pub fn ids(&self) -> Vec<String> {
		self.providers.keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.providers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}
}

impl Default for ProviderRegistry {
	fn default() -> Self {
		Self::new()
	}
}
