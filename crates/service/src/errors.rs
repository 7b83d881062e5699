//! Service-level errors

use rateshop_types::ProviderError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
	/// Every provider is unregistered, credential-disabled, or health-disabled
	#[error("No providers available to serve the request")]
	NoProvidersAvailable,

	#[error("Provider '{provider}' not found")]
	ProviderNotFound { provider: String },

	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),
}

impl ServiceError {
	pub fn provider_not_found(provider: impl Into<String>) -> Self {
		Self::ProviderNotFound {
			provider: provider.into(),
		}
	}
}
