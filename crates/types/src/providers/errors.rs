//! Error types for provider operations
//!
//! Expected absence (unsupported pair, amount out of bounds) is not an
//! error: `quote` returns `Ok(None)` for those. Everything here is a
//! transport-level or configuration-level fault.

use thiserror::Error;

/// Provider operation errors
#[derive(Error, Debug)]
pub enum ProviderError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Timeout occurred after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("HTTP {status_code}: {reason}")]
	HttpStatus { status_code: u16, reason: String },

	#[error("Invalid response format: {reason}")]
	InvalidResponse { reason: String },

	#[error("Provider returned error: {code} - {message}")]
	Api { code: String, message: String },

	#[error("Missing credentials for provider {provider}")]
	MissingCredentials { provider: String },

	#[error("Provider not found: {provider}")]
	NotFound { provider: String },

	#[error("Unsupported operation: {operation} for provider {provider}")]
	Unsupported { operation: String, provider: String },

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
	/// Extract the HTTP status code when the error carries one
	pub fn status_code(&self) -> Option<u16> {
		match self {
			ProviderError::HttpStatus { status_code, .. } => Some(*status_code),
			ProviderError::Http(e) => e.status().map(|s| s.as_u16()),
			_ => None,
		}
	}

	/// Build an HTTP failure with an explicit reason
	pub fn http_failure(status_code: u16, reason: impl Into<String>) -> Self {
		Self::HttpStatus {
			status_code,
			reason: reason.into(),
		}
	}

	pub fn invalid_response(reason: impl Into<String>) -> Self {
		Self::InvalidResponse {
			reason: reason.into(),
		}
	}

	pub fn is_timeout(&self) -> bool {
		match self {
			ProviderError::Timeout { .. } => true,
			ProviderError::Http(e) => e.is_timeout(),
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_code_extraction() {
		let error = ProviderError::http_failure(404, "Not Found");
		assert_eq!(error.status_code(), Some(404));

		let error = ProviderError::invalid_response("bad shape");
		assert_eq!(error.status_code(), None);
	}

	#[test]
	fn test_timeout_detection() {
		let error = ProviderError::Timeout { timeout_ms: 30_000 };
		assert!(error.is_timeout());
		assert!(error.to_string().contains("30000ms"));

		let error = ProviderError::http_failure(500, "whoops");
		assert!(!error.is_timeout());
	}
}
