//! Configuration settings structures

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use rateshop_types::providers::DEFAULT_TIMEOUT_MS;
use rateshop_types::ProviderRuntimeConfig;

/// Environment variable names for provider API keys, by provider id
const PROVIDER_KEY_VARS: &[(&str, &str)] = &[
	("changenow", "CHANGENOW_API_KEY"),
	("simpleswap", "SIMPLESWAP_API_KEY"),
	("stealthex", "STEALTHEX_API_KEY"),
];

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
	/// Default per-call timeout for every provider, in milliseconds
	pub timeout_ms: u64,

	/// Nominal withdraw amount used for pair-support probes
	pub quote_probe_amount: Decimal,

	/// Per-provider overrides, keyed by provider id
	pub providers: HashMap<String, ProviderSettings>,

	pub health: HealthSettings,
	pub logging: LoggingSettings,
}

/// Individual provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
	/// API key; usually supplied via environment, not the config file
	pub api_key: Option<String>,
	/// Administratively exclude this provider regardless of credentials
	pub enabled: bool,
	/// Per-provider timeout override in milliseconds
	pub timeout_ms: Option<u64>,
	/// Route calls at the provider's sandbox where one exists
	pub test_mode: bool,
}

impl Default for ProviderSettings {
	fn default() -> Self {
		Self {
			api_key: None,
			enabled: true,
			timeout_ms: None,
			test_mode: false,
		}
	}
}

/// Thresholds for the provider health state machine
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HealthSettings {
	/// No auto-disable decisions below this many total requests
	pub min_sample_size: u64,
	/// Consecutive failures that trip auto-disable
	pub max_consecutive_failures: u32,
	/// Success rate below which auto-disable trips
	pub disable_success_rate: f64,
	/// Success rate required for auto-re-enable
	pub reenable_success_rate: f64,
	/// Minimum total requests before auto-re-enable is considered
	pub reenable_min_requests: u64,
	/// Timeout for the lightweight liveness probe, in milliseconds
	pub probe_timeout_ms: u64,
}

impl Default for HealthSettings {
	fn default() -> Self {
		Self {
			min_sample_size: 10,
			max_consecutive_failures: 5,
			disable_success_rate: 0.7,
			reenable_success_rate: 0.9,
			reenable_min_requests: 10,
			probe_timeout_ms: 5_000,
		}
	}
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Compact,
		}
	}
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			timeout_ms: DEFAULT_TIMEOUT_MS,
			quote_probe_amount: dec!(100),
			providers: HashMap::new(),
			health: HealthSettings::default(),
			logging: LoggingSettings::default(),
		}
	}
}

impl Settings {
	/// Overlay environment variables onto these settings.
	///
	/// Recognized variables: `RATESHOP_TIMEOUT_MS` plus one API-key variable
	/// per known provider (`CHANGENOW_API_KEY`, `SIMPLESWAP_API_KEY`,
	/// `STEALTHEX_API_KEY`). A key already present in the file is kept
	/// unless the environment supplies one.
	pub fn overlay_env(mut self) -> Self {
		if let Ok(raw) = std::env::var("RATESHOP_TIMEOUT_MS") {
			match raw.parse() {
				Ok(ms) => self.timeout_ms = ms,
				Err(_) => {
					tracing::warn!("Ignoring unparseable RATESHOP_TIMEOUT_MS: {}", raw)
				},
			}
		}

		for (provider_id, var) in PROVIDER_KEY_VARS {
			if let Ok(key) = std::env::var(var) {
				if !key.is_empty() {
					self.providers
						.entry(provider_id.to_string())
						.or_default()
						.api_key = Some(key);
				}
			}
		}

		self
	}

	/// Settings for one provider, falling back to defaults when the provider
	/// has no explicit section
	pub fn provider(&self, provider_id: &str) -> ProviderSettings {
		self.providers.get(provider_id).cloned().unwrap_or_default()
	}

	/// Build the runtime config handed to an adapter at construction time
	pub fn provider_runtime(&self, provider_id: &str) -> ProviderRuntimeConfig {
		let provider = self.provider(provider_id);
		ProviderRuntimeConfig {
			api_key: provider.api_key,
			timeout_ms: provider.timeout_ms.unwrap_or(self.timeout_ms),
			test_mode: provider.test_mode,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let settings = Settings::default();
		assert_eq!(settings.timeout_ms, 30_000);
		assert_eq!(settings.health.min_sample_size, 10);
		assert_eq!(settings.health.max_consecutive_failures, 5);
		assert!((settings.health.disable_success_rate - 0.7).abs() < f64::EPSILON);
	}

	#[test]
	fn test_provider_runtime_inherits_global_timeout() {
		let settings = Settings::default();
		let runtime = settings.provider_runtime("changenow");
		assert_eq!(runtime.timeout_ms, 30_000);
		assert!(runtime.api_key.is_none());
	}

	#[test]
	fn test_provider_timeout_override() {
		let mut settings = Settings::default();
		settings.providers.insert(
			"stealthex".to_string(),
			ProviderSettings {
				timeout_ms: Some(10_000),
				..Default::default()
			},
		);

		assert_eq!(settings.provider_runtime("stealthex").timeout_ms, 10_000);
		assert_eq!(settings.provider_runtime("simpleswap").timeout_ms, 30_000);
	}

	#[test]
	fn test_env_overlay() {
		std::env::set_var("CHANGENOW_API_KEY", "from-env");
		std::env::set_var("RATESHOP_TIMEOUT_MS", "12000");

		let settings = Settings::default().overlay_env();

		std::env::remove_var("CHANGENOW_API_KEY");
		std::env::remove_var("RATESHOP_TIMEOUT_MS");

		assert_eq!(
			settings.provider("changenow").api_key.as_deref(),
			Some("from-env")
		);
		assert_eq!(settings.timeout_ms, 12_000);
		assert!(settings.provider("simpleswap").api_key.is_none());
	}

	#[test]
	fn test_settings_deserialize_partial() {
		let settings: Settings = serde_json::from_str(
			r#"{
				"timeout_ms": 15000,
				"providers": { "changenow": { "test_mode": true } }
			}"#,
		)
		.unwrap();

		assert_eq!(settings.timeout_ms, 15_000);
		assert!(settings.provider("changenow").test_mode);
		assert!(settings.provider("changenow").enabled);
		assert_eq!(settings.health.reenable_min_requests, 10);
	}
}
