//! Rateshop Config
//!
//! Settings structures and loading for the rate-shopping core. Configuration
//! comes from an optional file (via the `config` crate) overlaid with
//! environment variables; per-provider API keys only ever come from the
//! environment.

pub mod loader;
pub mod settings;

pub use loader::{load_config, ConfigError};
pub use settings::{
	HealthSettings, LogFormat, LoggingSettings, ProviderSettings, Settings,
};
