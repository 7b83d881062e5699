//! Configuration loading utilities

use crate::Settings;
use config::{Config, File};

pub use config::ConfigError;

/// Load configuration from the optional config file, overlaid with
/// environment variables. Missing file means defaults; missing API keys mean
/// the affected providers come up disabled rather than erroring.
pub fn load_config() -> Result<Settings, ConfigError> {
	let s = Config::builder()
		.add_source(File::with_name("config/config").required(false))
		.build()?;

	let settings: Settings = s.try_deserialize()?;
	Ok(settings.overlay_env())
}
