//! Application configuration.
//!
//! ```toml
//! stash_prefix = "el"
//! skip_identical_renders = true
//! warn_duplicate_keys = true
//!
//! [runtime]
//! cascade_invalidation = true
//! settle_limit = 64
//! ```

use morphel_reactive::RuntimeConfig;
use serde::{Deserialize, Serialize};

use crate::error::PagesResult;

/// Tunables of an [`App`](crate::App).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Configuration of the underlying reactive runtime.
	pub runtime: RuntimeConfig,

	/// Prefix of stash keys (`<prefix>:<n>`).
	pub stash_prefix: String,

	/// Skip reconciliation when a render produces exactly the previous markup.
	pub skip_identical_renders: bool,

	/// Log one warning per tag when several instances lack a `key`.
	pub warn_duplicate_keys: bool,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			runtime: RuntimeConfig::default(),
			stash_prefix: "el".to_string(),
			skip_identical_renders: true,
			warn_duplicate_keys: true,
		}
	}
}

impl AppConfig {
	/// Parses a configuration from TOML. Missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> PagesResult<Self> {
		Ok(toml::from_str(source)?)
	}
}
