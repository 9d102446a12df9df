//! Runtime configuration.
//!
//! ```toml
//! cascade_invalidation = true
//! settle_limit = 64
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ReactiveResult;

/// Tunables of the reactive [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
	/// Re-render instances mounted under an invalidated instance as well.
	///
	/// Descendants may interpolate their parent's state, so this is on by
	/// default. Disabling it restricts re-renders to direct subscribers.
	pub cascade_invalidation: bool,

	/// Maximum number of turn + frame rounds a settle loop runs before it
	/// gives up on a component graph that keeps invalidating itself.
	pub settle_limit: usize,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			cascade_invalidation: true,
			settle_limit: 64,
		}
	}
}

impl RuntimeConfig {
	/// Parses a configuration from TOML. Missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> ReactiveResult<Self> {
		Ok(toml::from_str(source)?)
	}
}
