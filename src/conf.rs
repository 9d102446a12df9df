//! Settings loading.
//!
//! Settings are an [`AppConfig`] read from a TOML file, then overridden by
//! `MORPHEL_*` environment variables:
//!
//! | Variable                       | Field                            |
//! |--------------------------------|----------------------------------|
//! | `MORPHEL_STASH_PREFIX`         | `stash_prefix`                   |
//! | `MORPHEL_SKIP_IDENTICAL`       | `skip_identical_renders`         |
//! | `MORPHEL_WARN_DUPLICATE_KEYS`  | `warn_duplicate_keys`            |
//! | `MORPHEL_CASCADE_INVALIDATION` | `runtime.cascade_invalidation`   |
//! | `MORPHEL_SETTLE_LIMIT`         | `runtime.settle_limit`           |
//!
//! A missing file is not an error; it yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

pub use morphel_pages::AppConfig;

/// Environment variable naming the settings file for [`Settings::from_env`].
pub const CONFIG_PATH_VAR: &str = "MORPHEL_CONFIG";

/// Error type for settings loading
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Invalid TOML in {path}: {source}")]
	Toml {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid value `{value}` for {name}")]
	Env { name: String, value: String },
}

/// Settings loader.
pub struct Settings;

impl Settings {
	/// Loads settings from `path`, then applies the process environment.
	pub fn from_file(path: impl AsRef<Path>) -> Result<AppConfig, SettingsError> {
		let config = load_file(path.as_ref())?;
		apply_env(config, std::env::vars())
	}

	/// Loads settings from the file named by `MORPHEL_CONFIG` (defaults when
	/// unset), then applies the process environment.
	pub fn from_env() -> Result<AppConfig, SettingsError> {
		match std::env::var_os(CONFIG_PATH_VAR) {
			Some(path) => Self::from_file(PathBuf::from(path)),
			None => apply_env(AppConfig::default(), std::env::vars()),
		}
	}

	/// Parses settings from TOML text without consulting the environment.
	pub fn from_toml_str(source: &str) -> Result<AppConfig, SettingsError> {
		toml::from_str(source).map_err(|source| SettingsError::Toml {
			path: PathBuf::from("<string>"),
			source,
		})
	}
}

fn load_file(path: &Path) -> Result<AppConfig, SettingsError> {
	if !path.exists() {
		tracing::debug!(path = %path.display(), "settings file not found; using defaults");
		return Ok(AppConfig::default());
	}
	let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	toml::from_str(&content).map_err(|source| SettingsError::Toml {
		path: path.to_path_buf(),
		source,
	})
}

/// Applies `MORPHEL_*` overrides from `vars` to `config`.
///
/// Unrelated variables are ignored.
pub fn apply_env<I>(mut config: AppConfig, vars: I) -> Result<AppConfig, SettingsError>
where
	I: IntoIterator<Item = (String, String)>,
{
	for (name, value) in vars {
		match name.as_str() {
			"MORPHEL_STASH_PREFIX" => config.stash_prefix = value,
			"MORPHEL_SKIP_IDENTICAL" => config.skip_identical_renders = parse_bool(&name, &value)?,
			"MORPHEL_WARN_DUPLICATE_KEYS" => config.warn_duplicate_keys = parse_bool(&name, &value)?,
			"MORPHEL_CASCADE_INVALIDATION" => {
				config.runtime.cascade_invalidation = parse_bool(&name, &value)?
			}
			"MORPHEL_SETTLE_LIMIT" => {
				config.runtime.settle_limit = value.parse().map_err(|_| SettingsError::Env {
					name: name.clone(),
					value: value.clone(),
				})?
			}
			_ => continue,
		}
		tracing::debug!(name = %name, "applied settings override");
	}
	Ok(config)
}

fn parse_bool(name: &str, value: &str) -> Result<bool, SettingsError> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(SettingsError::Env {
			name: name.to_string(),
			value: value.to_string(),
		}),
	}
}
