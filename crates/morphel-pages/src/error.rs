//! Error types for the component shell.

use morphel_reactive::ReactiveError;
use thiserror::Error;

use crate::dom::HostError;

/// Errors raised while defining, mounting or rendering components.
#[derive(Debug, Error)]
pub enum PagesError {
	/// Observable access failed.
	#[error(transparent)]
	Reactive(#[from] ReactiveError),

	/// The host tree rejected an operation.
	#[error(transparent)]
	Host(#[from] HostError),

	/// The tag is not registered.
	#[error("Unknown component tag: {0}")]
	UnknownComponent(String),

	/// The tag is registered already.
	#[error("Component tag `{0}` is already defined")]
	AlreadyDefined(String),

	/// Component tags must contain a hyphen, like custom element names.
	#[error("Invalid component tag `{0}`: tags must be lowercase and contain a hyphen")]
	InvalidTag(String),

	/// The configuration could not be parsed.
	#[error("Invalid configuration: {0}")]
	Config(#[from] toml::de::Error),

	/// Updates kept scheduling further updates.
	#[error("Updates did not settle within {limit} rounds")]
	Unsettled {
		/// The configured round limit.
		limit: usize,
	},
}

/// Result type for component shell operations.
pub type PagesResult<T> = Result<T, PagesError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_messages() {
		assert_eq!(
			PagesError::UnknownComponent("x-nope".to_string()).to_string(),
			"Unknown component tag: x-nope"
		);
		assert_eq!(
			PagesError::Unsettled { limit: 3 }.to_string(),
			"Updates did not settle within 3 rounds"
		);
		let host: PagesError = HostError::Detached.into();
		assert_eq!(host.to_string(), HostError::Detached.to_string());
	}
}
