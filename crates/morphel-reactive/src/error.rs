//! Error types for the reactive engine.

use thiserror::Error;

use crate::path::ObservablePath;

/// Errors that can occur while reading or writing observable data.
#[derive(Debug, Error)]
pub enum ReactiveError {
	/// The observable path no longer resolves inside its root value.
	///
	/// This happens when an ancestor was replaced by a scalar or removed
	/// after the wrapper was created.
	#[error("Observable path not found: {0}")]
	PathNotFound(ObservablePath),

	/// A keyed write targeted a value that is neither an object nor an array.
	#[error("Observable at {0} is not an object or array")]
	NotAContainer(ObservablePath),

	/// An array write used a segment that is not a decimal index.
	#[error("Invalid array index `{key}` at {path}")]
	InvalidIndex {
		/// Path of the array.
		path: ObservablePath,
		/// The offending key.
		key: String,
	},

	/// An array write skipped past the end of the array.
	#[error("Index {index} out of bounds for array of length {len} at {path}")]
	IndexOutOfBounds {
		/// Path of the array.
		path: ObservablePath,
		/// Requested index.
		index: usize,
		/// Current array length.
		len: usize,
	},

	/// A tracked value could not be converted to the requested type.
	#[error("Failed to deserialize value at {path}: {source}")]
	Deserialize {
		/// Path that was read.
		path: ObservablePath,
		/// Underlying serde error.
		#[source]
		source: serde_json::Error,
	},

	/// Runtime configuration could not be parsed.
	#[error("Invalid runtime configuration: {0}")]
	Config(#[from] toml::de::Error),
}

/// Result type alias for reactive operations.
pub type ReactiveResult<T> = Result<T, ReactiveError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_error_messages_name_the_path() {
		let path = ObservablePath::new("cart").child("items");

		let err = ReactiveError::NotAContainer(path.clone());
		assert_eq!(
			err.to_string(),
			"Observable at cart/items is not an object or array"
		);

		let err = ReactiveError::IndexOutOfBounds {
			path,
			index: 5,
			len: 2,
		};
		assert_eq!(
			err.to_string(),
			"Index 5 out of bounds for array of length 2 at cart/items"
		);
	}
}
