//! Observable paths.
//!
//! An [`ObservablePath`] addresses one location inside a reactive object
//! graph as a `/`-joined list of property steps, e.g. `cart/items/0/price`.
//! Paths are the subscription keys of the dependency registry.
//!
//! Array index segments are positional: inserting or removing an element
//! shifts the paths of every later element. Re-rendering reads fresh values,
//! so this only affects which writes wake which readers, never correctness.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// A `/`-joined sequence of property-access steps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservablePath(String);

impl ObservablePath {
	/// Creates a root path.
	pub fn new(root: impl Into<String>) -> Self {
		Self(root.into())
	}

	/// Returns the path of the property `key` below this path.
	///
	/// # Example
	///
	/// ```
	/// use morphel_reactive::ObservablePath;
	///
	/// let path = ObservablePath::new("cart").child("items").child("0");
	/// assert_eq!(path.as_str(), "cart/items/0");
	/// ```
	pub fn child(&self, key: &str) -> Self {
		let mut path = String::with_capacity(self.0.len() + key.len() + 1);
		path.push_str(&self.0);
		path.push(SEPARATOR);
		path.push_str(key);
		Self(path)
	}

	/// Returns the enclosing path, or `None` for a root path.
	pub fn parent(&self) -> Option<Self> {
		self.0
			.rsplit_once(SEPARATOR)
			.map(|(parent, _)| Self(parent.to_string()))
	}

	/// Returns the last step of the path.
	pub fn last(&self) -> &str {
		self.0
			.rsplit_once(SEPARATOR)
			.map_or(self.0.as_str(), |(_, last)| last)
	}

	/// Iterates over the steps of the path.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split(SEPARATOR)
	}

	/// Returns `true` if `self` equals `other` or lies below it.
	pub fn starts_with(&self, other: &ObservablePath) -> bool {
		self.0 == other.0
			|| (self.0.starts_with(&other.0)
				&& self.0[other.0.len()..].starts_with(SEPARATOR))
	}

	/// Returns the path as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ObservablePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ObservablePath {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl From<String> for ObservablePath {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl AsRef<str> for ObservablePath {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_child_and_parent() {
		let root = ObservablePath::new("root");
		let price = root.child("items").child("0").child("price");

		assert_eq!(price.as_str(), "root/items/0/price");
		assert_eq!(price.last(), "price");
		assert_eq!(price.parent(), Some(root.child("items").child("0")));
		assert_eq!(root.parent(), None);
		assert_eq!(root.last(), "root");
	}

	#[rstest]
	fn test_segments() {
		let path = ObservablePath::from("a/b/c");
		assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
	}

	#[rstest]
	#[case("cart/items", "cart", true)]
	#[case("cart/items/0", "cart/items", true)]
	#[case("cart", "cart", true)]
	#[case("cartography", "cart", false)]
	#[case("cart", "cart/items", false)]
	fn test_starts_with(#[case] path: &str, #[case] prefix: &str, #[case] expected: bool) {
		assert_eq!(
			ObservablePath::from(path).starts_with(&ObservablePath::from(prefix)),
			expected
		);
	}
}
