//! Property values.
//!
//! [`Prop`] is what a host node property can hold: the primitives a markup
//! attribute can carry as text, plus the non-serializable values (callbacks,
//! observables, shared objects) that travel through the stash.

use core::any::Any;
use core::fmt;
use std::rc::Rc;

use morphel_reactive::{Observable, TargetId, Tracked};
use serde_json::Value;

use crate::callback::Callback;

/// A node property value.
#[derive(Clone, Default)]
pub enum Prop {
	/// No value.
	#[default]
	Null,
	/// A boolean.
	Bool(bool),
	/// A number.
	Number(f64),
	/// A string.
	Text(String),
	/// An event handler.
	Callback(Callback),
	/// A tracked data graph.
	Observable(Observable),
	/// Any other shared value.
	Object(Rc<dyn Any>),
}

/// Identity under which a non-primitive [`Prop`] is stashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropIdentity {
	/// Closure allocation address.
	Callback(usize),
	/// Underlying observable value.
	Observable(TargetId),
	/// Object allocation address.
	Object(usize),
}

impl Prop {
	/// Wraps an arbitrary value as a shared object.
	pub fn object<T: Any>(value: T) -> Self {
		Self::Object(Rc::new(value))
	}

	/// Returns the stash identity of non-primitive values.
	pub fn identity(&self) -> Option<PropIdentity> {
		match self {
			Self::Callback(callback) => Some(PropIdentity::Callback(callback.addr())),
			Self::Observable(observable) => Some(PropIdentity::Observable(observable.target_id())),
			Self::Object(object) => Some(PropIdentity::Object(
				Rc::as_ptr(object) as *const () as usize,
			)),
			Self::Null | Self::Bool(_) | Self::Number(_) | Self::Text(_) => None,
		}
	}

	/// Returns `true` for values that can be written as attribute text.
	pub fn is_primitive(&self) -> bool {
		self.identity().is_none()
	}

	/// Returns `true` for [`Prop::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Self::Number(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(value) => Some(value),
			_ => None,
		}
	}

	pub fn as_callback(&self) -> Option<&Callback> {
		match self {
			Self::Callback(callback) => Some(callback),
			_ => None,
		}
	}

	pub fn as_observable(&self) -> Option<&Observable> {
		match self {
			Self::Observable(observable) => Some(observable),
			_ => None,
		}
	}

	/// Downcasts a shared object.
	pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
		match self {
			Self::Object(object) => object.clone().downcast::<T>().ok(),
			_ => None,
		}
	}

	/// Text form of a primitive, as written into an attribute.
	///
	/// Returns `None` for values that must be stashed.
	pub fn to_attribute_text(&self) -> Option<String> {
		match self {
			Self::Null => Some(String::new()),
			Self::Bool(value) => Some(value.to_string()),
			Self::Number(value) => Some(format_number(*value)),
			Self::Text(value) => Some(value.clone()),
			Self::Callback(_) | Self::Observable(_) | Self::Object(_) => None,
		}
	}

	/// Short name of the variant, for error messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "boolean",
			Self::Number(_) => "number",
			Self::Text(_) => "string",
			Self::Callback(_) => "callback",
			Self::Observable(_) => "observable",
			Self::Object(_) => "object",
		}
	}
}

/// Formats a number the way markup shows it: integral values without a
/// fractional part, non-finite values as empty text.
pub(crate) fn format_number(value: f64) -> String {
	if value.is_finite() {
		value.to_string()
	} else {
		String::new()
	}
}

impl PartialEq for Prop {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Number(a), Self::Number(b)) => a == b,
			(Self::Text(a), Self::Text(b)) => a == b,
			(Self::Callback(a), Self::Callback(b)) => a.ptr_eq(b),
			(Self::Observable(a), Self::Observable(b)) => a.same_target(b),
			(Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for Prop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("Null"),
			Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			Self::Number(value) => f.debug_tuple("Number").field(value).finish(),
			Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
			Self::Callback(callback) => f.debug_tuple("Callback").field(callback).finish(),
			Self::Observable(observable) => f.debug_tuple("Observable").field(observable.path()).finish(),
			Self::Object(_) => f.debug_tuple("Object").field(&"<any>").finish(),
		}
	}
}

impl From<bool> for Prop {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

macro_rules! impl_from_number {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Prop {
				fn from(value: $ty) -> Self {
					Self::Number(value as f64)
				}
			}
		)*
	};
}

impl_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<&str> for Prop {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for Prop {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<Callback> for Prop {
	fn from(value: Callback) -> Self {
		Self::Callback(value)
	}
}

impl From<Observable> for Prop {
	fn from(value: Observable) -> Self {
		Self::Observable(value)
	}
}

impl From<Value> for Prop {
	fn from(value: Value) -> Self {
		match value {
			Value::Null => Self::Null,
			Value::Bool(value) => Self::Bool(value),
			Value::Number(number) => number.as_f64().map_or(Self::Null, Self::Number),
			Value::String(text) => Self::Text(text),
			other @ (Value::Array(_) | Value::Object(_)) => Self::object(other),
		}
	}
}

impl From<Tracked> for Prop {
	fn from(value: Tracked) -> Self {
		match value {
			Tracked::Value(value) => value.into(),
			Tracked::Observable(observable) => Self::Observable(observable),
		}
	}
}

impl<T: Into<Prop>> From<Option<T>> for Prop {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::callback::Event;
	use morphel_reactive::Runtime;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(Prop::Null, Some(""))]
	#[case(Prop::Bool(true), Some("true"))]
	#[case(Prop::Number(30.0), Some("30"))]
	#[case(Prop::Number(2.5), Some("2.5"))]
	#[case(Prop::Number(f64::NAN), Some(""))]
	#[case(Prop::from("pen"), Some("pen"))]
	#[case(Prop::from(Callback::new(|_: &Event| {})), None)]
	fn test_attribute_text(#[case] prop: Prop, #[case] expected: Option<&str>) {
		assert_eq!(prop.to_attribute_text().as_deref(), expected);
	}

	#[rstest]
	fn test_observable_identity_ignores_rewrapping() {
		let runtime = Runtime::new();
		let state = Observable::new(&runtime, json!({ "item": { "price": 1 } }));
		let a = Prop::from(state.get("item").into_observable().unwrap());
		let b = Prop::from(state.get("item").into_observable().unwrap());

		assert_eq!(a.identity(), b.identity());
		assert_eq!(a, b);
	}

	#[rstest]
	fn test_downcast_object() {
		#[derive(Debug, PartialEq)]
		struct Point(i32, i32);

		let prop = Prop::object(Point(1, 2));
		assert_eq!(prop.downcast::<Point>().as_deref(), Some(&Point(1, 2)));
		assert!(prop.downcast::<String>().is_none());
		assert!(!prop.is_primitive());
	}

	#[rstest]
	fn test_from_json() {
		assert_eq!(Prop::from(json!(3)), Prop::Number(3.0));
		assert_eq!(Prop::from(json!("x")), Prop::Text("x".to_string()));
		assert!(Prop::from(json!(null)).is_null());
		assert!(Prop::from(json!([1])).downcast::<Value>().is_some());
	}
}
