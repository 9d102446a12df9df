//! Observable data.
//!
//! [`Observable`] wraps a JSON-shaped value graph. Every read through the
//! wrapper registers the active render context against the path that was
//! read; every write notifies the subscribers of the path that was written.
//!
//! ## Reads
//!
//! - [`Observable::get`] on a scalar (including `null`) tracks `path/key`
//!   and returns the value.
//! - [`Observable::get`] on an object or array returns a child wrapper whose
//!   path is one step deeper, so nested reads build progressively deeper
//!   paths. The container path itself is tracked too, so replacing the whole
//!   container wakes readers that went through it.
//! - Structural accessors ([`Observable::len`], [`Observable::keys`],
//!   [`Observable::is_empty`]) track `path/length` and return plain values.
//! - [`Observable::target`] is the escape hatch: the raw value, untracked.
//!
//! ## Writes
//!
//! [`Observable::set`], [`Observable::push`] and [`Observable::remove`]
//! mutate the underlying value first and then notify `path/key` (plus
//! `path/length` when the shape grew or shrank).
//!
//! ## Example
//!
//! ```
//! use morphel_reactive::{Observable, Runtime};
//! use serde_json::json;
//!
//! let runtime = Runtime::new();
//! let cart = Observable::new(&runtime, json!({ "items": [{ "price": 20 }] }));
//!
//! let first = cart.get("items").into_observable().unwrap().get("0").into_observable().unwrap();
//! assert_eq!(first.path().as_str(), format!("{}/items/0", cart.path()));
//!
//! first.set("price", 30).unwrap();
//! assert_eq!(first.get("price").as_f64(), Some(30.0));
//! ```

use core::cmp::Ordering;
use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ReactiveError, ReactiveResult};
use crate::path::ObservablePath;
use crate::runtime::Runtime;

/// Pseudo-key tracked by structural accessors and notified when a
/// container grows or shrinks.
pub const LENGTH: &str = "length";

struct ObservableRoot {
	id: u64,
	value: RefCell<Value>,
}

/// Identity of the value behind a wrapper.
///
/// Two wrappers created for the same location of the same root compare
/// equal here even though they are distinct wrapper values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId {
	root: u64,
	path: ObservablePath,
}

impl TargetId {
	/// Returns the id of the root value.
	pub fn root(&self) -> u64 {
		self.root
	}

	/// Returns the path of the location inside the root.
	pub fn path(&self) -> &ObservablePath {
		&self.path
	}
}

/// A tracked wrapper around an object or array.
#[derive(Clone)]
pub struct Observable {
	runtime: Runtime,
	root: Rc<ObservableRoot>,
	/// Keys from the root value down to this location.
	steps: Vec<String>,
	path: ObservablePath,
}

/// The outcome of a tracked read.
#[derive(Debug, Clone)]
pub enum Tracked {
	/// A scalar (or missing, read as `null`) value.
	Value(Value),
	/// A nested object or array.
	Observable(Observable),
}

impl Tracked {
	/// Returns the scalar value, if this is one.
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			Self::Observable(_) => None,
		}
	}

	/// Returns the nested wrapper, if this is one.
	pub fn into_observable(self) -> Option<Observable> {
		match self {
			Self::Observable(observable) => Some(observable),
			Self::Value(_) => None,
		}
	}

	/// Converts to a plain value, unwrapping nested wrappers untracked.
	pub fn into_value(self) -> Value {
		match self {
			Self::Value(value) => value,
			Self::Observable(observable) => observable.target(),
		}
	}

	/// Returns the value as `f64`, if it is a number.
	pub fn as_f64(&self) -> Option<f64> {
		self.as_value().and_then(Value::as_f64)
	}

	/// Returns the value as `i64`, if it is an integer.
	pub fn as_i64(&self) -> Option<i64> {
		self.as_value().and_then(Value::as_i64)
	}

	/// Returns the value as a string slice, if it is a string.
	pub fn as_str(&self) -> Option<&str> {
		self.as_value().and_then(Value::as_str)
	}

	/// Returns the value as `bool`, if it is a boolean.
	pub fn as_bool(&self) -> Option<bool> {
		self.as_value().and_then(Value::as_bool)
	}

	/// Returns `true` for `null` and missing values.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Value(Value::Null))
	}
}

/// Wraps `value` found at `path`.
///
/// Objects and arrays become a new [`Observable`] rooted at `path`. Any
/// other value, `null` included, is tracked at `path` and returned as is.
pub fn observable(runtime: &Runtime, value: Value, path: ObservablePath) -> Tracked {
	if is_container(&value) {
		Tracked::Observable(Observable::at(runtime, value, path))
	} else {
		runtime.track(&path);
		Tracked::Value(value)
	}
}

impl Observable {
	/// Wraps `value` under a freshly generated root path.
	pub fn new(runtime: &Runtime, value: Value) -> Self {
		let id = runtime.next_root_id();
		Self::with_root(runtime, id, value, ObservablePath::new(format!("o{id}")))
	}

	/// Wraps `value` under an explicit root path.
	pub fn at(runtime: &Runtime, value: Value, path: impl Into<ObservablePath>) -> Self {
		let id = runtime.next_root_id();
		Self::with_root(runtime, id, value, path.into())
	}

	fn with_root(runtime: &Runtime, id: u64, value: Value, path: ObservablePath) -> Self {
		Self {
			runtime: runtime.clone(),
			root: Rc::new(ObservableRoot {
				id,
				value: RefCell::new(value),
			}),
			steps: Vec::new(),
			path,
		}
	}

	fn child(&self, key: &str) -> Self {
		let mut steps = self.steps.clone();
		steps.push(key.to_string());
		Self {
			runtime: self.runtime.clone(),
			root: self.root.clone(),
			steps,
			path: self.path.child(key),
		}
	}

	/// Returns the path of this wrapper.
	pub fn path(&self) -> &ObservablePath {
		&self.path
	}

	/// Returns the runtime this wrapper reports to.
	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}

	/// Tracked read of `key`.
	pub fn get(&self, key: &str) -> Tracked {
		let path = self.path.child(key);
		let found = {
			let root = self.root.value.borrow();
			match resolve(&root, &self.steps).and_then(|value| lookup(value, key)) {
				Some(value) if is_container(value) => None,
				Some(value) => Some(value.clone()),
				None => Some(Value::Null),
			}
		};

		self.runtime.track(&path);
		match found {
			Some(value) => Tracked::Value(value),
			None => Tracked::Observable(self.child(key)),
		}
	}

	/// Tracked read of `key`, deserialized into `T`.
	///
	/// Objects and arrays are deserialized whole; the read is tracked at
	/// `path/key` only.
	pub fn read<T: DeserializeOwned>(&self, key: &str) -> ReactiveResult<T> {
		let path = self.path.child(key);
		self.runtime.track(&path);
		let value = {
			let root = self.root.value.borrow();
			resolve(&root, &self.steps)
				.and_then(|value| lookup(value, key))
				.cloned()
				.unwrap_or(Value::Null)
		};
		serde_json::from_value(value).map_err(|source| ReactiveError::Deserialize { path, source })
	}

	/// Number of entries (array elements or object keys). Tracks `path/length`.
	pub fn len(&self) -> usize {
		self.runtime.track(&self.path.child(LENGTH));
		let root = self.root.value.borrow();
		match resolve(&root, &self.steps) {
			Some(Value::Array(items)) => items.len(),
			Some(Value::Object(map)) => map.len(),
			_ => 0,
		}
	}

	/// Returns `true` if there are no entries. Tracks `path/length`.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Object keys, or array indices as strings. Tracks `path/length`.
	pub fn keys(&self) -> Vec<String> {
		self.runtime.track(&self.path.child(LENGTH));
		let root = self.root.value.borrow();
		match resolve(&root, &self.steps) {
			Some(Value::Array(items)) => (0..items.len()).map(|index| index.to_string()).collect(),
			Some(Value::Object(map)) => map.keys().cloned().collect(),
			_ => Vec::new(),
		}
	}

	/// Tracked reads of every entry, in key order.
	pub fn items(&self) -> Vec<Tracked> {
		self.keys().iter().map(|key| self.get(key)).collect()
	}

	/// Writes `key` and notifies `path/key`.
	///
	/// On arrays, `key` must be an index no greater than the length; writing
	/// at the length appends. Adding a key or element also notifies
	/// `path/length`.
	pub fn set(&self, key: &str, value: impl Into<Value>) -> ReactiveResult<()> {
		let value = value.into();
		let grew = {
			let mut root = self.root.value.borrow_mut();
			match self.resolve_target_mut(&mut root)? {
				Value::Object(map) => map.insert(key.to_string(), value).is_none(),
				Value::Array(items) => {
					let index = parse_index(&self.path, key)?;
					match index.cmp(&items.len()) {
						Ordering::Less => {
							items[index] = value;
							false
						}
						Ordering::Equal => {
							items.push(value);
							true
						}
						Ordering::Greater => {
							return Err(ReactiveError::IndexOutOfBounds {
								path: self.path.clone(),
								index,
								len: items.len(),
							});
						}
					}
				}
				_ => return Err(ReactiveError::NotAContainer(self.path.clone())),
			}
		};

		self.runtime.notify(&self.path.child(key));
		if grew {
			self.runtime.notify(&self.path.child(LENGTH));
		}
		Ok(())
	}

	/// Appends to an array and returns the new element's index.
	///
	/// Notifies the new index and `path/length`.
	pub fn push(&self, value: impl Into<Value>) -> ReactiveResult<usize> {
		let index = {
			let mut root = self.root.value.borrow_mut();
			match self.resolve_target_mut(&mut root)? {
				Value::Array(items) => {
					items.push(value.into());
					items.len() - 1
				}
				_ => return Err(ReactiveError::NotAContainer(self.path.clone())),
			}
		};

		self.runtime.notify(&self.path.child(&index.to_string()));
		self.runtime.notify(&self.path.child(LENGTH));
		Ok(index)
	}

	/// Removes `key` and returns the removed value.
	///
	/// Removing an array element shifts every later element, so each shifted
	/// index is notified along with `path/length`. Missing keys are a no-op.
	pub fn remove(&self, key: &str) -> ReactiveResult<Option<Value>> {
		let (removed, changed) = {
			let mut root = self.root.value.borrow_mut();
			match self.resolve_target_mut(&mut root)? {
				Value::Object(map) => {
					let removed = map.remove(key);
					let changed = if removed.is_some() {
						vec![key.to_string()]
					} else {
						Vec::new()
					};
					(removed, changed)
				}
				Value::Array(items) => {
					let index = parse_index(&self.path, key)?;
					if index >= items.len() {
						(None, Vec::new())
					} else {
						let len = items.len();
						let removed = items.remove(index);
						(Some(removed), (index..len).map(|i| i.to_string()).collect())
					}
				}
				_ => return Err(ReactiveError::NotAContainer(self.path.clone())),
			}
		};

		if !changed.is_empty() {
			for key in &changed {
				self.runtime.notify(&self.path.child(key));
			}
			self.runtime.notify(&self.path.child(LENGTH));
		}
		Ok(removed)
	}

	/// Returns the raw value behind this wrapper, untracked.
	///
	/// Returns `null` if the path no longer resolves.
	pub fn target(&self) -> Value {
		let root = self.root.value.borrow();
		resolve(&root, &self.steps).cloned().unwrap_or(Value::Null)
	}

	/// Returns the identity of the value behind this wrapper.
	pub fn target_id(&self) -> TargetId {
		TargetId {
			root: self.root.id,
			path: self.path.clone(),
		}
	}

	/// Returns `true` if both wrappers address the same underlying value.
	pub fn same_target(&self, other: &Observable) -> bool {
		Rc::ptr_eq(&self.root, &other.root) && self.steps == other.steps
	}

	fn resolve_target_mut<'a>(&self, root: &'a mut Value) -> ReactiveResult<&'a mut Value> {
		resolve_mut(root, &self.steps).ok_or_else(|| ReactiveError::PathNotFound(self.path.clone()))
	}
}

impl PartialEq for Observable {
	fn eq(&self, other: &Self) -> bool {
		self.same_target(other)
	}
}

impl fmt::Debug for Observable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observable")
			.field("path", &self.path)
			.field("target", &self.target())
			.finish()
	}
}

fn is_container(value: &Value) -> bool {
	matches!(value, Value::Object(_) | Value::Array(_))
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
	match value {
		Value::Object(map) => map.get(key),
		Value::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)),
		_ => None,
	}
}

fn resolve<'a>(root: &'a Value, steps: &[String]) -> Option<&'a Value> {
	steps.iter().try_fold(root, |value, key| lookup(value, key))
}

fn resolve_mut<'a>(root: &'a mut Value, steps: &[String]) -> Option<&'a mut Value> {
	steps.iter().try_fold(root, |value, key| match value {
		Value::Object(map) => map.get_mut(key),
		Value::Array(items) => key
			.parse::<usize>()
			.ok()
			.and_then(move |index| items.get_mut(index)),
		_ => None,
	})
}

fn parse_index(path: &ObservablePath, key: &str) -> ReactiveResult<usize> {
	key.parse::<usize>().map_err(|_| ReactiveError::InvalidIndex {
		path: path.clone(),
		key: key.to_string(),
	})
}
