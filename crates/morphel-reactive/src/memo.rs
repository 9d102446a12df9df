//! Per-render memoization of derived getters.
//!
//! A [`MemoCache`] belongs to one component instance. The owner clears it at
//! the start of every render pass, so a value is computed at most once per
//! pass and never survives into the next one.

use core::any::Any;
use core::fmt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Name -> value cache valid for one render pass.
#[derive(Default)]
pub struct MemoCache {
	entries: RefCell<HashMap<&'static str, Rc<dyn Any>>>,
}

impl MemoCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached value of `name`, computing it with `compute` on the
	/// first read of the pass.
	///
	/// `compute` may itself read other memoized getters. A cached value of a
	/// different type than `T` is recomputed and replaced.
	///
	/// # Example
	///
	/// ```
	/// use morphel_reactive::MemoCache;
	///
	/// let memo = MemoCache::new();
	/// let mut calls = 0;
	/// let a: u32 = memo.get_or_compute("total", || { calls += 1; 42 });
	/// let b: u32 = memo.get_or_compute("total", || { calls += 1; 0 });
	/// assert_eq!((a, b, calls), (42, 42, 1));
	/// ```
	pub fn get_or_compute<T, F>(&self, name: &'static str, compute: F) -> T
	where
		T: Clone + 'static,
		F: FnOnce() -> T,
	{
		let cached = self.entries.borrow().get(name).cloned();
		if let Some(value) = cached.as_deref().and_then(|any| any.downcast_ref::<T>()) {
			return value.clone();
		}

		// No borrow is held while computing.
		let value = compute();
		self.entries
			.borrow_mut()
			.insert(name, Rc::new(value.clone()));
		value
	}

	/// Returns `true` if `name` has been computed in this pass.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.borrow().contains_key(name)
	}

	/// Drops every cached value.
	pub fn clear(&self) {
		self.entries.borrow_mut().clear();
	}

	/// Number of cached values.
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Returns `true` if nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}
}

impl fmt::Debug for MemoCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut names: Vec<&str> = self.entries.borrow().keys().copied().collect();
		names.sort_unstable();
		f.debug_struct("MemoCache").field("names", &names).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	#[rstest]
	fn test_computed_once_per_pass() {
		let memo = MemoCache::new();
		let calls = Cell::new(0);
		let compute = || {
			calls.set(calls.get() + 1);
			String::from("$20.00")
		};

		for _ in 0..3 {
			assert_eq!(memo.get_or_compute("formatted", compute), "$20.00");
		}
		assert_eq!(calls.get(), 1);

		memo.clear();
		memo.get_or_compute("formatted", compute);
		assert_eq!(calls.get(), 2);
	}

	#[rstest]
	fn test_nested_getters() {
		let memo = MemoCache::new();
		let total: u32 = memo.get_or_compute("total", || {
			let subtotal: u32 = memo.get_or_compute("subtotal", || 10);
			subtotal * 2
		});
		assert_eq!(total, 20);
		assert!(memo.contains("subtotal"));
		assert_eq!(memo.len(), 2);
	}

	#[rstest]
	fn test_type_mismatch_recomputes() {
		let memo = MemoCache::new();
		let _: u32 = memo.get_or_compute("value", || 1);
		let text: String = memo.get_or_compute("value", || "one".to_string());
		assert_eq!(text, "one");
		assert_eq!(memo.len(), 1);
	}
}
