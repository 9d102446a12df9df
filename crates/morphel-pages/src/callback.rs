//! Callback types for event handlers.
//!
//! A [`Callback`] is a cheaply cloneable handle to a closure. Its identity is
//! the identity of the closure allocation, so the stash can hand out one key
//! per callback no matter how many clones are interpolated.
//!
//! ## Example
//!
//! ```
//! use morphel_pages::{Callback, Event};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let clicks = Rc::new(Cell::new(0));
//! let counter = clicks.clone();
//! let on_click = Callback::new(move |_: &Event| counter.set(counter.get() + 1));
//!
//! on_click.call(&Event::new("click"));
//! assert_eq!(clicks.get(), 1);
//! ```

use core::fmt;
use std::rc::Rc;

/// A host event delivered to a callback property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
	kind: String,
}

impl Event {
	/// Creates an event of the given kind (`"click"`, `"input"`, ...).
	pub fn new(kind: impl Into<String>) -> Self {
		Self { kind: kind.into() }
	}

	/// Returns the event kind.
	pub fn kind(&self) -> &str {
		&self.kind
	}
}

/// A cloneable callback wrapper.
///
/// ## Type Parameters
///
/// - `Args`: The argument type the callback receives (defaults to [`Event`])
/// - `Ret`: The return type of the callback (defaults to `()`)
pub struct Callback<Args = Event, Ret = ()> {
	inner: Rc<dyn Fn(&Args) -> Ret + 'static>,
}

impl<Args, Ret> Callback<Args, Ret> {
	/// Wraps a closure.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&Args) -> Ret + 'static,
	{
		Self { inner: Rc::new(f) }
	}

	/// Invokes the callback.
	pub fn call(&self, args: &Args) -> Ret {
		(self.inner)(args)
	}

	/// Returns `true` if both handles point to the same closure.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Address of the closure allocation, stable while any clone is alive.
	pub(crate) fn addr(&self) -> usize {
		Rc::as_ptr(&self.inner) as *const () as usize
	}
}

impl<Args, Ret> Clone for Callback<Args, Ret> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<Args, Ret> PartialEq for Callback<Args, Ret> {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl<Args, Ret> fmt::Debug for Callback<Args, Ret> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback")
			.field("addr", &format_args!("{:#x}", self.addr()))
			.finish()
	}
}

impl<F> From<F> for Callback
where
	F: Fn(&Event) + 'static,
{
	fn from(f: F) -> Self {
		Self::new(f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;

	#[rstest]
	fn test_call_receives_event() {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let log = seen.clone();
		let callback = Callback::new(move |event: &Event| log.borrow_mut().push(event.kind().to_string()));

		callback.call(&Event::new("click"));
		callback.call(&Event::new("input"));

		assert_eq!(*seen.borrow(), vec!["click".to_string(), "input".to_string()]);
	}

	#[rstest]
	fn test_identity_follows_allocation() {
		let a = Callback::new(|_: &Event| {});
		let b = a.clone();
		let c = Callback::new(|_: &Event| {});

		assert_eq!(a, b);
		assert_eq!(a.addr(), b.addr());
		assert_ne!(a, c);
	}

	#[rstest]
	fn test_return_values() {
		let double: Callback<i32, i32> = Callback::new(|n: &i32| n * 2);
		assert_eq!(double.call(&21), 42);
	}
}
