//! Dependency registry.
//!
//! Maps each [`ObservablePath`] to the subscribers that read it, together
//! with the [`Invalidation`] to queue when the path is written. A reverse
//! index (subscriber -> paths) lets a subscriber drop every subscription at
//! once, either before it re-renders or when it is unmounted.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use crate::path::ObservablePath;
use crate::runtime::{ComponentId, SubscriberId};

/// What to do when a subscribed path changes.
#[derive(Clone)]
pub enum Invalidation {
	/// Invalidate a component instance (and, when cascading, its descendants).
	Component(ComponentId),
	/// Run an external watch callback.
	Callback(Rc<dyn Fn()>),
}

impl fmt::Debug for Invalidation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Component(id) => f.debug_tuple("Component").field(id).finish(),
			Self::Callback(_) => f.debug_tuple("Callback").field(&"<fn>").finish(),
		}
	}
}

/// Path -> (subscriber -> invalidation) table.
#[derive(Debug, Default)]
pub struct DependencyRegistry {
	entries: HashMap<ObservablePath, BTreeMap<SubscriberId, Invalidation>>,
	reads: HashMap<SubscriberId, BTreeSet<ObservablePath>>,
}

impl DependencyRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes `subscriber` to `path`.
	///
	/// A (path, subscriber) pair holds at most one invalidation; subscribing
	/// again overwrites it. Returns `true` if the pair was not present before.
	pub fn subscribe(
		&mut self,
		path: ObservablePath,
		subscriber: SubscriberId,
		invalidation: Invalidation,
	) -> bool {
		let added = self
			.entries
			.entry(path.clone())
			.or_default()
			.insert(subscriber.clone(), invalidation)
			.is_none();
		self.reads.entry(subscriber).or_default().insert(path);
		added
	}

	/// Returns the invalidations registered under `path`.
	pub fn subscribers(&self, path: &ObservablePath) -> Vec<Invalidation> {
		self.entries
			.get(path)
			.map(|subscribers| subscribers.values().cloned().collect())
			.unwrap_or_default()
	}

	/// Removes every subscription held by `subscriber`.
	pub fn clear_subscriber(&mut self, subscriber: &SubscriberId) {
		let Some(paths) = self.reads.remove(subscriber) else {
			return;
		};
		for path in paths {
			if let Some(subscribers) = self.entries.get_mut(&path) {
				subscribers.remove(subscriber);
				if subscribers.is_empty() {
					self.entries.remove(&path);
				}
			}
		}
	}

	/// Returns the number of subscribers of `path`.
	pub fn subscriber_count(&self, path: &ObservablePath) -> usize {
		self.entries.get(path).map_or(0, BTreeMap::len)
	}

	/// Returns `true` if `subscriber` is subscribed to `path`.
	pub fn is_subscribed(&self, path: &ObservablePath, subscriber: &SubscriberId) -> bool {
		self.entries
			.get(path)
			.is_some_and(|subscribers| subscribers.contains_key(subscriber))
	}

	/// Returns the paths `subscriber` is subscribed to, in path order.
	pub fn paths_of(&self, subscriber: &SubscriberId) -> Vec<ObservablePath> {
		self.reads
			.get(subscriber)
			.map(|paths| paths.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Returns the number of paths with at least one subscriber.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` if nothing is subscribed.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Drops every subscription.
	pub fn clear(&mut self) {
		self.entries.clear();
		self.reads.clear();
	}
}
