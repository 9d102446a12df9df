//! Frame scheduler.
//!
//! Coalesces update requests into at most one render per instance per frame.
//! The scheduler only keeps bookkeeping: which instances are live, which
//! instance was rendering when each one was mounted (its parent context),
//! and which instances have an update pending for the next frame. Executing
//! the renders is the job of whoever drains [`FrameScheduler::take_frame`].

use std::collections::{HashMap, HashSet};

use crate::runtime::ComponentId;

/// Pending-update bookkeeping for live component instances.
#[derive(Debug, Default)]
pub struct FrameScheduler {
	/// Live instance -> parent context at mount time.
	parents: HashMap<ComponentId, Option<ComponentId>>,
	/// Pending instances in scheduling order.
	queue: Vec<ComponentId>,
	/// Same contents as `queue`, for O(1) coalescing checks.
	pending: HashSet<ComponentId>,
}

impl FrameScheduler {
	/// Creates an empty scheduler.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a live instance and the context that was active when it mounted.
	pub fn register(&mut self, id: ComponentId, parent: Option<ComponentId>) {
		self.parents.insert(id, parent);
	}

	/// Forgets an instance. A pending update for it is cancelled.
	///
	/// Returns `true` if the instance was live.
	pub fn unregister(&mut self, id: &ComponentId) -> bool {
		if self.pending.remove(id) {
			self.queue.retain(|queued| queued != id);
		}
		self.parents.remove(id).is_some()
	}

	/// Returns `true` if the instance is registered.
	pub fn is_live(&self, id: &ComponentId) -> bool {
		self.parents.contains_key(id)
	}

	/// Returns the parent context an instance was mounted under.
	pub fn parent_of(&self, id: &ComponentId) -> Option<&ComponentId> {
		self.parents.get(id).and_then(Option::as_ref)
	}

	/// Returns the live instances whose parent context is `id`, sorted by id.
	pub fn children_of(&self, id: &ComponentId) -> Vec<ComponentId> {
		let mut children: Vec<ComponentId> = self
			.parents
			.iter()
			.filter(|(_, parent)| parent.as_ref() == Some(id))
			.map(|(child, _)| child.clone())
			.collect();
		children.sort();
		children
	}

	/// Returns every live instance transitively mounted under `id`,
	/// breadth first.
	pub fn descendants_of(&self, id: &ComponentId) -> Vec<ComponentId> {
		let mut found = Vec::new();
		let mut frontier = vec![id.clone()];
		while let Some(current) = frontier.pop() {
			for child in self.children_of(&current) {
				if !found.contains(&child) && &child != id {
					frontier.insert(0, child.clone());
					found.push(child);
				}
			}
		}
		found
	}

	/// Marks one pending update for `id`.
	///
	/// Returns `true` if the instance was not pending already. Requests for
	/// instances that are not live are ignored.
	pub fn request_update(&mut self, id: &ComponentId) -> bool {
		if !self.is_live(id) || self.pending.contains(id) {
			return false;
		}
		self.pending.insert(id.clone());
		self.queue.push(id.clone());
		true
	}

	/// Requests an update for `id` and, when `cascade` is set, for every live
	/// descendant. The ancestor is always scheduled before its descendants.
	///
	/// Returns the instances that became pending.
	pub fn invalidate(&mut self, id: &ComponentId, cascade: bool) -> Vec<ComponentId> {
		let mut scheduled = Vec::new();
		if self.request_update(id) {
			scheduled.push(id.clone());
		}
		if cascade {
			for descendant in self.descendants_of(id) {
				if self.request_update(&descendant) {
					scheduled.push(descendant);
				}
			}
		}
		scheduled
	}

	/// Returns `true` if an update for `id` is pending.
	pub fn is_pending(&self, id: &ComponentId) -> bool {
		self.pending.contains(id)
	}

	/// Returns `true` if any update is pending.
	pub fn has_pending(&self) -> bool {
		!self.queue.is_empty()
	}

	/// Takes the pending instances of the current frame and clears their flags.
	///
	/// Flags are cleared before anything renders, so a request raised while
	/// one of these instances renders schedules a fresh update for the next
	/// frame instead of being swallowed.
	pub fn take_frame(&mut self) -> Vec<ComponentId> {
		self.pending.clear();
		std::mem::take(&mut self.queue)
	}

	/// Number of live instances.
	pub fn live_count(&self) -> usize {
		self.parents.len()
	}

	/// Drops every instance and pending update.
	pub fn clear(&mut self) {
		self.parents.clear();
		self.queue.clear();
		self.pending.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	/// APP
	/// ├── LIST
	/// │   └── ROW
	/// └── FOOTER
	#[fixture]
	fn tree() -> FrameScheduler {
		let mut scheduler = FrameScheduler::new();
		scheduler.register(ComponentId::new("APP:1"), None);
		scheduler.register(ComponentId::new("LIST:1"), Some(ComponentId::new("APP:1")));
		scheduler.register(ComponentId::new("ROW:1"), Some(ComponentId::new("LIST:1")));
		scheduler.register(ComponentId::new("FOOTER:1"), Some(ComponentId::new("APP:1")));
		scheduler
	}

	#[rstest]
	fn test_request_update_coalesces(mut tree: FrameScheduler) {
		let row = ComponentId::new("ROW:1");

		assert!(tree.request_update(&row));
		for _ in 0..10 {
			assert!(!tree.request_update(&row));
		}

		assert_eq!(tree.take_frame(), vec![row.clone()]);
		assert!(!tree.is_pending(&row));
		assert!(tree.take_frame().is_empty());
	}

	#[rstest]
	fn test_invalidate_cascades_ancestor_first(mut tree: FrameScheduler) {
		let scheduled = tree.invalidate(&ComponentId::new("APP:1"), true);

		assert_eq!(scheduled[0], ComponentId::new("APP:1"));
		assert_eq!(scheduled.len(), 4);
		let list = scheduled.iter().position(|id| id.as_str() == "LIST:1").unwrap();
		let row = scheduled.iter().position(|id| id.as_str() == "ROW:1").unwrap();
		assert!(list < row);
	}

	#[rstest]
	fn test_invalidate_without_cascade(mut tree: FrameScheduler) {
		let scheduled = tree.invalidate(&ComponentId::new("LIST:1"), false);
		assert_eq!(scheduled, vec![ComponentId::new("LIST:1")]);
	}

	#[rstest]
	fn test_cascade_skips_unrelated_branches(mut tree: FrameScheduler) {
		tree.invalidate(&ComponentId::new("LIST:1"), true);
		assert!(tree.is_pending(&ComponentId::new("ROW:1")));
		assert!(!tree.is_pending(&ComponentId::new("FOOTER:1")));
		assert!(!tree.is_pending(&ComponentId::new("APP:1")));
	}

	#[rstest]
	fn test_unregister_cancels_pending(mut tree: FrameScheduler) {
		let row = ComponentId::new("ROW:1");
		tree.request_update(&row);

		assert!(tree.unregister(&row));
		assert!(!tree.is_pending(&row));
		assert!(tree.take_frame().is_empty());

		// Requests for dead instances are ignored.
		assert!(!tree.request_update(&row));
	}

	#[rstest]
	fn test_parent_bookkeeping(tree: FrameScheduler) {
		assert_eq!(
			tree.parent_of(&ComponentId::new("ROW:1")),
			Some(&ComponentId::new("LIST:1"))
		);
		assert_eq!(tree.parent_of(&ComponentId::new("APP:1")), None);
		assert_eq!(
			tree.children_of(&ComponentId::new("APP:1")),
			vec![ComponentId::new("FOOTER:1"), ComponentId::new("LIST:1")]
		);
		assert_eq!(tree.live_count(), 4);
	}
}
