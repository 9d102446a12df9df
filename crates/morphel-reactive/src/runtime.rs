//! Reactive Runtime
//!
//! This module provides the process-scoped context of the reactive engine:
//! the dependency registry, the active-context stack, the task queue for
//! deferred notifications and the frame scheduler.
//!
//! ## Architecture
//!
//! 1. **Context Stack**: Tracks the component instance currently rendering
//! 2. **Dependency Tracking**: [`Runtime::track`] records `path -> instance`
//!    whenever an observable is read during a render
//! 3. **Deferred Notification**: [`Runtime::notify`] queues invalidations on the
//!    task queue; they never run inside the write that caused them
//! 4. **Frame Scheduling**: invalidations mark instances pending; each pending
//!    instance renders once at the next frame boundary
//!
//! There is no ambient global: a [`Runtime`] is created explicitly, cloned
//! cheaply (it is an `Rc` handle) and passed to whatever needs it. It is not
//! `Send`; a multi-threaded host must confine it to a single thread or task.
//!
//! ## Example
//!
//! ```
//! use morphel_reactive::{ComponentId, Observable, Runtime};
//! use serde_json::json;
//!
//! let runtime = Runtime::new();
//! let state = Observable::new(&runtime, json!({ "price": 20 }));
//! let id = ComponentId::new("PRICE-TAG:main");
//! runtime.register_instance(id.clone(), None);
//!
//! // Reads during a render subscribe the active instance.
//! {
//!     let _guard = runtime.enter(id.clone());
//!     let _ = state.get("price");
//! }
//!
//! // Writes queue an invalidation for the next turn...
//! state.set("price", 30).unwrap();
//! assert!(!runtime.is_pending(&id));
//!
//! // ...which marks the instance for the next frame.
//! runtime.flush_tasks();
//! assert_eq!(runtime.take_frame(), vec![id]);
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::path::ObservablePath;
use crate::registry::{DependencyRegistry, Invalidation};
use crate::scheduler::FrameScheduler;

/// Stable identity of a component instance.
///
/// Derived from the component tag plus its explicit `key`, or a generated
/// fallback that stays fixed for the instance's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(Rc<str>);

impl ComponentId {
	/// Creates an id from its textual form.
	pub fn new(id: impl Into<Rc<str>>) -> Self {
		Self(id.into())
	}

	/// Returns the textual form of the id.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Identity of a dependency subscriber.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberId {
	/// A component instance subscribed by reading during its render.
	Component(ComponentId),
	/// An external watcher registered through [`Runtime::watch`].
	Watcher(u64),
}

/// Result of [`Runtime::track`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracking {
	/// No instance was rendering; the path was recorded as the last
	/// read outside render.
	Untracked,
	/// The active instance is now subscribed to the path.
	Registered(ComponentId),
}

impl Tracking {
	/// Returns `true` if a subscription was registered.
	pub fn is_registered(&self) -> bool {
		matches!(self, Self::Registered(_))
	}
}

/// Which queue needs draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
	/// The task queue became non-empty; drain it on a later turn
	/// with [`Runtime::flush_tasks`].
	Turn,
	/// An instance became pending; render before the next paint.
	Frame,
}

/// Type for the wake hook
type SchedulerFn = Rc<dyn Fn(Wake) + 'static>;

struct RuntimeInner {
	config: RuntimeConfig,
	registry: RefCell<DependencyRegistry>,
	context_stack: RefCell<Vec<ComponentId>>,
	last_untracked_read: RefCell<Option<ObservablePath>>,
	tasks: RefCell<VecDeque<Invalidation>>,
	scheduler: RefCell<FrameScheduler>,
	wake: RefCell<Option<SchedulerFn>>,
	next_root: Cell<u64>,
	next_watcher: Cell<u64>,
}

/// Process-scoped reactive context.
///
/// Cloning a `Runtime` yields another handle to the same context.
#[derive(Clone)]
pub struct Runtime {
	inner: Rc<RuntimeInner>,
}

impl Runtime {
	/// Creates a runtime with the default configuration.
	pub fn new() -> Self {
		Self::with_config(RuntimeConfig::default())
	}

	/// Creates a runtime with the given configuration.
	pub fn with_config(config: RuntimeConfig) -> Self {
		Self {
			inner: Rc::new(RuntimeInner {
				config,
				registry: RefCell::new(DependencyRegistry::new()),
				context_stack: RefCell::new(Vec::new()),
				last_untracked_read: RefCell::new(None),
				tasks: RefCell::new(VecDeque::new()),
				scheduler: RefCell::new(FrameScheduler::new()),
				wake: RefCell::new(None),
				next_root: Cell::new(0),
				next_watcher: Cell::new(0),
			}),
		}
	}

	/// Returns the runtime configuration.
	pub fn config(&self) -> &RuntimeConfig {
		&self.inner.config
	}

	/// Installs the wake hook.
	///
	/// The hook is called with [`Wake::Turn`] when the task queue goes from
	/// empty to non-empty and with [`Wake::Frame`] when the first instance of
	/// a frame becomes pending. A browser host would answer with `setTimeout`
	/// and `requestAnimationFrame` respectively. Without a hook, queues must
	/// be flushed manually, which is what tests and native embedders do.
	///
	/// # Example
	///
	/// ```
	/// use morphel_reactive::{Runtime, Wake};
	/// use std::cell::RefCell;
	/// use std::rc::Rc;
	///
	/// let runtime = Runtime::new();
	/// let wakes = Rc::new(RefCell::new(Vec::new()));
	/// let log = wakes.clone();
	/// runtime.set_scheduler(move |wake| log.borrow_mut().push(wake));
	/// ```
	pub fn set_scheduler<F>(&self, scheduler: F)
	where
		F: Fn(Wake) + 'static,
	{
		*self.inner.wake.borrow_mut() = Some(Rc::new(scheduler));
	}

	fn wake(&self, wake: Wake) {
		// Clone the hook out so it may call back into the runtime.
		let hook = self.inner.wake.borrow().clone();
		if let Some(hook) = hook {
			hook(wake);
		}
	}

	/// Returns the instance currently rendering, if any.
	pub fn active_context(&self) -> Option<ComponentId> {
		self.inner.context_stack.borrow().last().cloned()
	}

	/// Makes `id` the active context until the returned guard is dropped.
	///
	/// Guards nest: dropping the inner guard restores the outer context.
	/// The guard pops on every exit path, including unwinding.
	pub fn enter(&self, id: ComponentId) -> ContextGuard {
		self.inner.context_stack.borrow_mut().push(id);
		ContextGuard {
			runtime: self.clone(),
		}
	}

	/// Records a read of `path`.
	///
	/// With an active context, subscribes it to `path` (idempotent per
	/// path + context) and returns the registration. Without one, remembers
	/// `path` as the last read outside render for [`Runtime::watch`].
	pub fn track(&self, path: &ObservablePath) -> Tracking {
		let Some(context) = self.active_context() else {
			*self.inner.last_untracked_read.borrow_mut() = Some(path.clone());
			return Tracking::Untracked;
		};
		*self.inner.last_untracked_read.borrow_mut() = None;

		let added = self.inner.registry.borrow_mut().subscribe(
			path.clone(),
			SubscriberId::Component(context.clone()),
			Invalidation::Component(context.clone()),
		);
		if added {
			tracing::debug!(target: "morphel::dep", context = %context, path = %path, "registered dependency");
		}
		Tracking::Registered(context)
	}

	/// Queues the invalidation of every subscriber of `path`.
	///
	/// Nothing runs synchronously: the invalidations execute on the next
	/// [`Runtime::flush_tasks`], so several writes in a row coalesce and a
	/// write never re-enters a render.
	pub fn notify(&self, path: &ObservablePath) {
		let subscribers = self.inner.registry.borrow().subscribers(path);
		if subscribers.is_empty() {
			return;
		}
		tracing::debug!(target: "morphel::notify", path = %path, subscribers = subscribers.len(), "queued invalidations");

		let was_idle = {
			let mut tasks = self.inner.tasks.borrow_mut();
			let was_idle = tasks.is_empty();
			tasks.extend(subscribers);
			was_idle
		};
		if was_idle {
			self.wake(Wake::Turn);
		}
	}

	/// Runs the invalidations queued before this call and returns how many ran.
	///
	/// Invalidations queued while these run (a watcher writing another
	/// observable, say) wait for the next turn.
	pub fn flush_tasks(&self) -> usize {
		let batch: Vec<Invalidation> = self.inner.tasks.borrow_mut().drain(..).collect();
		let count = batch.len();
		for task in batch {
			match task {
				Invalidation::Component(id) => self.invalidate(&id),
				Invalidation::Callback(callback) => callback(),
			}
		}
		count
	}

	/// Returns the number of queued invalidations.
	pub fn pending_tasks(&self) -> usize {
		self.inner.tasks.borrow().len()
	}

	/// Subscribes `callback` to the path read by `read`.
	///
	/// `read` runs outside any render; the last observable path it reads is
	/// subscribed with a fresh watcher id. Returns `None` when `read` did not
	/// read anything trackable, or when called during a render (the read then
	/// belongs to the rendering instance).
	///
	/// # Example
	///
	/// ```
	/// use morphel_reactive::{Observable, Runtime};
	/// use serde_json::json;
	/// use std::cell::Cell;
	/// use std::rc::Rc;
	///
	/// let runtime = Runtime::new();
	/// let state = Observable::new(&runtime, json!({ "count": 0 }));
	/// let seen = Rc::new(Cell::new(0));
	///
	/// let counter = seen.clone();
	/// let watcher = runtime.watch(|| state.get("count"), move || counter.set(counter.get() + 1));
	/// assert!(watcher.is_some());
	///
	/// state.set("count", 1).unwrap();
	/// runtime.flush_tasks();
	/// assert_eq!(seen.get(), 1);
	/// ```
	pub fn watch<R, F>(&self, read: impl FnOnce() -> R, callback: F) -> Option<SubscriberId>
	where
		F: Fn() + 'static,
	{
		*self.inner.last_untracked_read.borrow_mut() = None;
		let _ = read();
		let path = self.inner.last_untracked_read.borrow_mut().take()?;

		let watcher = self.inner.next_watcher.get();
		self.inner.next_watcher.set(watcher + 1);
		let subscriber = SubscriberId::Watcher(watcher);

		self.inner.registry.borrow_mut().subscribe(
			path.clone(),
			subscriber.clone(),
			Invalidation::Callback(Rc::new(callback)),
		);
		tracing::debug!(target: "morphel::dep", watcher, path = %path, "registered watcher");
		Some(subscriber)
	}

	/// Drops every subscription held by `subscriber`.
	pub fn unsubscribe(&self, subscriber: &SubscriberId) {
		self.inner.registry.borrow_mut().clear_subscriber(subscriber);
	}

	/// Returns `true` if `subscriber` is subscribed to `path`.
	pub fn is_subscribed(&self, path: &ObservablePath, subscriber: &SubscriberId) -> bool {
		self.inner.registry.borrow().is_subscribed(path, subscriber)
	}

	/// Returns the number of subscribers of `path`.
	pub fn subscriber_count(&self, path: &ObservablePath) -> usize {
		self.inner.registry.borrow().subscriber_count(path)
	}

	/// Returns the paths an instance read during its last render.
	pub fn dependencies_of(&self, id: &ComponentId) -> Vec<ObservablePath> {
		self.inner
			.registry
			.borrow()
			.paths_of(&SubscriberId::Component(id.clone()))
	}

	/// Records a live instance and the context it was mounted under.
	pub fn register_instance(&self, id: ComponentId, parent: Option<ComponentId>) {
		self.inner.scheduler.borrow_mut().register(id, parent);
	}

	/// Forgets an instance: its subscriptions and pending update are dropped.
	pub fn forget_instance(&self, id: &ComponentId) {
		self.unsubscribe(&SubscriberId::Component(id.clone()));
		self.inner.scheduler.borrow_mut().unregister(id);
	}

	/// Returns `true` if the instance is registered.
	pub fn is_live(&self, id: &ComponentId) -> bool {
		self.inner.scheduler.borrow().is_live(id)
	}

	/// Returns the live instances mounted under `id`.
	pub fn children_of(&self, id: &ComponentId) -> Vec<ComponentId> {
		self.inner.scheduler.borrow().children_of(id)
	}

	/// Returns the parent context `id` was mounted under.
	pub fn parent_of(&self, id: &ComponentId) -> Option<ComponentId> {
		self.inner.scheduler.borrow().parent_of(id).cloned()
	}

	/// Requests one render of `id` at the next frame. Repeated requests
	/// before the frame coalesce.
	pub fn request_update(&self, id: &ComponentId) {
		let (scheduled, was_idle) = {
			let mut scheduler = self.inner.scheduler.borrow_mut();
			let was_idle = !scheduler.has_pending();
			(scheduler.request_update(id), was_idle)
		};
		if scheduled && was_idle {
			self.wake(Wake::Frame);
		}
	}

	/// Requests an update of `id` and, if cascading is enabled, of every
	/// instance mounted under it.
	pub fn invalidate(&self, id: &ComponentId) {
		let cascade = self.inner.config.cascade_invalidation;
		let (scheduled, was_idle) = {
			let mut scheduler = self.inner.scheduler.borrow_mut();
			let was_idle = !scheduler.has_pending();
			(scheduler.invalidate(id, cascade), was_idle)
		};
		if !scheduled.is_empty() {
			tracing::debug!(target: "morphel::render", root = %id, scheduled = scheduled.len(), "invalidated");
			if was_idle {
				self.wake(Wake::Frame);
			}
		}
	}

	/// Returns `true` if an update for `id` is pending.
	pub fn is_pending(&self, id: &ComponentId) -> bool {
		self.inner.scheduler.borrow().is_pending(id)
	}

	/// Returns `true` if any render is pending.
	pub fn has_pending_frame(&self) -> bool {
		self.inner.scheduler.borrow().has_pending()
	}

	/// Takes the instances to render at this frame boundary, clearing their
	/// pending flags.
	pub fn take_frame(&self) -> Vec<ComponentId> {
		self.inner.scheduler.borrow_mut().take_frame()
	}

	/// Returns `true` if tasks or renders are waiting.
	pub fn has_pending_work(&self) -> bool {
		self.pending_tasks() > 0 || self.has_pending_frame()
	}

	/// Allocates the id of a new observable root.
	pub(crate) fn next_root_id(&self) -> u64 {
		let id = self.inner.next_root.get();
		self.inner.next_root.set(id + 1);
		id
	}

	/// Clears subscriptions, queues, instances and the context stack.
	///
	/// Configuration, the wake hook and id counters survive, so ids minted
	/// before a reset never collide with ids minted after it.
	pub fn reset(&self) {
		self.inner.registry.borrow_mut().clear();
		self.inner.context_stack.borrow_mut().clear();
		self.inner.tasks.borrow_mut().clear();
		self.inner.scheduler.borrow_mut().clear();
		*self.inner.last_untracked_read.borrow_mut() = None;
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Runtime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("config", &self.inner.config)
			.field("active_context", &self.active_context())
			.field("pending_tasks", &self.pending_tasks())
			.finish()
	}
}

/// Keeps an instance active while it renders. Pops it on drop.
#[must_use = "the context is popped as soon as the guard is dropped"]
pub struct ContextGuard {
	runtime: Runtime,
}

impl Drop for ContextGuard {
	fn drop(&mut self) {
		if let Ok(mut stack) = self.runtime.inner.context_stack.try_borrow_mut() {
			stack.pop();
		}
	}
}
