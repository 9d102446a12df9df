//! Component trait, lifecycle record and render context.

use core::cell::RefCell;
use std::collections::HashSet;

use morphel_reactive::{ComponentId, MemoCache, Observable, Runtime};
use serde_json::Value;

use crate::callback::{Callback, Event};
use crate::markup::{Html, Markup};
use crate::prop::Prop;
use crate::stash::{Stash, StashScope, camel_case};

/// Hook signature of the lifecycle record.
pub type Hook<C> = fn(&mut C, &HookContext);

/// A component type.
///
/// Instances are created by the factory given to
/// [`App::define`](crate::App::define) when a host element with the
/// component's tag is connected. State that should trigger re-renders lives
/// in [`Observable`]s created by the factory or in `on_created`.
///
/// # Example
///
/// ```
/// use morphel_pages::{Component, Markup, RenderContext};
/// use morphel_reactive::Observable;
///
/// struct PriceTag {
///     state: Observable,
/// }
///
/// impl Component for PriceTag {
///     fn render(&self, cx: &RenderContext<'_>) -> Markup {
///         let price = self.state.get("price").as_f64().unwrap_or_default();
///         cx.html().raw("<span>").text(format!("${price:.2}")).raw("</span>").finish()
///     }
/// }
/// ```
pub trait Component: 'static {
	/// Produces the markup of one render pass. Without an override the
	/// component renders nothing.
	fn render(&self, cx: &RenderContext<'_>) -> Markup {
		let _ = cx;
		Markup::default()
	}

	/// The hooks this component implements.
	fn lifecycle() -> Lifecycle<Self>
	where
		Self: Sized,
	{
		Lifecycle::new()
	}
}

/// Optional lifecycle hooks of a component type.
///
/// Each hook is checked before it is invoked; a missing hook is skipped.
pub struct Lifecycle<C> {
	pub on_created: Option<Hook<C>>,
	pub on_mounted: Option<Hook<C>>,
	pub on_unmounted: Option<Hook<C>>,
}

impl<C> Lifecycle<C> {
	/// A record without hooks.
	pub fn new() -> Self {
		Self {
			on_created: None,
			on_mounted: None,
			on_unmounted: None,
		}
	}

	/// Runs once, before the first render.
	pub fn created(mut self, hook: Hook<C>) -> Self {
		self.on_created = Some(hook);
		self
	}

	/// Runs after the first render was reconciled into the host.
	pub fn mounted(mut self, hook: Hook<C>) -> Self {
		self.on_mounted = Some(hook);
		self
	}

	/// Runs when the instance is disconnected, before its state is dropped.
	pub fn unmounted(mut self, hook: Hook<C>) -> Self {
		self.on_unmounted = Some(hook);
		self
	}
}

impl<C> Default for Lifecycle<C> {
	fn default() -> Self {
		Self::new()
	}
}

/// Context handed to lifecycle hooks.
#[derive(Debug, Clone)]
pub struct HookContext {
	id: ComponentId,
	runtime: Runtime,
}

impl HookContext {
	pub(crate) fn new(id: ComponentId, runtime: Runtime) -> Self {
		Self { id, runtime }
	}

	pub fn id(&self) -> &ComponentId {
		&self.id
	}

	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}
}

/// Everything a component can reach while rendering.
///
/// Valid for one pass. The instance is the active context of the runtime
/// while the pass runs, so every observable read subscribes it.
pub struct RenderContext<'a> {
	pub(crate) id: &'a ComponentId,
	pub(crate) tag: &'a str,
	pub(crate) runtime: &'a Runtime,
	pub(crate) memo: &'a MemoCache,
	pub(crate) stash: &'a RefCell<Stash>,
	pub(crate) emitted: &'a RefCell<HashSet<String>>,
	pub(crate) attributes: Vec<(String, String)>,
	pub(crate) props: Vec<(String, Prop)>,
}

impl<'a> RenderContext<'a> {
	pub fn id(&self) -> &ComponentId {
		self.id
	}

	/// Tag of the host element.
	pub fn tag(&self) -> &str {
		self.tag
	}

	pub fn runtime(&self) -> &Runtime {
		self.runtime
	}

	/// Wraps `value` in a fresh observable root.
	pub fn observable(&self, value: Value) -> Observable {
		Observable::new(self.runtime, value)
	}

	/// A markup builder that stashes non-primitive attribute values on
	/// behalf of this instance.
	pub fn html(&self) -> Html<'a> {
		Html::with_stash(StashScope::new(self.stash, self.id, self.emitted))
	}

	/// Returns the value of the derived getter `name`, computing it with `f`
	/// on the first read of this pass.
	pub fn memo<T, F>(&self, name: &'static str, f: F) -> T
	where
		T: Clone + 'static,
		F: FnOnce() -> T,
	{
		self.memo.get_or_compute(name, f)
	}

	/// Property of the host element, as rehydrated before this pass.
	///
	/// `name` may be given in attribute form (`on-select`) or property form
	/// (`onSelect`).
	pub fn prop(&self, name: &str) -> Option<Prop> {
		let property = camel_case(name);
		self.props
			.iter()
			.find(|(existing, _)| *existing == property)
			.map(|(_, value)| value.clone())
	}

	/// Attribute of the host element.
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|(existing, _)| existing == name)
			.map(|(_, value)| value.as_str())
	}

	/// The explicit `key` of this instance, if any.
	pub fn key(&self) -> Option<&str> {
		self.attribute("key")
	}

	/// Shorthand for [`Callback::new`].
	pub fn callback<F>(&self, f: F) -> Callback
	where
		F: Fn(&Event) + 'static,
	{
		Callback::new(f)
	}
}

/// Object-safe view of a component together with its lifecycle record.
pub(crate) trait AnyComponent {
	fn render(&self, cx: &RenderContext<'_>) -> Markup;
	fn created(&mut self, cx: &HookContext);
	fn mounted(&mut self, cx: &HookContext);
	fn unmounted(&mut self, cx: &HookContext);
}

struct Erased<C: Component> {
	component: C,
	lifecycle: Lifecycle<C>,
}

impl<C: Component> AnyComponent for Erased<C> {
	fn render(&self, cx: &RenderContext<'_>) -> Markup {
		self.component.render(cx)
	}

	fn created(&mut self, cx: &HookContext) {
		if let Some(hook) = self.lifecycle.on_created {
			hook(&mut self.component, cx);
		}
	}

	fn mounted(&mut self, cx: &HookContext) {
		if let Some(hook) = self.lifecycle.on_mounted {
			hook(&mut self.component, cx);
		}
	}

	fn unmounted(&mut self, cx: &HookContext) {
		if let Some(hook) = self.lifecycle.on_unmounted {
			hook(&mut self.component, cx);
		}
	}
}

pub(crate) fn erase<C: Component>(component: C) -> Box<dyn AnyComponent> {
	Box::new(Erased {
		component,
		lifecycle: C::lifecycle(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	struct Blank;

	impl Component for Blank {}

	#[derive(Default)]
	struct Counter {
		created: usize,
		unmounted: usize,
	}

	impl Component for Counter {
		fn lifecycle() -> Lifecycle<Self> {
			Lifecycle::new()
				.created(|counter: &mut Counter, _| counter.created += 1)
				.unmounted(|counter: &mut Counter, _| counter.unmounted += 1)
		}
	}

	struct Fixture {
		runtime: Runtime,
		id: ComponentId,
		memo: MemoCache,
		stash: RefCell<Stash>,
		emitted: RefCell<HashSet<String>>,
	}

	impl Fixture {
		fn new() -> Self {
			Self {
				runtime: Runtime::new(),
				id: ComponentId::new("X-TEST:a"),
				memo: MemoCache::new(),
				stash: RefCell::new(Stash::new()),
				emitted: RefCell::new(HashSet::new()),
			}
		}

		fn context(&self) -> RenderContext<'_> {
			RenderContext {
				id: &self.id,
				tag: "x-test",
				runtime: &self.runtime,
				memo: &self.memo,
				stash: &self.stash,
				emitted: &self.emitted,
				attributes: vec![("key".to_string(), "a".to_string())],
				props: vec![("onSelect".to_string(), Prop::from("handler"))],
			}
		}
	}

	#[rstest]
	fn test_missing_render_is_empty() {
		let fixture = Fixture::new();
		let component = erase(Blank);
		assert!(component.render(&fixture.context()).is_empty());
	}

	#[rstest]
	fn test_missing_hooks_are_skipped() {
		let fixture = Fixture::new();
		let hooks = HookContext::new(fixture.id.clone(), fixture.runtime.clone());
		let mut erased = Erased {
			component: Counter::default(),
			lifecycle: Counter::lifecycle(),
		};

		erased.created(&hooks);
		erased.mounted(&hooks);
		erased.unmounted(&hooks);

		assert_eq!(erased.component.created, 1);
		assert_eq!(erased.component.unmounted, 1);
	}

	#[rstest]
	fn test_context_accessors() {
		let fixture = Fixture::new();
		let cx = fixture.context();

		assert_eq!(cx.key(), Some("a"));
		assert_eq!(cx.attribute("missing"), None);
		assert_eq!(cx.prop("on-select"), Some(Prop::from("handler")));
		assert_eq!(cx.prop("onSelect"), Some(Prop::from("handler")));
		assert_eq!(cx.tag(), "x-test");
	}

	#[rstest]
	fn test_html_stashes_for_the_instance() {
		let fixture = Fixture::new();
		let cx = fixture.context();
		let state = cx.observable(json!({ "items": [] }));

		let markup = cx.html().raw("<x-list").attr("items", state.get("items")).raw("></x-list>").finish();

		assert_eq!(markup.as_str(), r#"<x-list items="el:0"></x-list>"#);
		assert!(fixture.emitted.borrow().contains("el:0"));
		assert_eq!(fixture.stash.borrow().keys_of(&fixture.id), vec!["el:0".to_string()]);
	}

	#[rstest]
	fn test_memo_caches_within_pass() {
		let fixture = Fixture::new();
		let cx = fixture.context();
		let calls = core::cell::Cell::new(0);
		let compute = || {
			calls.set(calls.get() + 1);
			42
		};

		assert_eq!(cx.memo("answer", compute), 42);
		assert_eq!(cx.memo("answer", compute), 42);
		assert_eq!(calls.get(), 1);
	}
}
