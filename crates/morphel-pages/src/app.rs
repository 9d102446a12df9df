//! Component shell.
//!
//! An [`App`] owns a host tree, the reactive [`Runtime`] and the component
//! registry. It connects component instances when their host elements appear,
//! renders them into their render roots, and disconnects them when they go
//! away.
//!
//! ## Render pass
//!
//! 1. clear the instance's memo cache and drop its subscriptions
//! 2. rehydrate the render root and the host, then snapshot the host's
//!    attributes and properties
//! 3. render with the instance as the active context
//! 4. parse the markup and morph it into the render root
//! 5. rehydrate again, release stash entries the pass did not emit
//! 6. connect component hosts that appeared, disconnect those that vanished
//!
//! ## Example
//!
//! ```
//! use morphel_pages::dom::MemoryTree;
//! use morphel_pages::{App, Component, Markup, RenderContext};
//! use morphel_reactive::Observable;
//! use serde_json::json;
//!
//! struct Hello {
//!     state: Observable,
//! }
//!
//! impl Component for Hello {
//!     fn render(&self, cx: &RenderContext<'_>) -> Markup {
//!         cx.html().raw("<p>Hello, ").text(self.state.get("name")).raw("</p>").finish()
//!     }
//! }
//!
//! let tree = MemoryTree::new();
//! let mut app = App::new(tree.clone());
//! app.define("hello-world", |runtime| Hello {
//!     state: Observable::new(runtime, json!({ "name": "Ada" })),
//! })
//! .unwrap();
//!
//! let ids = app.mount(&tree.document(), r#"<hello-world key="main"></hello-world>"#).unwrap();
//! let host = app.host_of(&ids[0]).unwrap();
//! assert_eq!(tree.rendered_markup(&host), "<p>Hello, Ada</p>");
//! ```

use core::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use morphel_reactive::{ComponentId, MemoCache, Runtime, SubscriberId};

use crate::component::{AnyComponent, Component, HookContext, RenderContext, erase};
use crate::config::AppConfig;
use crate::dom::{HostError, HostTree};
use crate::error::{PagesError, PagesResult};
use crate::markup::Markup;
use crate::morph::Reconciler;
use crate::stash::{Stash, rehydrate};

type Factory = Rc<dyn Fn(&Runtime) -> Box<dyn AnyComponent>>;

struct Instance<N> {
	tag: String,
	node: N,
	component: Rc<RefCell<Box<dyn AnyComponent>>>,
	memo: Rc<MemoCache>,
	last_markup: Option<Markup>,
}

/// Component registry and instance manager over a host tree.
pub struct App<H: HostTree> {
	host: H,
	runtime: Runtime,
	config: AppConfig,
	components: HashMap<String, Factory>,
	instances: HashMap<ComponentId, Instance<H::Node>>,
	by_node: HashMap<H::Node, ComponentId>,
	stash: RefCell<Stash>,
	seen: HashSet<String>,
	warned: HashSet<String>,
	next_instance: u64,
}

impl<H: HostTree> App<H> {
	/// Creates an app with the default configuration.
	pub fn new(host: H) -> Self {
		Self::with_config(host, AppConfig::default())
	}

	pub fn with_config(host: H, config: AppConfig) -> Self {
		Self {
			host,
			runtime: Runtime::with_config(config.runtime.clone()),
			stash: RefCell::new(Stash::with_prefix(config.stash_prefix.clone())),
			config,
			components: HashMap::new(),
			instances: HashMap::new(),
			by_node: HashMap::new(),
			seen: HashSet::new(),
			warned: HashSet::new(),
			next_instance: 0,
		}
	}

	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn config(&self) -> &AppConfig {
		&self.config
	}

	/// Registers the component type created by `factory` under `tag`.
	///
	/// Tags must be lowercase ASCII, start with a letter and contain a
	/// hyphen. Elements already in the tree are not upgraded; mount them
	/// after defining.
	pub fn define<C, F>(&mut self, tag: &str, factory: F) -> PagesResult<()>
	where
		C: Component,
		F: Fn(&Runtime) -> C + 'static,
	{
		let valid = tag.starts_with(|c: char| c.is_ascii_lowercase())
			&& tag.contains('-')
			&& tag
				.chars()
				.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
		if !valid {
			return Err(PagesError::InvalidTag(tag.to_string()));
		}
		if self.components.contains_key(tag) {
			return Err(PagesError::AlreadyDefined(tag.to_string()));
		}

		self.components
			.insert(tag.to_string(), Rc::new(move |runtime: &Runtime| erase(factory(runtime))));
		tracing::debug!(target: "morphel::render", tag, "defined component");
		Ok(())
	}

	/// Returns `true` if `tag` is a registered component tag.
	pub fn is_defined(&self, tag: &str) -> bool {
		self.components.contains_key(tag)
	}

	/// Parses `markup` into `container` and connects every component host
	/// it contains. Returns the connected instances in document order.
	pub fn mount(&mut self, container: &H::Node, markup: &str) -> PagesResult<Vec<ComponentId>> {
		let fragment = self.host.parse_fragment(markup)?;
		let hosts = self.component_hosts(&fragment);
		self.host.append_child(container, &fragment)?;

		let mut ids = Vec::with_capacity(hosts.len());
		for node in &hosts {
			if !self.by_node.contains_key(node) {
				ids.push(self.connect(node, None)?);
			}
		}
		Ok(ids)
	}

	/// Detaches `node` and disconnects every instance hosted at or below it.
	///
	/// Returns the number of instances disconnected directly; their nested
	/// instances go with them.
	pub fn unmount(&mut self, node: &H::Node) -> PagesResult<usize> {
		if let Some(parent) = self.host.parent(node) {
			self.host.remove_child(&parent, node)?;
		}

		let mut nodes = vec![node.clone()];
		nodes.extend(self.host.descendants(node));
		let ids: Vec<ComponentId> = nodes
			.iter()
			.filter_map(|node| self.by_node.get(node).cloned())
			.collect();
		for id in &ids {
			self.disconnect(id);
		}
		Ok(ids.len())
	}

	/// Renders every instance pending at this frame boundary.
	///
	/// Instances disconnected since they were scheduled are skipped. A
	/// failing render is logged and leaves the other instances unaffected.
	/// Returns the number of instances rendered.
	pub fn frame(&mut self) -> usize {
		let mut rendered = 0;
		for id in self.runtime.take_frame() {
			if !self.instances.contains_key(&id) {
				tracing::debug!(target: "morphel::render", id = %id, "skipped disconnected instance");
				continue;
			}
			match self.render(&id) {
				Ok(()) => rendered += 1,
				Err(error) => tracing::error!(target: "morphel::render", id = %id, %error, "render failed"),
			}
		}
		rendered
	}

	/// Runs queued invalidations, then renders the resulting frame.
	pub fn tick(&mut self) -> usize {
		self.runtime.flush_tasks();
		self.frame()
	}

	/// Ticks until no work is left. Returns the number of renders.
	///
	/// Fails with [`PagesError::Unsettled`] if work remains after the
	/// configured number of rounds.
	pub fn settle(&mut self) -> PagesResult<usize> {
		let limit = self.config.runtime.settle_limit;
		let mut rendered = 0;
		for _ in 0..limit {
			if !self.runtime.has_pending_work() {
				return Ok(rendered);
			}
			rendered += self.tick();
		}
		if self.runtime.has_pending_work() {
			return Err(PagesError::Unsettled { limit });
		}
		Ok(rendered)
	}

	/// Requests a render of `id` at the next frame.
	pub fn request_update(&self, id: &ComponentId) {
		self.runtime.request_update(id);
	}

	/// Renders `id` now.
	///
	/// Does nothing for an unknown instance.
	pub fn render(&mut self, id: &ComponentId) -> PagesResult<()> {
		let Some(instance) = self.instances.get(id) else {
			return Ok(());
		};
		let node = instance.node.clone();
		let tag = instance.tag.clone();
		let component = instance.component.clone();
		let memo = instance.memo.clone();
		let last_markup = instance.last_markup.clone();

		memo.clear();
		self.runtime.unsubscribe(&SubscriberId::Component(id.clone()));

		let root = self.host.render_root(&node);
		rehydrate(&self.host, &self.stash.borrow(), &self.rehydration_scope(&node, &root));

		let emitted = RefCell::new(HashSet::new());
		let markup = {
			let cx = RenderContext {
				id,
				tag: &tag,
				runtime: &self.runtime,
				memo: &memo,
				stash: &self.stash,
				emitted: &emitted,
				attributes: self.host.attributes(&node),
				props: self.host.properties(&node),
			};
			let _guard = self.runtime.enter(id.clone());
			component.borrow().render(&cx)
		};
		let emitted = emitted.into_inner();

		if self.config.skip_identical_renders && last_markup.as_ref() == Some(&markup) {
			self.stash.borrow_mut().sweep(id, &emitted);
			tracing::debug!(target: "morphel::render", id = %id, "identical markup; skipped morph");
			return Ok(());
		}

		let fragment = self.host.parse_fragment(markup.as_str())?;
		let report = {
			let components = &self.components;
			let is_component = |tag: &str| components.contains_key(tag);
			Reconciler::new(&self.host, &is_component).morph(&root, &fragment)?
		};
		for touched in &report.touched {
			if let Some(child) = self.by_node.get(touched) {
				self.runtime.request_update(child);
			}
		}

		rehydrate(&self.host, &self.stash.borrow(), &self.rehydration_scope(&node, &root));
		self.stash.borrow_mut().sweep(id, &emitted);
		if let Some(instance) = self.instances.get_mut(id) {
			instance.last_markup = Some(markup);
		}

		tracing::debug!(
			target: "morphel::render",
			id = %id,
			tag = %tag,
			mutations = report.mutations(),
			"rendered"
		);
		self.sync_children(id, &root);
		Ok(())
	}

	fn rehydration_scope(&self, node: &H::Node, root: &H::Node) -> Vec<H::Node> {
		let mut scope = self.host.descendants(root);
		scope.push(node.clone());
		scope
	}

	fn component_hosts(&self, scope: &H::Node) -> Vec<H::Node> {
		self.host
			.descendants(scope)
			.into_iter()
			.filter(|node| self.host.tag(node).is_some_and(|tag| self.components.contains_key(&tag)))
			.collect()
	}

	/// Brings the instances mounted under `id` in line with the component
	/// hosts now present in its render root.
	fn sync_children(&mut self, id: &ComponentId, root: &H::Node) {
		let hosts = self.component_hosts(root);
		let present: HashSet<&H::Node> = hosts.iter().collect();

		for child in self.runtime.children_of(id) {
			let gone = self
				.instances
				.get(&child)
				.is_none_or(|instance| !present.contains(&instance.node));
			if gone {
				self.disconnect(&child);
			}
		}
		for node in &hosts {
			if self.by_node.contains_key(node) {
				continue;
			}
			if let Err(error) = self.connect(node, Some(id.clone())) {
				tracing::error!(target: "morphel::render", parent = %id, %error, "failed to connect child");
			}
		}
	}

	fn connect(&mut self, node: &H::Node, parent: Option<ComponentId>) -> PagesResult<ComponentId> {
		let tag = self.host.tag(node).ok_or(HostError::NotAnElement)?;
		let factory = self
			.components
			.get(&tag)
			.cloned()
			.ok_or_else(|| PagesError::UnknownComponent(tag.clone()))?;
		let key = self.host.get_attribute(node, "key");
		let repeated = !self.seen.insert(tag.clone());
		let id = self.instance_id(&tag, key.as_deref());
		let hooks = HookContext::new(id.clone(), self.runtime.clone());

		let mut component = factory(&self.runtime);
		component.created(&hooks);

		self.runtime.register_instance(id.clone(), parent.clone());
		let component = Rc::new(RefCell::new(component));
		self.instances.insert(
			id.clone(),
			Instance {
				tag: tag.clone(),
				node: node.clone(),
				component: component.clone(),
				memo: Rc::new(MemoCache::new()),
				last_markup: None,
			},
		);
		self.by_node.insert(node.clone(), id.clone());
		tracing::debug!(
			target: "morphel::render",
			id = %id,
			parent = ?parent.as_ref().map(ComponentId::as_str),
			"connected"
		);

		if let Err(error) = self.render(&id) {
			tracing::error!(target: "morphel::render", id = %id, %error, "render failed");
		}
		if self.instances.contains_key(&id) {
			component.borrow_mut().mounted(&hooks);
		}

		// Only a second keyless instance of a tag is ambiguous.
		if repeated
			&& key.is_none()
			&& self.config.warn_duplicate_keys
			&& self.warned.insert(tag.clone())
		{
			tracing::warn!(
				target: "morphel::render",
				tag = %tag,
				"Each <{tag}> should have a unique `key` attribute"
			);
		}
		Ok(id)
	}

	fn instance_id(&mut self, tag: &str, key: Option<&str>) -> ComponentId {
		let tag = tag.to_ascii_uppercase();
		let base = match key {
			Some(key) => format!("{tag}:{key}"),
			None => {
				self.next_instance += 1;
				format!("{tag}:g{}", self.next_instance)
			}
		};

		let mut id = ComponentId::new(base.as_str());
		let mut suffix = 1;
		while self.instances.contains_key(&id) {
			suffix += 1;
			id = ComponentId::new(format!("{base}#{suffix}"));
		}
		if suffix > 1 {
			tracing::warn!(target: "morphel::render", base = %base, id = %id, "duplicate component key");
		}
		id
	}

	fn disconnect(&mut self, id: &ComponentId) {
		let Some(instance) = self.instances.remove(id) else {
			return;
		};
		let children = self.runtime.children_of(id);

		instance
			.component
			.borrow_mut()
			.unmounted(&HookContext::new(id.clone(), self.runtime.clone()));
		self.runtime.forget_instance(id);
		self.by_node.remove(&instance.node);
		self.stash.borrow_mut().drop_owner(id);
		tracing::debug!(target: "morphel::render", id = %id, "disconnected");

		for child in children {
			self.disconnect(&child);
		}
	}

	/// Instance hosted by `node`.
	pub fn instance_at(&self, node: &H::Node) -> Option<&ComponentId> {
		self.by_node.get(node)
	}

	/// Host element of `id`.
	pub fn host_of(&self, id: &ComponentId) -> Option<H::Node> {
		self.instances.get(id).map(|instance| instance.node.clone())
	}

	/// Returns `true` if `id` is connected.
	pub fn is_connected(&self, id: &ComponentId) -> bool {
		self.instances.contains_key(id)
	}

	/// Live instances of `tag`, sorted by id.
	pub fn instances_of(&self, tag: &str) -> PagesResult<Vec<ComponentId>> {
		if !self.components.contains_key(tag) {
			return Err(PagesError::UnknownComponent(tag.to_string()));
		}
		let mut ids: Vec<ComponentId> = self
			.instances
			.iter()
			.filter(|(_, instance)| instance.tag == tag)
			.map(|(id, _)| id.clone())
			.collect();
		ids.sort();
		Ok(ids)
	}

	/// Element in the render root of `id` carrying `ref="name"`.
	pub fn refs(&self, id: &ComponentId, name: &str) -> Option<H::Node> {
		let instance = self.instances.get(id)?;
		let root = self.host.existing_render_root(&instance.node)?;
		self.host.find_by_attribute(&root, "ref", name)
	}

	/// Number of live stash entries.
	pub fn stash_len(&self) -> usize {
		self.stash.borrow().len()
	}

	/// Stash keys owned by `id`.
	pub fn stash_keys_of(&self, id: &ComponentId) -> Vec<String> {
		self.stash.borrow().keys_of(id)
	}
}

impl<H: HostTree> core::fmt::Debug for App<H> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let mut tags: Vec<&String> = self.components.keys().collect();
		tags.sort();
		f.debug_struct("App")
			.field("components", &tags)
			.field("instances", &self.instances.len())
			.field("stash", &self.stash.borrow().len())
			.field("runtime", &self.runtime)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::MemoryTree;
	use rstest::rstest;

	struct Static(&'static str);

	impl Component for Static {
		fn render(&self, cx: &RenderContext<'_>) -> Markup {
			cx.html().raw(self.0).finish()
		}
	}

	#[rstest]
	#[case("nohyphen")]
	#[case("Upper-case")]
	#[case("1-digit")]
	#[case("has space-x")]
	fn test_define_rejects_invalid_tags(#[case] tag: &str) {
		let mut app = App::new(MemoryTree::new());
		let result = app.define(tag, |_| Static(""));
		assert!(matches!(result, Err(PagesError::InvalidTag(_))));
	}

	#[rstest]
	fn test_define_twice_fails() {
		let mut app = App::new(MemoryTree::new());
		app.define("x-a", |_| Static("")).unwrap();
		assert!(matches!(app.define("x-a", |_| Static("")), Err(PagesError::AlreadyDefined(_))));
		assert!(app.is_defined("x-a"));
	}

	#[rstest]
	fn test_ids_from_keys_and_fallbacks() {
		let tree = MemoryTree::new();
		let mut app = App::new(tree.clone());
		app.define("x-a", |_| Static("")).unwrap();

		let ids = app
			.mount(&tree.document(), r#"<x-a key="k"></x-a><x-a></x-a><x-a key="k"></x-a>"#)
			.unwrap();

		let names: Vec<&str> = ids.iter().map(ComponentId::as_str).collect();
		assert_eq!(names, vec!["X-A:k", "X-A:g1", "X-A:k#2"]);
	}

	#[rstest]
	fn test_unknown_tag_query_fails() {
		let app = App::new(MemoryTree::new());
		assert!(matches!(app.instances_of("x-none"), Err(PagesError::UnknownComponent(_))));
	}

	#[rstest]
	fn test_render_failure_keeps_instance_connected() {
		let tree = MemoryTree::new();
		let mut app = App::new(tree.clone());
		app.define("x-broken", |_| Static("<p class=\"open")).unwrap();

		let ids = app.mount(&tree.document(), "<x-broken></x-broken>").unwrap();

		assert!(app.is_connected(&ids[0]));
		assert!(matches!(app.render(&ids[0]), Err(PagesError::Host(HostError::Parse { .. }))));
	}

	struct Restless;

	impl Component for Restless {
		fn render(&self, cx: &RenderContext<'_>) -> Markup {
			cx.runtime().request_update(cx.id());
			Markup::default()
		}
	}

	#[rstest]
	fn test_settle_reports_runaway_updates() {
		let tree = MemoryTree::new();
		let mut config = AppConfig::default();
		config.runtime.settle_limit = 3;
		let mut app = App::with_config(tree.clone(), config);
		app.define("x-restless", |_| Restless).unwrap();
		app.mount(&tree.document(), "<x-restless></x-restless>").unwrap();

		assert!(matches!(app.settle(), Err(PagesError::Unsettled { limit: 3 })));
	}
}
