//! # Morphel
//!
//! A minimal reactive component runtime. Components render markup from
//! observable data; the runtime records which instance read which path,
//! re-renders exactly those instances once per frame when a path changes,
//! and morphs the fresh markup into the live tree in place.
//!
//! ## Crates
//!
//! - [`reactive`] (`morphel-reactive`): runtime context, observables,
//!   dependency registry, memo cache and frame scheduler
//! - [`pages`] (`morphel-pages`, feature `pages`): host tree, markup builder,
//!   stash bridge, reconciler and component shell
//!
//! ## Feature Flags
//!
//! - `pages` (default): the component layer and [`conf`]
//!
//! ## Quick Example
//!
//! ```
//! use morphel::prelude::*;
//! use serde_json::json;
//!
//! struct Greeting {
//!     state: Observable,
//! }
//!
//! impl Component for Greeting {
//!     fn render(&self, cx: &RenderContext<'_>) -> Markup {
//!         cx.html().raw("<h1>").text(self.state.get("name")).raw("</h1>").finish()
//!     }
//! }
//!
//! let tree = MemoryTree::new();
//! let mut app = App::new(tree.clone());
//! let state = Observable::new(app.runtime(), json!({ "name": "world" }));
//! let shared = state.clone();
//! app.define("x-greeting", move |_| Greeting { state: shared.clone() }).unwrap();
//!
//! let ids = app.mount(&tree.document(), r#"<x-greeting key="g"></x-greeting>"#).unwrap();
//! state.set("name", "morphel").unwrap();
//! app.settle().unwrap();
//!
//! let host = app.host_of(&ids[0]).unwrap();
//! assert_eq!(tree.rendered_markup(&host), "<h1>morphel</h1>");
//! ```

#[cfg(feature = "pages")]
pub mod conf;

/// Reactive engine.
pub mod reactive {
	pub use morphel_reactive::*;
}

/// Component layer.
#[cfg(feature = "pages")]
pub mod pages {
	pub use morphel_pages::*;
}

pub use morphel_reactive::{
	ComponentId, MemoCache, Observable, ObservablePath, ReactiveError, ReactiveResult, Runtime,
	RuntimeConfig, Tracked, Wake,
};

#[cfg(feature = "pages")]
pub use morphel_pages::{
	App, AppConfig, Callback, Component, Event, HookContext, Html, Lifecycle, Markup,
	PagesError, PagesResult, Prop, RenderContext, raw,
};

/// Commonly used items.
pub mod prelude {
	pub use morphel_reactive::{ComponentId, Observable, Runtime, Tracked};

	#[cfg(feature = "pages")]
	pub use morphel_pages::dom::{HostTree, MemoryTree};
	#[cfg(feature = "pages")]
	pub use morphel_pages::{
		App, Callback, Component, Event, Lifecycle, Markup, Prop, RenderContext, raw,
	};
}
