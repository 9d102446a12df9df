//! # Morphel Pages
//!
//! The component layer of morphel: a host tree abstraction with an in-memory
//! implementation, a markup builder, the stash bridge that carries
//! non-serializable attribute values through markup, the tree reconciler,
//! and the component shell tying them to the reactive runtime.
//!
//! ## Modules
//!
//! - [`dom`]: the [`HostTree`](dom::HostTree) trait and
//!   [`MemoryTree`](dom::MemoryTree)
//! - [`markup`]: [`Markup`], [`Html`] and escaping
//! - [`stash`]: attribute stash and rehydration
//! - [`morph`]: the reconciler
//! - [`component`]: the [`Component`] trait and render context
//! - [`app`]: the component shell
//!
//! ## Example
//!
//! ```
//! use morphel_pages::dom::MemoryTree;
//! use morphel_pages::{App, Component, Markup, RenderContext};
//! use morphel_reactive::Observable;
//! use serde_json::json;
//!
//! struct PriceTag {
//!     state: Observable,
//! }
//!
//! impl Component for PriceTag {
//!     fn render(&self, cx: &RenderContext<'_>) -> Markup {
//!         let price = self.state.get("price").as_f64().unwrap_or_default();
//!         cx.html().raw("<span>").text(format!("${price:.2}")).raw("</span>").finish()
//!     }
//! }
//!
//! let tree = MemoryTree::new();
//! let mut app = App::new(tree.clone());
//! let state = Observable::new(app.runtime(), json!({ "price": 20 }));
//! let shared = state.clone();
//! app.define("price-tag", move |_| PriceTag { state: shared.clone() }).unwrap();
//!
//! let ids = app.mount(&tree.document(), r#"<price-tag key="main"></price-tag>"#).unwrap();
//! let host = app.host_of(&ids[0]).unwrap();
//! assert_eq!(tree.rendered_markup(&host), "<span>$20.00</span>");
//!
//! state.set("price", 30).unwrap();
//! app.tick();
//! assert_eq!(tree.rendered_markup(&host), "<span>$30.00</span>");
//! ```

pub mod app;
pub mod callback;
pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod markup;
pub mod morph;
pub mod prop;
pub mod stash;

pub use app::App;
pub use callback::{Callback, Event};
pub use component::{Component, Hook, HookContext, Lifecycle, RenderContext};
pub use config::AppConfig;
pub use error::{PagesError, PagesResult};
pub use markup::{Html, Markup, ToMarkup, escape, raw, unescape};
pub use morph::{MorphReport, Reconciler};
pub use prop::{Prop, PropIdentity};
pub use stash::{Stash, StashScope, rehydrate};
