//! # Morphel Reactive
//!
//! The reactive-update engine of morphel: fine-grained dependency tracking
//! over observable data, deferred notification, and a frame scheduler that
//! coalesces re-render requests.
//!
//! ## Modules
//!
//! - [`runtime`]: the explicit runtime context (context stack, task queue,
//!   wake hook)
//! - [`registry`]: path -> subscriber table
//! - [`observable`]: tracked wrappers over `serde_json::Value`
//! - [`memo`]: per-render memoization of derived getters
//! - [`scheduler`]: pending-update bookkeeping per frame
//! - [`path`]: observable paths
//!
//! ## Example
//!
//! ```
//! use morphel_reactive::{ComponentId, Observable, Runtime};
//! use serde_json::json;
//!
//! let runtime = Runtime::new();
//! let cart = Observable::new(&runtime, json!({ "price": 20 }));
//! let id = ComponentId::new("PRICE-TAG:main");
//! runtime.register_instance(id.clone(), None);
//!
//! {
//!     let _guard = runtime.enter(id.clone());
//!     assert_eq!(cart.get("price").as_i64(), Some(20));
//! }
//!
//! for _ in 0..5 {
//!     cart.set("price", 30).unwrap();
//! }
//! runtime.flush_tasks();
//! assert_eq!(runtime.take_frame(), vec![id]);
//! ```

pub mod config;
pub mod error;
pub mod memo;
pub mod observable;
pub mod path;
pub mod registry;
pub mod runtime;
pub mod scheduler;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, ReactiveResult};
pub use memo::MemoCache;
pub use observable::{LENGTH, Observable, TargetId, Tracked, observable};
pub use path::ObservablePath;
pub use registry::{DependencyRegistry, Invalidation};
pub use runtime::{ComponentId, ContextGuard, Runtime, SubscriberId, Tracking, Wake};
pub use scheduler::FrameScheduler;
