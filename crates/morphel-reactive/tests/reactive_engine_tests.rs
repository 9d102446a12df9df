//! Integration tests for the reactive engine
//!
//! These tests verify:
//! 1. A write is visible to the next read and invalidates each reader once
//! 2. Only readers of the written path are invalidated
//! 3. Repeated update requests collapse into one frame entry
//! 4. Watchers run on the task queue, after the write

use morphel_reactive::{
	ComponentId, Observable, ObservablePath, Runtime, RuntimeConfig, SubscriberId, Wake,
};
use proptest::prelude::*;
use rstest::*;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ============================================================================
// Fixtures
// ============================================================================

#[fixture]
fn runtime() -> Runtime {
	Runtime::new()
}

fn render_reading(runtime: &Runtime, id: &ComponentId, read: impl FnOnce()) {
	let _guard = runtime.enter(id.clone());
	runtime.unsubscribe(&SubscriberId::Component(id.clone()));
	read();
}

// ============================================================================
// Write-then-read consistency
// ============================================================================

#[rstest]
fn test_write_then_read_invalidates_once(runtime: Runtime) {
	let state = Observable::new(&runtime, json!({ "price": 20 }));
	let tag = ComponentId::new("PRICE-TAG:main");
	runtime.register_instance(tag.clone(), None);
	render_reading(&runtime, &tag, || {
		let _ = state.get("price");
	});

	state.set("price", 30).unwrap();

	assert_eq!(state.get("price").as_i64(), Some(30));
	assert_eq!(runtime.flush_tasks(), 1);
	assert_eq!(runtime.take_frame(), vec![tag]);
	assert!(!runtime.has_pending_work());
}

#[rstest]
fn test_precision_across_siblings(runtime: Runtime) {
	let state = Observable::at(&runtime, json!({ "a": 1, "b": 2 }), "state");
	let reads_a = ComponentId::new("A:1");
	let reads_b = ComponentId::new("B:1");
	runtime.register_instance(reads_a.clone(), None);
	runtime.register_instance(reads_b.clone(), None);
	render_reading(&runtime, &reads_a, || {
		let _ = state.get("a");
	});
	render_reading(&runtime, &reads_b, || {
		let _ = state.get("b");
	});

	state.set("a", 10).unwrap();
	runtime.flush_tasks();

	assert_eq!(runtime.take_frame(), vec![reads_a]);
	assert!(!runtime.is_pending(&reads_b));
}

#[rstest]
fn test_rerender_drops_stale_dependencies(runtime: Runtime) {
	let state = Observable::at(&runtime, json!({ "show": true, "detail": "x" }), "s");
	let id = ComponentId::new("PANEL:1");
	runtime.register_instance(id.clone(), None);

	render_reading(&runtime, &id, || {
		let _ = state.get("show");
		let _ = state.get("detail");
	});
	render_reading(&runtime, &id, || {
		let _ = state.get("show");
	});

	assert_eq!(runtime.dependencies_of(&id), vec![ObservablePath::from("s/show")]);
	state.set("detail", "y").unwrap();
	assert_eq!(runtime.pending_tasks(), 0);
}

// ============================================================================
// Scheduling
// ============================================================================

#[rstest]
#[case(1)]
#[case(2)]
#[case(50)]
fn test_many_requests_one_frame_entry(runtime: Runtime, #[case] requests: usize) {
	let id = ComponentId::new("COUNTER:1");
	runtime.register_instance(id.clone(), None);

	for _ in 0..requests {
		runtime.request_update(&id);
	}

	assert_eq!(runtime.take_frame(), vec![id]);
	assert!(runtime.take_frame().is_empty());
}

#[rstest]
fn test_cascade_can_be_disabled() {
	let runtime = Runtime::with_config(RuntimeConfig {
		cascade_invalidation: false,
		..RuntimeConfig::default()
	});
	let parent = ComponentId::new("LIST:1");
	let child = ComponentId::new("ROW:1");
	runtime.register_instance(parent.clone(), None);
	runtime.register_instance(child.clone(), Some(parent.clone()));

	runtime.invalidate(&parent);

	assert_eq!(runtime.take_frame(), vec![parent]);
}

#[rstest]
fn test_cascade_schedules_children(runtime: Runtime) {
	let parent = ComponentId::new("LIST:1");
	let child = ComponentId::new("ROW:1");
	runtime.register_instance(parent.clone(), None);
	runtime.register_instance(child.clone(), Some(parent.clone()));

	runtime.invalidate(&parent);

	assert_eq!(runtime.take_frame(), vec![parent, child]);
}

#[rstest]
fn test_wake_hook_sees_one_frame_wake_per_frame(runtime: Runtime) {
	let frames = Rc::new(Cell::new(0));
	let counter = frames.clone();
	runtime.set_scheduler(move |wake| {
		if wake == Wake::Frame {
			counter.set(counter.get() + 1);
		}
	});
	let a = ComponentId::new("A:1");
	let b = ComponentId::new("B:1");
	runtime.register_instance(a.clone(), None);
	runtime.register_instance(b.clone(), None);

	runtime.request_update(&a);
	runtime.request_update(&b);
	assert_eq!(frames.get(), 1);

	runtime.take_frame();
	runtime.request_update(&a);
	assert_eq!(frames.get(), 2);
}

// ============================================================================
// Watchers
// ============================================================================

#[rstest]
fn test_watch_runs_on_task_queue(runtime: Runtime) {
	let state = Observable::new(&runtime, json!({ "user": { "name": "ada" } }));
	let seen = Rc::new(RefCell::new(Vec::new()));

	let log = seen.clone();
	let reader = state.clone();
	let watcher = runtime
		.watch(
			|| state.get("user").into_observable().map(|user| user.get("name")),
			move || {
				let name = reader
					.get("user")
					.into_observable()
					.and_then(|user| user.get("name").as_str().map(str::to_string));
				log.borrow_mut().push(name);
			},
		)
		.unwrap();

	state
		.get("user")
		.into_observable()
		.unwrap()
		.set("name", "grace")
		.unwrap();
	assert!(seen.borrow().is_empty());

	runtime.flush_tasks();
	assert_eq!(*seen.borrow(), vec![Some("grace".to_string())]);

	runtime.unsubscribe(&watcher);
	state
		.get("user")
		.into_observable()
		.unwrap()
		.set("name", "linus")
		.unwrap();
	assert_eq!(runtime.flush_tasks(), 0);
}

#[rstest]
fn test_watch_without_reads_returns_none(runtime: Runtime) {
	assert!(runtime.watch(|| 1 + 1, || {}).is_none());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
	#[test]
	fn prop_last_write_wins(values in proptest::collection::vec(-1000i64..1000, 1..20)) {
		let runtime = Runtime::new();
		let state = Observable::new(&runtime, json!({ "value": 0 }));
		let id = ComponentId::new("VALUE:1");
		runtime.register_instance(id.clone(), None);
		render_reading(&runtime, &id, || {
			let _ = state.get("value");
		});

		for value in &values {
			state.set("value", *value).unwrap();
		}
		runtime.flush_tasks();

		prop_assert_eq!(state.get("value").as_i64(), values.last().copied());
		prop_assert_eq!(runtime.take_frame(), vec![id]);
	}
}
