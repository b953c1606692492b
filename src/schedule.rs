//! Frame-batched task scheduling.
//!
//! Tasks queue in FIFO order and run inside a single `requestAnimationFrame` callback,
//! draining until a fixed time budget is spent. At least one task runs per frame; work
//! left over re-requests a frame, so a burst of scheduled renders amortizes across
//! frames instead of blocking one.

use std::{
	cell::RefCell,
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::error;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue, UnwrapThrowExt};

/// Per-frame task budget in milliseconds. Frames above ~60 Hz leave roughly 16 ms of
/// wall time; reserving the rest keeps layout and paint inside the same frame.
const FRAME_BUDGET_MS: f64 = 5.0;

struct Inner {
	queue: VecDeque<Box<dyn FnOnce()>>,
	frame_requested: bool,
	on_frame: Option<Closure<dyn FnMut(f64)>>,
}

/// A shared frame-batched task queue.
#[derive(Clone)]
pub struct Scheduler {
	inner: Rc<RefCell<Inner>>,
}

impl Scheduler {
	#[must_use]
	pub fn new() -> Self {
		let inner = Rc::new(RefCell::new(Inner {
			queue: VecDeque::new(),
			frame_requested: false,
			on_frame: None,
		}));
		// The frame callback only holds the queue weakly, so dropping the last
		// `Scheduler` cancels outstanding work instead of leaking a cycle.
		let weak: Weak<RefCell<Inner>> = Rc::downgrade(&inner);
		let on_frame = Closure::wrap(Box::new(move |_timestamp: f64| {
			if let Some(inner) = weak.upgrade() {
				run_frame(&inner);
			}
		}) as Box<dyn FnMut(f64)>);
		inner.borrow_mut().on_frame = Some(on_frame);
		Self { inner }
	}

	/// Queues a task for the next animation frame.
	///
	/// The returned promise resolves after the task has run. Note that the promise
	/// settles in its own microtask; the task itself runs synchronously within the frame.
	pub fn schedule(&self, task: impl FnOnce() + 'static) -> js_sys::Promise {
		let mut resolve_handle = None;
		let promise = js_sys::Promise::new(&mut |resolve, _reject| {
			resolve_handle = Some(resolve);
		});
		let resolve = resolve_handle.expect_throw("the promise executor runs synchronously");

		let mut inner = self.inner.borrow_mut();
		inner.queue.push_back(Box::new(move || {
			task();
			resolve.call0(&JsValue::NULL).unwrap_throw();
		}));
		if !inner.frame_requested {
			request_frame(&mut inner);
		}
		promise
	}
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}

fn request_frame(inner: &mut Inner) {
	let on_frame = inner.on_frame.as_ref().expect_throw("the frame callback is installed at construction");
	match web_sys::window()
		.expect_throw("no `window` global")
		.request_animation_frame(on_frame.as_ref().unchecked_ref())
	{
		Ok(_handle) => inner.frame_requested = true,
		Err(error) => error!("could not request an animation frame: {:?}", error),
	}
}

fn run_frame(inner: &Rc<RefCell<Inner>>) {
	let performance = web_sys::window()
		.expect_throw("no `window` global")
		.performance()
		.expect_throw("no `performance` global");
	let start = performance.now();
	inner.borrow_mut().frame_requested = false;

	loop {
		// Tasks run without the queue borrowed; they are free to schedule more work.
		let task = inner.borrow_mut().queue.pop_front();
		match task {
			Some(task) => task(),
			None => break,
		}
		if performance.now() - start >= FRAME_BUDGET_MS {
			break;
		}
	}

	let mut inner = inner.borrow_mut();
	if !inner.queue.is_empty() && !inner.frame_requested {
		request_frame(&mut inner);
	}
}
