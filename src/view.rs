//! View bindings: a container element plus a callback from state to virtual children.
//!
//! Renders are frame-batched, from the bind onwards; while one is queued, further
//! requests collapse into the same pending promise instead of queueing again.

use crate::{
	app::{App, AppInner},
	evented::EventArg,
	state::AppState,
	value::Value,
	vdom::{Child, EventHandler},
};
use hashbrown::HashMap;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use wasm_bindgen::JsCast;

pub type ViewCallback = Box<dyn Fn(&AppState, &Dispatcher) -> Vec<Child>>;

/// Hands out stable event handlers that dispatch a key with fixed parameters.
///
/// Handlers are memoized per `(key, params)` (deep equality), so a view callback asking
/// for the same dispatch on every render gets the identical handler back and the
/// attribute differ sees no change.
pub struct Dispatcher {
	app: Weak<AppInner>,
	cache: RefCell<HashMap<(Rc<str>, Value), EventHandler>>,
}

impl Dispatcher {
	pub(crate) fn new(app: Weak<AppInner>) -> Self {
		Self {
			app,
			cache: RefCell::new(HashMap::new()),
		}
	}

	pub fn handler(&self, key: &str, params: impl Into<Value>) -> EventHandler {
		let params = params.into();
		let cache_key = (Rc::<str>::from(key), params.clone());
		if let Some(handler) = self.cache.borrow().get(&cache_key) {
			return handler.clone();
		}

		let app = self.app.clone();
		let key = key.to_owned();
		let captured_params = params;
		let handler: EventHandler = Rc::new(move |event: &web_sys::Event| {
			if let Some(inner) = app.upgrade() {
				let target = event.target().and_then(|target| target.dyn_into::<web_sys::Element>().ok());
				App::from_inner(inner).dispatch_with_event(Some(&key), captured_params.clone(), Some(event.clone()), target);
			}
		});
		self.cache.borrow_mut().insert(cache_key, handler.clone());
		handler
	}
}

/// One bound view.
pub struct View {
	parent: web_sys::Element,
	callback: ViewCallback,
	pending: RefCell<Option<js_sys::Promise>>,
	dispatcher: Dispatcher,
}

impl View {
	pub(crate) fn new(parent: web_sys::Element, callback: ViewCallback, app: Weak<AppInner>) -> Self {
		Self {
			parent,
			callback,
			pending: RefCell::new(None),
			dispatcher: Dispatcher::new(app),
		}
	}

	/// Runs the callback against the current snapshot, patches the container and
	/// notifies `render` listeners with the produced root node (or node list, when the
	/// view has several roots). Only ever called from a scheduled frame task.
	pub(crate) fn render_now(&self, inner: &Rc<AppInner>) {
		let state = inner.store.borrow().state();
		let children = (self.callback)(&state, &self.dispatcher);
		let nodes = inner.renderer.borrow_mut().render(&self.parent, children);
		let rendered = if nodes.len() == 1 {
			EventArg::Node(nodes[0].clone())
		} else {
			EventArg::Nodes(nodes)
		};
		inner.evented.emit("render", &[rendered]);
	}

	/// Queues a frame-batched re-render, collapsing into the already pending one if
	/// there is one.
	pub(crate) fn request_render(self: &Rc<Self>, inner: &Rc<AppInner>) -> js_sys::Promise {
		if let Some(pending) = self.pending.borrow().as_ref() {
			return pending.clone();
		}

		let view = Rc::downgrade(self);
		let app = Rc::downgrade(inner);
		let promise = inner.scheduler.schedule(move || {
			let (view, inner) = match (view.upgrade(), app.upgrade()) {
				(Some(view), Some(inner)) => (view, inner),
				_ => return,
			};
			// Cleared before rendering, so a commit from within the render queues anew.
			view.pending.borrow_mut().take();
			view.render_now(&inner);
		});
		*self.pending.borrow_mut() = Some(promise.clone());
		promise
	}
}
