//! The application shell: one value ties together the state store, the ordered
//! action/route registry, the event emitter, the frame-batched renderer and the
//! document-level delegation bridge.
//!
//! Everything hangs off a reference-counted core, so several applications can coexist
//! on one page without any process-wide state.

use crate::{
	bridge::Bridge,
	diff::{HydrationHook, Renderer},
	dispatch::{resolve, Entry, Handler, Kind, Matcher, Outcome, Resolved},
	evented::{EventArg, Evented, Listener, Subscription},
	router::{normalize_path, Route},
	schedule::Scheduler,
	state::{AppState, Reducer, Store},
	value::{Value, ValueMap},
	vdom::Child,
	view::{Dispatcher, View, ViewCallback},
};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::error;
use wasm_bindgen::{JsValue, UnwrapThrowExt};

pub(crate) struct AppInner {
	pub(crate) store: RefCell<Store>,
	pub(crate) registry: RefCell<Vec<Entry>>,
	pub(crate) evented: Evented,
	pub(crate) scheduler: Scheduler,
	pub(crate) renderer: RefCell<Renderer>,
	pub(crate) views: RefCell<Vec<Rc<View>>>,
	bridge: RefCell<Option<Bridge>>,
}

/// A client-side application. Cloning shares the instance.
#[derive(Clone)]
pub struct App {
	inner: Rc<AppInner>,
}

/// How a path change enters the session history.
#[derive(Clone, Copy)]
enum HistoryMode {
	Push,
	Replace,
}

impl App {
	/// Creates an application with the given initial state and installs the document
	/// delegation listeners.
	///
	/// The `title` state entry and the document title reconcile at construction: a
	/// provided entry is written to the document, otherwise the document's current
	/// title seeds the entry.
	#[must_use]
	pub fn new(initial: ValueMap) -> Self {
		let document = web_sys::window()
			.expect_throw("no `window` global")
			.document()
			.expect_throw("no `document` global");

		let mut initial = initial;
		match initial.get("title") {
			Some(title) => document.set_title(&title.to_text()),
			None => {
				initial.insert(Rc::from("title"), Value::string(document.title()));
			}
		}

		let inner = Rc::new(AppInner {
			store: RefCell::new(Store::new(initial)),
			registry: RefCell::new(Vec::new()),
			evented: Evented::new(),
			scheduler: Scheduler::new(),
			renderer: RefCell::new(Renderer::new()),
			views: RefCell::new(Vec::new()),
			bridge: RefCell::new(None),
		});
		*inner.bridge.borrow_mut() = Some(Bridge::install(&inner));
		Self { inner }
	}

	pub(crate) fn from_inner(inner: Rc<AppInner>) -> Self {
		Self { inner }
	}

	#[must_use]
	pub fn state(&self) -> AppState {
		self.inner.store.borrow().state()
	}

	/// The current normalized location path.
	#[must_use]
	pub fn path(&self) -> String {
		let pathname = web_sys::window()
			.expect_throw("no `window` global")
			.location()
			.pathname()
			.unwrap_or_else(|_| "/".to_owned());
		normalize_path(&pathname)
	}

	pub fn on(&self, name: &str, listener: Listener) -> Subscription {
		self.inner.evented.on(name, listener)
	}

	pub fn emit(&self, name: &str, args: &[EventArg]) {
		self.inner.evented.emit(name, args);
	}

	/// Registers a named mutation.
	pub fn mutation(&self, name: &str, reducer: impl Fn(&AppState, &Value) -> Value + 'static) {
		self.inner.store.borrow_mut().add_mutation(name, Box::new(reducer) as Reducer);
	}

	/// Commits a mutation: advances the state snapshot, syncs the document title,
	/// notifies `mutation` listeners and queues a re-render of every bound view.
	///
	/// Returns the partial state the mutation produced, or `None` for an unknown name.
	pub fn commit(&self, name: &str, payload: Value) -> Option<Value> {
		let commit = self.inner.store.borrow_mut().commit(name, &payload)?;

		let next_title = commit.next.get("title").map(Value::to_text);
		if let Some(next_title) = next_title {
			if commit.previous.get("title").map(Value::to_text).as_ref() != Some(&next_title) {
				if let Some(document) = web_sys::window().and_then(|window| window.document()) {
					document.set_title(&next_title);
				}
			}
		}

		self.inner.evented.emit(
			"mutation",
			&[
				EventArg::Value(Value::string(name)),
				EventArg::State(commit.previous),
				EventArg::State(commit.next),
				EventArg::Value(commit.partial.clone()),
			],
		);
		self.request_renders();
		Some(commit.partial)
	}

	/// Batch form of [`mutation`](App::mutation).
	pub fn mutations(&self, reducers: Vec<(&str, Reducer)>) {
		let mut store = self.inner.store.borrow_mut();
		for (name, reducer) in reducers {
			store.add_mutation(name, reducer);
		}
	}

	/// Batch form of [`action`](App::action).
	pub fn actions(&self, handlers: Vec<(&str, Handler)>) {
		for (name, handler) in handlers {
			self.action(name, handler);
		}
	}

	/// Batch form of [`route`](App::route).
	pub fn routes(&self, handlers: Vec<(&str, Handler)>) {
		for (pattern, handler) in handlers {
			self.route(pattern, handler);
		}
	}

	/// Registers an action under a literal name.
	pub fn action(&self, name: &str, handler: Handler) {
		self.inner.registry.borrow_mut().push(Entry {
			matcher: Matcher::Action(name.to_owned()),
			handler: Rc::new(handler),
		});
	}

	/// Registers a route under a path pattern.
	pub fn route(&self, pattern: &str, handler: Handler) {
		self.inner.registry.borrow_mut().push(Entry {
			matcher: Matcher::Route(Route::compile(pattern)),
			handler: Rc::new(handler),
		});
	}

	/// Invokes the first registered entry matching `key`.
	///
	/// `None` as the key dispatches the current location path. Unmatched keys are a
	/// no-op returning `None`.
	pub fn dispatch(&self, key: Option<&str>, params: Value) -> Option<Outcome> {
		self.dispatch_with_event(key, params, None, None)
	}

	pub(crate) fn dispatch_with_event(
		&self,
		key: Option<&str>,
		params: Value,
		event: Option<web_sys::Event>,
		target: Option<web_sys::Element>,
	) -> Option<Outcome> {
		let key = match key {
			Some(key) if key.starts_with('/') => normalize_path(key),
			Some(key) => key.to_owned(),
			None => self.path(),
		};
		let (resolved, handler) = {
			let registry = self.inner.registry.borrow();
			let resolved = resolve(&registry, &key)?;
			let handler = registry[resolved.index].handler.clone();
			(resolved, handler)
		};
		Some(self.invoke(&handler, resolved, &key, params, event, target))
	}

	/// Matches a route, pushes the new path onto the session history and invokes the
	/// handler. No-op when the path is already current or nothing matches.
	pub fn navigate(&self, path: &str) -> Option<Outcome> {
		self.change_path(path, HistoryMode::Push, None, None)
	}

	/// Like [`navigate`](App::navigate), but replaces the current history entry.
	pub fn redirect(&self, path: &str) -> Option<Outcome> {
		self.change_path(path, HistoryMode::Replace, None, None)
	}

	/// Binds a view to the first element matching a selector and schedules its first
	/// render; the bind and any state commits in the same turn collapse into one
	/// render on the next animation frame.
	pub fn view(&self, selector: &str, callback: impl Fn(&AppState, &Dispatcher) -> Vec<Child> + 'static) {
		let parent = web_sys::window()
			.expect_throw("no `window` global")
			.document()
			.expect_throw("no `document` global")
			.query_selector(selector)
			.unwrap_throw()
			.expect_throw("no element matches the view selector");
		self.view_element(parent, callback);
	}

	/// Binds a view directly to a container element.
	pub fn view_element(&self, parent: web_sys::Element, callback: impl Fn(&AppState, &Dispatcher) -> Vec<Child> + 'static) {
		let view = Rc::new(View::new(parent, Box::new(callback) as ViewCallback, Rc::downgrade(&self.inner)));
		self.inner.views.borrow_mut().push(view.clone());
		view.request_render(&self.inner);
	}

	/// Hands the application to an extension point.
	pub fn use_plugin(&self, plugin: impl FnOnce(&App)) {
		plugin(self);
	}

	/// Registers a hook that runs for every element recovered from pre-rendered HTML.
	pub fn hydration_hook(&self, hook: HydrationHook) {
		self.inner.renderer.borrow_mut().add_hydration_hook(hook);
	}

	fn request_renders(&self) {
		let views: Vec<Rc<View>> = self.inner.views.borrow().clone();
		for view in views {
			view.request_render(&self.inner);
		}
	}

	fn change_path(&self, path: &str, mode: HistoryMode, event: Option<web_sys::Event>, target: Option<web_sys::Element>) -> Option<Outcome> {
		let path = normalize_path(path);
		if path == self.path() {
			return None;
		}
		let (resolved, handler) = {
			let registry = self.inner.registry.borrow();
			let resolved = resolve(&registry, &path)?;
			let handler = registry[resolved.index].handler.clone();
			(resolved, handler)
		};

		// The history entry changes before the handler runs, so the handler already
		// observes the new location.
		let history = web_sys::window().expect_throw("no `window` global").history().unwrap_throw();
		let result = match mode {
			HistoryMode::Push => history.push_state_with_url(&JsValue::NULL, "", Some(&path)),
			HistoryMode::Replace => history.replace_state_with_url(&JsValue::NULL, "", Some(&path)),
		};
		if let Err(error) = result {
			error!("could not update the session history: {:?}", error);
			return None;
		}
		self.inner.evented.emit("pathchange", &[EventArg::Value(Value::string(&path))]);
		Some(self.invoke(&handler, resolved, &path, Value::Null, event, target))
	}

	/// Delegated link/submit entry point. Returns whether the key matched (and the
	/// default browsing behavior must be suppressed).
	pub(crate) fn handle_dispatch_key(&self, key: &str, event: &web_sys::Event, target: &web_sys::Element) -> bool {
		if key.starts_with('/') {
			self.change_path(key, HistoryMode::Push, Some(event.clone()), Some(target.clone())).is_some()
		} else {
			self.dispatch_with_event(Some(key), Value::Null, Some(event.clone()), Some(target.clone()))
				.is_some()
		}
	}

	fn invoke(
		&self,
		handler: &Handler,
		resolved: Resolved,
		key: &str,
		caller_params: Value,
		event: Option<web_sys::Event>,
		target: Option<web_sys::Element>,
	) -> Outcome {
		let params = match resolved.params {
			Some(captures) => Value::Map(Rc::new(captures)),
			None => caller_params,
		};
		let context = Context {
			kind: resolved.kind,
			key: key.to_owned(),
			state: self.state(),
			params: params.clone(),
			event: event.clone(),
			target,
			app: Rc::downgrade(&self.inner),
		};

		let outcome = match handler {
			Handler::Sync(handler) => Outcome::Value(handler(&context)),
			Handler::Async(handler) => {
				let mut settlers = None;
				let promise = js_sys::Promise::new(&mut |resolve, reject| {
					settlers = Some((resolve, reject));
				});
				let (resolve, reject) = settlers.expect_throw("the promise executor runs synchronously");
				handler(&context, resolve, reject);
				Outcome::Promise(promise)
			}
		};

		let outcome_arg = match &outcome {
			Outcome::Value(value) => EventArg::Value(value.clone()),
			Outcome::Promise(promise) => EventArg::Js(promise.clone().into()),
		};
		let event_arg = match event {
			Some(event) => EventArg::Event(event),
			None => EventArg::Value(Value::Null),
		};
		self.inner.evented.emit(
			"dispatch",
			&[
				EventArg::Value(Value::string(resolved.kind.as_str())),
				EventArg::Value(Value::string(key)),
				EventArg::State(self.state()),
				EventArg::Value(params),
				event_arg,
				outcome_arg,
			],
		);
		outcome
	}
}

/// What a handler sees: the resolved key, the state snapshot at invocation, the
/// parameters (route captures or caller-supplied) and the triggering DOM event, plus
/// re-entrant access to the application.
pub struct Context {
	kind: Kind,
	key: String,
	state: AppState,
	params: Value,
	event: Option<web_sys::Event>,
	target: Option<web_sys::Element>,
	app: Weak<AppInner>,
}

impl Context {
	#[must_use]
	pub fn kind(&self) -> Kind {
		self.kind
	}

	#[must_use]
	pub fn key(&self) -> &str {
		&self.key
	}

	#[must_use]
	pub fn state(&self) -> &AppState {
		&self.state
	}

	#[must_use]
	pub fn params(&self) -> &Value {
		&self.params
	}

	#[must_use]
	pub fn event(&self) -> Option<&web_sys::Event> {
		self.event.as_ref()
	}

	/// The element the delegated event resolved against (the anchor or form), when the
	/// dispatch came from the bridge.
	#[must_use]
	pub fn target(&self) -> Option<&web_sys::Element> {
		self.target.as_ref()
	}

	/// The owning application, unless it has been dropped.
	#[must_use]
	pub fn app(&self) -> Option<App> {
		self.app.upgrade().map(App::from_inner)
	}

	pub fn commit(&self, name: &str, payload: Value) -> Option<Value> {
		self.app()?.commit(name, payload)
	}

	pub fn dispatch(&self, key: Option<&str>, params: Value) -> Option<Outcome> {
		self.app()?.dispatch(key, params)
	}

	pub fn navigate(&self, path: &str) -> Option<Outcome> {
		self.app()?.navigate(path)
	}

	pub fn redirect(&self, path: &str) -> Option<Outcome> {
		self.app()?.redirect(path)
	}

	pub fn emit(&self, name: &str, args: &[EventArg]) {
		if let Some(app) = self.app() {
			app.emit(name, args);
		}
	}
}
