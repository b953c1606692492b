//! Named application events with unsubscribe handles.
//!
//! Notification payloads are positional, matching the host-framework convention of
//! variadic listener arguments.

use crate::{state::AppState, value::Value};
use hashbrown::HashMap;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};

/// One positional argument of an event notification.
#[derive(Clone)]
pub enum EventArg {
	Value(Value),
	State(AppState),
	Event(web_sys::Event),
	Node(web_sys::Node),
	Nodes(Vec<web_sys::Node>),
	Js(wasm_bindgen::JsValue),
}

impl EventArg {
	#[must_use]
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			EventArg::Value(value) => Some(value),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_state(&self) -> Option<&AppState> {
		match self {
			EventArg::State(state) => Some(state),
			_ => None,
		}
	}
}

pub type Listener = Rc<dyn Fn(&[EventArg])>;

struct Registry {
	listeners: HashMap<String, Vec<(u64, Listener)>>,
	next_id: u64,
}

/// An event emitter. Cloning shares the registry.
#[derive(Clone)]
pub struct Evented {
	registry: Rc<RefCell<Registry>>,
}

/// Handle returned by [`Evented::on`]; calling [`cancel`](Subscription::cancel) removes
/// the listener. Holds the registry weakly, so a leaked handle never keeps an emitter alive.
pub struct Subscription {
	registry: Weak<RefCell<Registry>>,
	name: String,
	id: u64,
}

impl Subscription {
	pub fn cancel(&self) {
		if let Some(registry) = self.registry.upgrade() {
			let mut registry = registry.borrow_mut();
			if let Some(listeners) = registry.listeners.get_mut(&self.name) {
				listeners.retain(|(id, _)| *id != self.id);
			}
		}
	}
}

impl Default for Evented {
	fn default() -> Self {
		Self::new()
	}
}

impl Evented {
	#[must_use]
	pub fn new() -> Self {
		Self {
			registry: Rc::new(RefCell::new(Registry {
				listeners: HashMap::new(),
				next_id: 0,
			})),
		}
	}

	pub fn on(&self, name: &str, listener: Listener) -> Subscription {
		let mut registry = self.registry.borrow_mut();
		let id = registry.next_id;
		registry.next_id += 1;
		registry.listeners.entry(name.to_owned()).or_default().push((id, listener));
		Subscription {
			registry: Rc::downgrade(&self.registry),
			name: name.to_owned(),
			id,
		}
	}

	/// Notifies all listeners registered for `name`, in registration order.
	///
	/// The listener list is snapshotted first, so listeners may subscribe or cancel
	/// re-entrantly without affecting the notification in flight.
	pub fn emit(&self, name: &str, args: &[EventArg]) {
		let snapshot: Vec<Listener> = self
			.registry
			.borrow()
			.listeners
			.get(name)
			.map(|listeners| listeners.iter().map(|(_, listener)| listener.clone()).collect())
			.unwrap_or_default();
		for listener in snapshot {
			listener(args);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	#[test]
	fn notifies_in_registration_order() {
		let evented = Evented::new();
		let log = Rc::new(RefCell::new(Vec::new()));

		for tag in ["a", "b", "c"] {
			let log = log.clone();
			evented.on(
				"ping",
				Rc::new(move |_| {
					log.borrow_mut().push(tag);
				}),
			);
		}
		evented.emit("ping", &[]);
		assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
	}

	#[test]
	fn passes_positional_arguments() {
		let evented = Evented::new();
		let seen = Rc::new(RefCell::new(None));
		{
			let seen = seen.clone();
			evented.on(
				"ping",
				Rc::new(move |args| {
					*seen.borrow_mut() = args[0].as_value().cloned();
				}),
			);
		}
		evented.emit("ping", &[EventArg::Value(Value::from(7))]);
		assert_eq!(*seen.borrow(), Some(Value::from(7)));
	}

	#[test]
	fn cancel_removes_only_the_cancelled_listener() {
		let evented = Evented::new();
		let counts = Rc::new((Cell::new(0), Cell::new(0)));

		let first = {
			let counts = counts.clone();
			evented.on("ping", Rc::new(move |_| counts.0.set(counts.0.get() + 1)))
		};
		{
			let counts = counts.clone();
			evented.on("ping", Rc::new(move |_| counts.1.set(counts.1.get() + 1)));
		}

		evented.emit("ping", &[]);
		first.cancel();
		evented.emit("ping", &[]);

		assert_eq!(counts.0.get(), 1);
		assert_eq!(counts.1.get(), 2);
	}

	#[test]
	fn reentrant_cancel_does_not_skip_the_notification_in_flight() {
		let evented = Evented::new();
		let count = Rc::new(Cell::new(0));

		let subscription: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
		let handle = {
			let count = count.clone();
			let subscription = subscription.clone();
			evented.on(
				"ping",
				Rc::new(move |_| {
					count.set(count.get() + 1);
					if let Some(subscription) = subscription.borrow_mut().take() {
						subscription.cancel();
					}
				}),
			)
		};
		*subscription.borrow_mut() = Some(handle);

		evented.emit("ping", &[]);
		evented.emit("ping", &[]);
		assert_eq!(count.get(), 1);
	}

	#[test]
	fn unknown_event_names_are_ignored() {
		let evented = Evented::new();
		evented.emit("nobody-listens", &[EventArg::Value(Value::Null)]);
	}
}
