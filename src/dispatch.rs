//! The action/route registry and key resolution.
//!
//! Actions match by literal name, routes by compiled path pattern. A single ordered
//! registry holds both; the first entry matching a dispatch key wins. Path-shaped keys
//! (leading `/`) only consult routes and bare names only consult actions, so an action
//! can never shadow a route or vice versa.

use crate::{
	router::Route,
	value::{Value, ValueMap},
};
use std::rc::Rc;

/// What a registry entry matches against.
pub enum Matcher {
	Action(String),
	Route(Route),
}

/// Whether a dispatch resolved to an action or a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
	Action,
	Route,
}

impl Kind {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Kind::Action => "action",
			Kind::Route => "route",
		}
	}
}

/// A handler body. Synchronous handlers return their outcome value directly;
/// asynchronous ones receive the pending promise's `resolve` and `reject` functions
/// and settle it whenever they are done.
pub enum Handler {
	Sync(Box<dyn Fn(&crate::app::Context) -> Value>),
	Async(Box<dyn Fn(&crate::app::Context, js_sys::Function, js_sys::Function)>),
}

impl Handler {
	pub fn sync(handler: impl Fn(&crate::app::Context) -> Value + 'static) -> Self {
		Handler::Sync(Box::new(handler))
	}

	pub fn deferred(handler: impl Fn(&crate::app::Context, js_sys::Function, js_sys::Function) + 'static) -> Self {
		Handler::Async(Box::new(handler))
	}
}

/// One registered action or route.
pub struct Entry {
	pub matcher: Matcher,
	pub handler: Rc<Handler>,
}

/// What a handler invocation produced.
pub enum Outcome {
	Value(Value),
	Promise(js_sys::Promise),
}

/// A successful key resolution: which entry matched and the route captures, if any.
pub struct Resolved {
	pub index: usize,
	pub kind: Kind,
	/// `Some` for routes with at least one capture; actions and capture-less routes
	/// carry no parameters of their own.
	pub params: Option<ValueMap>,
}

/// Resolves a dispatch key against the registry, in registration order.
#[must_use]
pub fn resolve(entries: &[Entry], key: &str) -> Option<Resolved> {
	let path_shaped = key.starts_with('/');
	for (index, entry) in entries.iter().enumerate() {
		match &entry.matcher {
			Matcher::Route(route) if path_shaped => {
				if let Some(params) = route.matches(key) {
					return Some(Resolved {
						index,
						kind: Kind::Route,
						params: if params.is_empty() { None } else { Some(params) },
					});
				}
			}
			Matcher::Action(name) if !path_shaped && name == key => {
				return Some(Resolved {
					index,
					kind: Kind::Action,
					params: None,
				});
			}
			_ => (),
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	fn action(name: &str) -> Entry {
		Entry {
			matcher: Matcher::Action(name.to_owned()),
			handler: Rc::new(Handler::Sync(Box::new(|_| Value::Null))),
		}
	}

	fn route(pattern: &str) -> Entry {
		Entry {
			matcher: Matcher::Route(Route::compile(pattern)),
			handler: Rc::new(Handler::Sync(Box::new(|_| Value::Null))),
		}
	}

	#[test]
	fn actions_match_by_literal_name() {
		let entries = vec![action("save"), action("load")];
		let resolved = resolve(&entries, "load").unwrap();
		assert_eq!(resolved.index, 1);
		assert_eq!(resolved.kind, Kind::Action);
		assert!(resolved.params.is_none());
		assert!(resolve(&entries, "missing").is_none());
	}

	#[test]
	fn path_shaped_keys_only_consult_routes() {
		let entries = vec![action("/users"), route("/users")];
		let resolved = resolve(&entries, "/users").unwrap();
		assert_eq!(resolved.index, 1);
		assert_eq!(resolved.kind, Kind::Route);
	}

	#[test]
	fn bare_names_only_consult_actions() {
		let entries = vec![route("/save"), action("save")];
		let resolved = resolve(&entries, "save").unwrap();
		assert_eq!(resolved.index, 1);
		assert_eq!(resolved.kind, Kind::Action);
	}

	#[test]
	fn first_matching_route_wins() {
		let entries = vec![route("/users/:id"), route("/users/new"), route("/*")];
		let resolved = resolve(&entries, "/users/new").unwrap();
		assert_eq!(resolved.index, 0);
		let params = resolved.params.unwrap();
		assert_eq!(params.get("id"), Some(&Value::string("new")));
	}

	#[test]
	fn captureless_routes_resolve_without_params() {
		let entries = vec![route("/about")];
		let resolved = resolve(&entries, "/about").unwrap();
		assert!(resolved.params.is_none());
	}

	#[test]
	fn wildcard_fallback_catches_unmatched_paths() {
		let entries = vec![route("/users"), route("/*")];
		let resolved = resolve(&entries, "/anything/else").unwrap();
		assert_eq!(resolved.index, 1);
		assert_eq!(
			resolved.params.unwrap().get(crate::router::WILDCARD),
			Some(&Value::string("anything/else"))
		);
	}
}
