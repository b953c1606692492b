//! The application state store: an immutable snapshot plus named mutations that
//! produce the next snapshot by shallow merge.

use crate::value::{merge, Value, ValueMap};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::warn;

/// An immutable application state snapshot.
///
/// Cloning is cheap (a reference-counted handle) and every commit produces a new
/// snapshot, so two snapshots taken around a commit stay independently readable.
#[derive(Debug, Clone)]
pub struct AppState(Rc<ValueMap>);

impl AppState {
	#[must_use]
	pub fn new(initial: ValueMap) -> Self {
		Self(Rc::new(initial))
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	#[must_use]
	pub fn entries(&self) -> &ValueMap {
		&self.0
	}

	/// Snapshot identity: true iff both handles refer to the same commit's result.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

/// A mutation body: receives the current snapshot and the commit payload, returns the
/// partial state to merge over the snapshot.
pub type Reducer = Box<dyn Fn(&AppState, &Value) -> Value>;

/// The record of one committed mutation.
pub struct Commit {
	pub name: String,
	pub previous: AppState,
	pub next: AppState,
	pub partial: Value,
}

/// State container: the current snapshot and the registered mutations.
#[derive(Default)]
pub struct Store {
	state: Option<AppState>,
	mutations: HashMap<String, Rc<Reducer>>,
}

impl Store {
	#[must_use]
	pub fn new(initial: ValueMap) -> Self {
		Self {
			state: Some(AppState::new(initial)),
			mutations: HashMap::new(),
		}
	}

	#[must_use]
	pub fn state(&self) -> AppState {
		self.state.clone().unwrap_or_else(|| AppState::new(ValueMap::new()))
	}

	/// Registers a named mutation. A later registration under the same name replaces
	/// the earlier one.
	pub fn add_mutation(&mut self, name: &str, reducer: Reducer) {
		self.mutations.insert(name.to_owned(), Rc::new(reducer));
	}

	/// Runs a registered mutation and installs the merged snapshot.
	///
	/// Unknown names are a no-op and return `None`. A mutation returning a non-mapping
	/// value contributes an empty partial (logged), so the snapshot still advances.
	pub fn commit(&mut self, name: &str, payload: &Value) -> Option<Commit> {
		let reducer = self.mutations.get(name)?.clone();
		let previous = self.state();
		let partial = reducer(&previous, payload);
		let partial_map = match partial.as_map() {
			Some(map) => map.clone(),
			None => {
				if !partial.is_null() {
					warn!("mutation {:?} returned a non-mapping partial; ignoring it", name);
				}
				ValueMap::new()
			}
		};
		let next = AppState::new(merge(previous.entries(), &partial_map));
		self.state = Some(next.clone());
		Some(Commit {
			name: name.to_owned(),
			previous,
			next,
			partial,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store() -> Store {
		let mut store = Store::new(vec![(Rc::from("count"), Value::from(0))].into_iter().collect());
		store.add_mutation(
			"increment",
			Box::new(|state, payload| {
				let count = state.get("count").and_then(Value::as_number).unwrap_or(0.0);
				let by = payload.as_number().unwrap_or(1.0);
				Value::map(vec![("count", Value::Number(count + by))])
			}),
		);
		store
	}

	#[test]
	fn commit_produces_a_fresh_snapshot() {
		let mut store = store();
		let before = store.state();
		let commit = store.commit("increment", &Value::from(5)).unwrap();

		assert!(commit.previous.ptr_eq(&before));
		assert!(!commit.next.ptr_eq(&before));
		assert_eq!(before.get("count"), Some(&Value::from(0)));
		assert_eq!(commit.next.get("count"), Some(&Value::from(5)));
		assert_eq!(commit.partial, Value::map(vec![("count", Value::from(5))]));
		assert!(store.state().ptr_eq(&commit.next));
	}

	#[test]
	fn unchanged_subvalues_keep_their_identity_across_commits() {
		let list = Value::list(vec![1.into(), 2.into()]);
		let mut store = Store::new(
			vec![(Rc::from("items"), list.clone()), (Rc::from("count"), Value::from(0))]
				.into_iter()
				.collect(),
		);
		store.add_mutation("bump", Box::new(|_, _| Value::map(vec![("count", Value::from(1))])));

		let commit = store.commit("bump", &Value::Null).unwrap();
		assert!(commit.next.get("items").unwrap().ptr_eq(&list));
	}

	#[test]
	fn unknown_mutation_is_a_no_op() {
		let mut store = store();
		let before = store.state();
		assert!(store.commit("missing", &Value::Null).is_none());
		assert!(store.state().ptr_eq(&before));
	}

	#[test]
	fn non_mapping_partial_still_advances_the_snapshot() {
		let mut store = store();
		store.add_mutation("odd", Box::new(|_, _| Value::from("not a map")));
		let before = store.state();
		let commit = store.commit("odd", &Value::Null).unwrap();
		assert!(!commit.next.ptr_eq(&before));
		assert_eq!(commit.next.get("count"), Some(&Value::from(0)));
	}

	#[test]
	fn later_registration_replaces_earlier() {
		let mut store = store();
		store.add_mutation("increment", Box::new(|_, _| Value::map(vec![("count", Value::from(100))])));
		let commit = store.commit("increment", &Value::Null).unwrap();
		assert_eq!(commit.next.get("count"), Some(&Value::from(100)));
	}
}
