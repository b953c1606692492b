//! The typed value model used for application state, dispatch parameters and mutation payloads.
//!
//! Values are immutable by construction: nested sequences and mappings are reference-counted
//! and carry no interior mutability, so a snapshot handed out once can never change under a
//! holder. Sharing an unchanged sub-value between two snapshots preserves its identity
//! (see [`Value::ptr_eq`]), which is what makes shallow state merges cheap.

use core::{
	fmt,
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use std::{collections::hash_map::DefaultHasher, rc::Rc};

/// An insertion-agnostic string-keyed mapping of [`Value`]s.
pub type ValueMap = HashMap<Rc<str>, Value>;

/// A JSON-like immutable value.
///
/// Equality and hashing are structural and deep. `Number` compares and hashes by bit pattern
/// (so `NaN == NaN` here), which keeps the [`Eq`]/[`Hash`] contract lawful for use as a cache key.
#[derive(Clone)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(Rc<str>),
	List(Rc<Vec<Value>>),
	Map(Rc<ValueMap>),
}

impl Value {
	#[must_use]
	pub fn string(text: impl AsRef<str>) -> Self {
		Value::String(Rc::from(text.as_ref()))
	}

	#[must_use]
	pub fn list(values: Vec<Value>) -> Self {
		Value::List(Rc::new(values))
	}

	#[must_use]
	pub fn map<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
		Value::Map(Rc::new(entries.into_iter().map(|(k, v)| (Rc::from(k), v)).collect()))
	}

	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(text) => Some(text),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(number) => Some(*number),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_map(&self) -> Option<&ValueMap> {
		match self {
			Value::Map(map) => Some(map),
			_ => None,
		}
	}

	/// Identity comparison for shared sequences and mappings.
	///
	/// Primitive values are compared by value instead, as they carry no shared allocation.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
			(Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
			(Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b),
			_ => self == other,
		}
	}

	/// Converts a decoded URL path segment into its natural type, the way the router
	/// coerces captured parameters.
	#[must_use]
	pub fn from_segment(segment: &str) -> Self {
		match segment {
			"true" => return Value::Bool(true),
			"false" => return Value::Bool(false),
			"undefined" => return Value::Null,
			_ => (),
		}
		match segment.parse::<f64>() {
			Ok(number) if number.is_finite() => Value::Number(number),
			_ => Value::string(segment),
		}
	}

	/// Plain-text rendition, matching how the host language stringifies primitives.
	#[must_use]
	pub fn to_text(&self) -> String {
		match self {
			Value::Null => "null".to_owned(),
			Value::Bool(boolean) => boolean.to_string(),
			Value::Number(number) => format_number(*number),
			Value::String(text) => text.to_string(),
			Value::List(list) => list.iter().map(Value::to_text).collect::<Vec<_>>().join(","),
			Value::Map(_) => "[object]".to_owned(),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
			(Value::String(a), Value::String(b)) => a == b,
			(Value::List(a), Value::List(b)) => a == b,
			(Value::Map(a), Value::Map(b)) => a == b,
			_ => false,
		}
	}
}
impl Eq for Value {}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		match self {
			Value::Null => state.write_u8(0),
			Value::Bool(boolean) => {
				state.write_u8(1);
				boolean.hash(state);
			}
			Value::Number(number) => {
				state.write_u8(2);
				state.write_u64(number.to_bits());
			}
			Value::String(text) => {
				state.write_u8(3);
				text.hash(state);
			}
			Value::List(list) => {
				state.write_u8(4);
				for value in list.iter() {
					value.hash(state);
				}
			}
			Value::Map(map) => {
				// Mapping iteration order is unspecified, so entry hashes are combined
				// with an order-independent fold.
				state.write_u8(5);
				let mut combined = 0u64;
				for (key, value) in map.iter() {
					let mut entry_hasher = DefaultHasher::new();
					key.hash(&mut entry_hasher);
					value.hash(&mut entry_hasher);
					combined = combined.wrapping_add(entry_hasher.finish());
				}
				state.write_u64(combined);
			}
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::Bool(boolean) => boolean.fmt(f),
			Value::Number(number) => number.fmt(f),
			Value::String(text) => text.fmt(f),
			Value::List(list) => f.debug_list().entries(list.iter()).finish(),
			Value::Map(map) => f.debug_map().entries(map.iter()).finish(),
		}
	}
}

impl From<bool> for Value {
	fn from(boolean: bool) -> Self {
		Value::Bool(boolean)
	}
}
impl From<f64> for Value {
	fn from(number: f64) -> Self {
		Value::Number(number)
	}
}
impl From<i32> for Value {
	fn from(number: i32) -> Self {
		Value::Number(number.into())
	}
}
impl From<&str> for Value {
	fn from(text: &str) -> Self {
		Value::string(text)
	}
}
impl From<String> for Value {
	fn from(text: String) -> Self {
		Value::string(&text)
	}
}
impl From<Vec<Value>> for Value {
	fn from(values: Vec<Value>) -> Self {
		Value::list(values)
	}
}

/// Shallow merge: `partial` entries override `base` entries; unchanged values are shared
/// (reference-counted clones), never deep-copied.
#[must_use]
pub fn merge(base: &ValueMap, partial: &ValueMap) -> ValueMap {
	let mut merged = ValueMap::with_capacity(base.len() + partial.len());
	for (key, value) in base {
		merged.insert(key.clone(), value.clone());
	}
	for (key, value) in partial {
		merged.insert(key.clone(), value.clone());
	}
	merged
}

/// Formats a number the way the host language does: integral values render without
/// a fractional part.
#[must_use]
pub fn format_number(number: f64) -> String {
	if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
		format!("{}", number as i64)
	} else {
		format!("{}", number)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn segment_coercion() {
		assert_eq!(Value::from_segment("true"), Value::Bool(true));
		assert_eq!(Value::from_segment("false"), Value::Bool(false));
		assert_eq!(Value::from_segment("undefined"), Value::Null);
		assert_eq!(Value::from_segment("123"), Value::Number(123.0));
		assert_eq!(Value::from_segment("45.891"), Value::Number(45.891));
		assert_eq!(Value::from_segment("foo"), Value::string("foo"));
		assert_eq!(Value::from_segment("-._~:?#[]@!$&'()*+,;="), Value::string("-._~:?#[]@!$&'()*+,;="));
		// `parse::<f64>` is more lenient than the host's numeric coercion for these:
		assert_eq!(Value::from_segment("inf"), Value::string("inf"));
		assert_eq!(Value::from_segment("NaN"), Value::string("NaN"));
	}

	#[test]
	fn merge_is_shallow_and_shares_subvalues() {
		let array = Value::list(vec![1.into(), 2.into(), 3.into()]);
		let base: ValueMap = vec![(Rc::from("a"), Value::from(1)), (Rc::from("array"), array.clone())]
			.into_iter()
			.collect();
		let partial: ValueMap = vec![(Rc::from("b"), Value::from(2))].into_iter().collect();

		let merged = merge(&base, &partial);
		assert_eq!(merged.len(), 3);
		assert_eq!(merged["a"], Value::from(1));
		assert_eq!(merged["b"], Value::from(2));
		assert!(merged["array"].ptr_eq(&array), "unchanged sub-values must keep their identity");
	}

	#[test]
	fn merge_overrides_in_partial_order() {
		let base: ValueMap = vec![(Rc::from("a"), Value::from(1))].into_iter().collect();
		let partial: ValueMap = vec![(Rc::from("a"), Value::from(2))].into_iter().collect();
		assert_eq!(merge(&base, &partial)["a"], Value::from(2));
	}

	#[test]
	fn deep_equality_ignores_map_order() {
		let a = Value::map(vec![("x", Value::from(1)), ("y", Value::from("z"))]);
		let b = Value::map(vec![("y", Value::from("z")), ("x", Value::from(1))]);
		assert_eq!(a, b);

		use core::hash::{Hash, Hasher};
		let mut ha = DefaultHasher::new();
		let mut hb = DefaultHasher::new();
		a.hash(&mut ha);
		b.hash(&mut hb);
		assert_eq!(ha.finish(), hb.finish());
	}

	#[test]
	fn number_formatting() {
		assert_eq!(format_number(1.0), "1");
		assert_eq!(format_number(45.891), "45.891");
		assert_eq!(format_number(-3.0), "-3");
		assert_eq!(format_number(0.0), "0");
	}
}
