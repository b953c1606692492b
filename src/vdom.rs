//! The virtual node model: lightweight descriptions of DOM nodes used for diffing,
//! plus the child normalization rules shared by builders, hydration and the renderer.

use crate::value::format_number;
use core::fmt;
use std::{collections::VecDeque, rc::Rc};

/// A DOM event listener as carried by a virtual attribute.
///
/// Listener equality is reference identity ([`Rc::ptr_eq`]); the memoized dispatcher
/// factory relies on this to keep listeners stable across re-renders.
pub type EventHandler = Rc<dyn Fn(&web_sys::Event)>;

/// A virtual attribute value.
#[derive(Clone)]
pub enum AttrValue {
	Null,
	Bool(bool),
	Number(f64),
	Text(String),
	/// Class lists and similar space-joined sequences.
	List(Vec<AttrValue>),
	/// Style declarations and truthy-keyed class mappings. Insertion-ordered.
	Map(Vec<(String, AttrValue)>),
	Handler(EventHandler),
}

impl AttrValue {
	/// Plain-text rendition used for attribute writes.
	#[must_use]
	pub fn to_text(&self) -> String {
		match self {
			AttrValue::Null => String::new(),
			AttrValue::Bool(boolean) => boolean.to_string(),
			AttrValue::Number(number) => format_number(*number),
			AttrValue::Text(text) => text.clone(),
			AttrValue::List(list) => list.iter().map(AttrValue::to_text).collect::<Vec<_>>().join(" "),
			AttrValue::Map(_) | AttrValue::Handler(_) => String::new(),
		}
	}
}

impl PartialEq for AttrValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(AttrValue::Null, AttrValue::Null) => true,
			(AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
			(AttrValue::Number(a), AttrValue::Number(b)) => a.to_bits() == b.to_bits(),
			(AttrValue::Text(a), AttrValue::Text(b)) => a == b,
			(AttrValue::List(a), AttrValue::List(b)) => a == b,
			(AttrValue::Map(a), AttrValue::Map(b)) => a == b,
			(AttrValue::Handler(a), AttrValue::Handler(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Null => f.write_str("null"),
			AttrValue::Bool(boolean) => boolean.fmt(f),
			AttrValue::Number(number) => number.fmt(f),
			AttrValue::Text(text) => text.fmt(f),
			AttrValue::List(list) => f.debug_list().entries(list.iter()).finish(),
			AttrValue::Map(map) => f.debug_map().entries(map.iter().map(|(k, v)| (k, v))).finish(),
			AttrValue::Handler(_) => f.write_str("<handler>"),
		}
	}
}

impl From<&str> for AttrValue {
	fn from(text: &str) -> Self {
		AttrValue::Text(text.to_owned())
	}
}
impl From<String> for AttrValue {
	fn from(text: String) -> Self {
		AttrValue::Text(text)
	}
}
impl From<f64> for AttrValue {
	fn from(number: f64) -> Self {
		AttrValue::Number(number)
	}
}
impl From<i32> for AttrValue {
	fn from(number: i32) -> Self {
		AttrValue::Number(number.into())
	}
}
impl From<bool> for AttrValue {
	fn from(boolean: bool) -> Self {
		AttrValue::Bool(boolean)
	}
}
impl From<EventHandler> for AttrValue {
	fn from(handler: EventHandler) -> Self {
		AttrValue::Handler(handler)
	}
}

/// A virtual element node.
#[derive(Debug)]
pub struct VElement {
	pub tag: String,
	/// Insertion-ordered. `key` stays listed here but is never written to the DOM.
	pub attributes: Vec<(String, AttrValue)>,
	/// Extracted from the `key` attribute; part of the node identity, not of the rendered output.
	pub key: Option<String>,
	pub children: Vec<VNode>,
	/// Back-reference to the live element this node produced. Owned by the diff engine;
	/// never set by the application.
	pub node: Option<web_sys::Element>,
}

/// A virtual text node.
#[derive(Debug)]
pub struct VText {
	pub text: String,
	/// Back-reference owned by the diff engine.
	pub node: Option<web_sys::Text>,
}

/// A virtual DOM node. Fragments are represented as bare `Vec<VNode>` sequences
/// rather than a wrapping variant.
#[derive(Debug)]
pub enum VNode {
	Element(VElement),
	Text(VText),
}

impl VNode {
	/// The live DOM node this virtual node is bound to, if it has been mounted.
	#[must_use]
	pub fn dom_node(&self) -> Option<web_sys::Node> {
		match self {
			VNode::Element(element) => element.node.clone().map(Into::into),
			VNode::Text(text) => text.node.clone().map(Into::into),
		}
	}
}

/// Builder input: anything a view callback may place in a child position.
#[derive(Debug)]
pub enum Child {
	Node(VNode),
	Text(String),
	Number(f64),
	Bool(bool),
	Null,
	List(Vec<Child>),
}

impl From<VNode> for Child {
	fn from(node: VNode) -> Self {
		Child::Node(node)
	}
}
impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Child::Text(text.to_owned())
	}
}
impl From<String> for Child {
	fn from(text: String) -> Self {
		Child::Text(text)
	}
}
impl From<f64> for Child {
	fn from(number: f64) -> Self {
		Child::Number(number)
	}
}
impl From<i32> for Child {
	fn from(number: i32) -> Self {
		Child::Number(number.into())
	}
}
impl From<bool> for Child {
	fn from(boolean: bool) -> Self {
		Child::Bool(boolean)
	}
}
impl From<Vec<Child>> for Child {
	fn from(children: Vec<Child>) -> Self {
		Child::List(children)
	}
}

/// Creates a virtual element.
///
/// This is the binder function the templating collaborator targets: it is called once per
/// static template structure with the interpolated attributes and children. A `key`
/// attribute is extracted into the node identity.
#[must_use]
pub fn h(tag: &str, attributes: Vec<(String, AttrValue)>, children: Vec<Child>) -> VNode {
	let key = attributes.iter().find_map(|(name, value)| {
		if name == "key" {
			Some(value.to_text())
		} else {
			None
		}
	});
	VNode::Element(VElement {
		tag: tag.to_owned(),
		attributes,
		key,
		children: normalize(children),
		node: None,
	})
}

/// Creates a virtual text node.
#[must_use]
pub fn text(text: impl Into<String>) -> VNode {
	VNode::Text(VText { text: text.into(), node: None })
}

/// Convenience constructor for an attribute entry.
#[must_use]
pub fn attr(name: &str, value: impl Into<AttrValue>) -> (String, AttrValue) {
	(name.to_owned(), value.into())
}

/// Normalizes arbitrary builder children into a flat node sequence:
/// nested sequences are expanded, `Null` and booleans are dropped and remaining
/// primitives become text nodes. Total over any input.
#[must_use]
pub fn normalize(children: Vec<Child>) -> Vec<VNode> {
	let mut queue: VecDeque<Child> = children.into();
	let mut normalized = Vec::with_capacity(queue.len());
	while let Some(child) = queue.pop_front() {
		match child {
			Child::Null | Child::Bool(_) => (),
			Child::List(list) => {
				for (i, nested) in list.into_iter().enumerate() {
					queue.insert(i, nested);
				}
			}
			Child::Text(content) => normalized.push(text(content)),
			Child::Number(number) => normalized.push(text(format_number(number))),
			Child::Node(node) => normalized.push(node),
		}
	}
	normalized
}

/// The node identity predicate: a DOM node is reused iff tag name and key (or absence
/// of key) are equal. Content equality is never consulted; unkeyed elements of the same
/// tag always occupy the same slot positionally.
#[must_use]
pub fn same_node(a: &VNode, b: &VNode) -> bool {
	match (a, b) {
		(VNode::Text(_), VNode::Text(_)) => true,
		(VNode::Element(a), VNode::Element(b)) => a.tag == b.tag && a.key == b.key,
		_ => false,
	}
}
