//! Hydration: recovers a virtual tree from markup already in the document, so the
//! first render patches pre-rendered HTML instead of replacing it.

use crate::{
	diff::HydrationHook,
	vdom::{AttrValue, VElement, VNode, VText},
};
use tracing::warn;
use wasm_bindgen::{JsCast, UnwrapThrowExt};
use web_sys::{Element, NamedNodeMap, NodeList, Text};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

pub fn from_child_nodes(child_nodes: &NodeList, hooks: &[HydrationHook]) -> Vec<VNode> {
	let mut children = Vec::with_capacity(child_nodes.length() as usize);
	for i in 0..child_nodes.length() {
		let child = child_nodes.item(i).unwrap_throw();
		if let Some(element) = child.dyn_ref::<Element>() {
			children.push(from_element(element, hooks));
		} else if let Some(text) = child.dyn_ref::<Text>() {
			children.push(VNode::Text(VText {
				text: text.data(),
				node: Some(text.clone()),
			}));
		} else {
			// Comments, processing instructions and the like have no virtual counterpart.
			warn!("skipping an unrecognized child node during hydration: {:?}", child);
		}
	}
	children
}

pub fn from_element(element: &Element, hooks: &[HydrationHook]) -> VNode {
	for hook in hooks {
		hook(element);
	}

	// HTML tag names report uppercase; the builder side always works in lowercase.
	// Foreign namespaces (SVG, MathML) are case-sensitive and pass through.
	let namespace = element.namespace_uri();
	let tag = if namespace.is_none() || namespace.as_deref() == Some(HTML_NAMESPACE) {
		element.tag_name().to_ascii_lowercase()
	} else {
		element.tag_name()
	};

	let attributes = from_attributes(&element.attributes());
	let key = attributes
		.iter()
		.find(|(name, _)| name == "key")
		.map(|(_, value)| value.to_text());

	VNode::Element(VElement {
		tag,
		attributes,
		key,
		children: from_child_nodes(&element.child_nodes(), hooks),
		node: Some(element.clone()),
	})
}

fn from_attributes(attributes: &NamedNodeMap) -> Vec<(String, AttrValue)> {
	let mut loaded = Vec::with_capacity(attributes.length() as usize);
	for i in 0..attributes.length() {
		let attribute = attributes.item(i).unwrap_throw();
		loaded.push((attribute.name(), AttrValue::Text(attribute.value())));
	}
	loaded
}
