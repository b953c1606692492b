//! The DOM reconciler: renders virtual child sequences into container elements and
//! patches the document to match, reusing live nodes wherever identity allows.
//!
//! Node identity is `(tag, key)` (see [`same_node`]); keyed lists reorder with a
//! two-pointer sweep over both ends plus a lazily built key map for interleaved moves.
//! Unkeyed mismatched lists degrade to per-slot rebuilds.

use crate::{
	load,
	props::{apply_attribute, Binder},
	vdom::{normalize, same_node, AttrValue, Child, VElement, VNode, VText},
};
use hashbrown::HashMap;
use tracing::{error, trace_span};
use wasm_bindgen::{JsCast, UnwrapThrowExt};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Runs once per element recovered from pre-rendered HTML.
pub type HydrationHook = std::rc::Rc<dyn Fn(&web_sys::Element)>;

/// Owns the rendered tree per container element and the listener bookkeeping.
#[derive(Default)]
pub struct Renderer {
	containers: HashMap<u32, Vec<VNode>>,
	binder: Binder,
	hooks: Vec<HydrationHook>,
}

impl Renderer {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_hydration_hook(&mut self, hook: HydrationHook) {
		self.hooks.push(hook);
	}

	/// Renders `children` into `container`, patching against whatever this renderer
	/// previously rendered there.
	///
	/// On the first render into a non-empty container the existing markup is hydrated
	/// into the old tree instead of being discarded, so server-rendered content is
	/// patched in place.
	pub fn render(&mut self, container: &web_sys::Element, children: Vec<Child>) -> Vec<web_sys::Node> {
		let span = trace_span!("render", container = %container.tag_name());
		let _enter = span.enter();

		let document = container.owner_document().expect_throw("container element has no owner document");
		let id = self.binder.id_of(container);
		let old = self.containers.remove(&id).unwrap_or_else(|| {
			if container.has_child_nodes() {
				load::from_child_nodes(&container.child_nodes(), &self.hooks)
			} else {
				Vec::new()
			}
		});
		let mut new = normalize(children);

		let active = document.active_element();
		let is_svg = container.namespace_uri().as_deref() == Some(SVG_NAMESPACE);
		self.patch_children(&document, container.as_ref(), old, &mut new, is_svg);
		restore_focus(&document, active);

		let rendered = new.iter().filter_map(VNode::dom_node).collect();
		self.containers.insert(id, new);
		rendered
	}

	fn patch_children(&mut self, document: &web_sys::Document, parent: &web_sys::Node, old: Vec<VNode>, new: &mut [VNode], is_svg: bool) {
		let mut old: Vec<Option<VNode>> = old.into_iter().map(Some).collect();
		let mut old_start = 0_isize;
		let mut old_end = old.len() as isize - 1;
		let mut new_start = 0_isize;
		let mut new_end = new.len() as isize - 1;
		// (tag, key) → old index; built only when the two-pointer sweep stalls.
		let mut key_map: Option<HashMap<(String, String), usize>> = None;

		while old_start <= old_end && new_start <= new_end {
			if old[old_start as usize].is_none() {
				old_start += 1;
				continue;
			}
			if old[old_end as usize].is_none() {
				old_end -= 1;
				continue;
			}

			if same_node(old[old_start as usize].as_ref().unwrap_throw(), &new[new_start as usize]) {
				let matched = old[old_start as usize].take().unwrap_throw();
				self.patch_same(document, matched, &mut new[new_start as usize], is_svg);
				old_start += 1;
				new_start += 1;
			} else if same_node(old[old_end as usize].as_ref().unwrap_throw(), &new[new_end as usize]) {
				let matched = old[old_end as usize].take().unwrap_throw();
				self.patch_same(document, matched, &mut new[new_end as usize], is_svg);
				old_end -= 1;
				new_end -= 1;
			} else if same_node(old[old_start as usize].as_ref().unwrap_throw(), &new[new_end as usize]) {
				// Head moved towards the tail.
				let anchor = old[old_end as usize].as_ref().and_then(|node| node.dom_node()).and_then(|node| node.next_sibling());
				let matched = old[old_start as usize].take().unwrap_throw();
				self.patch_same(document, matched, &mut new[new_end as usize], is_svg);
				if let Some(moved) = new[new_end as usize].dom_node() {
					insert(parent, &moved, anchor.as_ref());
				}
				old_start += 1;
				new_end -= 1;
			} else if same_node(old[old_end as usize].as_ref().unwrap_throw(), &new[new_start as usize]) {
				// Tail moved towards the head.
				let anchor = old[old_start as usize].as_ref().and_then(VNode::dom_node);
				let matched = old[old_end as usize].take().unwrap_throw();
				self.patch_same(document, matched, &mut new[new_start as usize], is_svg);
				if let Some(moved) = new[new_start as usize].dom_node() {
					insert(parent, &moved, anchor.as_ref());
				}
				old_end -= 1;
				new_start += 1;
			} else {
				let map = key_map.get_or_insert_with(|| {
					let span = trace_span!("key_map");
					let _enter = span.enter();
					let mut map = HashMap::new();
					for index in old_start as usize..=old_end as usize {
						if let Some(VNode::Element(element)) = &old[index] {
							if let Some(key) = &element.key {
								map.insert((element.tag.clone(), key.clone()), index);
							}
						}
					}
					map
				});
				let matched_index = match &new[new_start as usize] {
					VNode::Element(VElement { tag, key: Some(key), .. }) => map.get(&(tag.clone(), key.clone())).copied(),
					_ => None,
				};
				let anchor = old[old_start as usize].as_ref().and_then(VNode::dom_node);

				// A map hit may have been consumed by the pointer sweep already.
				match matched_index.and_then(|index| old[index].take().map(|node| (index, node))) {
					Some((_, matched)) => {
						self.patch_same(document, matched, &mut new[new_start as usize], is_svg);
						if let Some(moved) = new[new_start as usize].dom_node() {
							insert(parent, &moved, anchor.as_ref());
						}
					}
					None => {
						let created = self.create_node(document, &mut new[new_start as usize], is_svg);
						insert(parent, &created, anchor.as_ref());
					}
				}
				new_start += 1;
			}
		}

		if old_start > old_end {
			// Mounts remain; anything after `new_end` is already in place and anchors them.
			let anchor = new.get((new_end + 1) as usize).and_then(VNode::dom_node);
			for index in new_start..=new_end {
				let created = self.create_node(document, &mut new[index as usize], is_svg);
				insert(parent, &created, anchor.as_ref());
			}
		} else {
			for slot in &mut old[old_start as usize..=old_end as usize] {
				if let Some(stale) = slot.take() {
					self.remove_node(parent, stale);
				}
			}
		}
	}

	/// Patches a live node in place. Caller guarantees `same_node(&old, new)`.
	fn patch_same(&mut self, document: &web_sys::Document, old: VNode, new: &mut VNode, is_svg: bool) {
		match (old, new) {
			(VNode::Text(old), VNode::Text(new)) => {
				let node = old.node.expect_throw("previously rendered text node lost its back-reference");
				if old.text != new.text {
					node.set_data(&new.text);
				}
				new.node = Some(node);
			}
			(VNode::Element(old), VNode::Element(new)) => {
				let element = old.node.expect_throw("previously rendered element lost its back-reference");
				let child_svg = is_svg || new.tag.eq_ignore_ascii_case("svg");

				for (name, old_value) in &old.attributes {
					if !new.attributes.iter().any(|(new_name, _)| new_name == name) {
						apply_attribute(&mut self.binder, &element, name, Some(old_value), None, child_svg);
					}
				}
				for (name, new_value) in &new.attributes {
					let old_value = old.attributes.iter().find(|(old_name, _)| old_name == name).map(|(_, value)| value);
					apply_attribute(&mut self.binder, &element, name, old_value, Some(new_value), child_svg);
				}

				self.patch_children(document, element.as_ref(), old.children, &mut new.children, child_svg);
				new.node = Some(element);
			}
			_ => error!("node identity mismatch reached the in-place patch; skipping"),
		}
	}

	fn create_node(&mut self, document: &web_sys::Document, new: &mut VNode, is_svg: bool) -> web_sys::Node {
		match new {
			VNode::Text(VText { text, node }) => {
				let created = document.create_text_node(text);
				*node = Some(created.clone());
				created.into()
			}
			VNode::Element(element) => {
				let svg = is_svg || element.tag.eq_ignore_ascii_case("svg");
				let created = if svg {
					document.create_element_ns(Some(SVG_NAMESPACE), &element.tag)
				} else {
					document.create_element(&element.tag)
				}
				.unwrap_throw();
				for (name, value) in &element.attributes {
					apply_attribute(&mut self.binder, &created, name, None, Some(value), svg);
				}
				for child in &mut element.children {
					let child_node = self.create_node(document, child, svg);
					created.append_child(&child_node).unwrap_throw();
				}
				element.node = Some(created.clone());
				created.into()
			}
		}
	}

	fn remove_node(&mut self, parent: &web_sys::Node, stale: VNode) {
		if let VNode::Element(element) = &stale {
			self.release_listeners(element);
		}
		if let Some(node) = stale.dom_node() {
			if let Err(error) = parent.remove_child(&node) {
				error!("could not remove a stale node: {:?}", error);
			}
		}
	}

	fn release_listeners(&mut self, element: &VElement) {
		if let Some(live) = &element.node {
			if element.attributes.iter().any(|(_, value)| matches!(value, AttrValue::Handler(_))) {
				self.binder.detach_all(live);
			}
		}
		for child in &element.children {
			if let VNode::Element(child) = child {
				self.release_listeners(child);
			}
		}
	}
}

fn insert(parent: &web_sys::Node, node: &web_sys::Node, anchor: Option<&web_sys::Node>) {
	if let Err(error) = parent.insert_before(node, anchor) {
		error!("could not insert a node: {:?}", error);
	}
}

/// Moving a focused element out of and back into the document drops its focus; restore
/// it when the element survived the patch.
fn restore_focus(document: &web_sys::Document, previously_active: Option<web_sys::Element>) {
	if let Some(previously_active) = previously_active {
		if document.active_element().as_ref() != Some(&previously_active) && previously_active.is_connected() {
			if let Some(focusable) = previously_active.dyn_ref::<web_sys::HtmlElement>() {
				focusable.focus().unwrap_or_else(|error| error!("could not restore focus: {:?}", error));
			}
		}
	}
}
