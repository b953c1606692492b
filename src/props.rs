//! Writes virtual attributes onto live elements.
//!
//! Most names are written as JavaScript properties when the element exposes a settable
//! one, falling back to `setAttribute` otherwise. `style`, class names and `on*`
//! listeners get dedicated handling. DOM failures are logged and skipped instead of
//! aborting the patch in progress.

use crate::vdom::{AttrValue, EventHandler};
use hashbrown::HashMap;
use js_sys::Reflect;
use tracing::error;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue, UnwrapThrowExt};

/// Expando property carrying the per-node bookkeeping id.
const ID_PROPERTY: &str = "__suberinId";

/// Attribute names that must never be written as properties. Writing these as
/// properties either coerces the value (`href`) or hits a readonly accessor.
const ATTRIBUTE_ONLY: &[&str] = &["width", "height", "href", "list", "form", "tabIndex", "download"];

/// Owns the live event listener closures, keyed by node id and event name.
///
/// Listener closures must stay alive for as long as they are registered on a node;
/// dropping the binder (or detaching) unregisters and frees them.
#[derive(Default)]
pub struct Binder {
	listeners: HashMap<(u32, String), Closure<dyn Fn(web_sys::Event)>>,
	next_id: u32,
}

impl Binder {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Stable bookkeeping id for a JS object, assigned on first use via an expando
	/// property.
	pub fn id_of(&mut self, target: &JsValue) -> u32 {
		if let Some(id) = Reflect::get(target, &JsValue::from_str(ID_PROPERTY))
			.ok()
			.and_then(|value| value.as_f64())
		{
			return id as u32;
		}
		let id = self.next_id;
		self.next_id += 1;
		Reflect::set(target, &JsValue::from_str(ID_PROPERTY), &JsValue::from_f64(id.into())).unwrap_throw();
		id
	}

	pub fn attach(&mut self, element: &web_sys::Element, event: &str, handler: EventHandler) {
		self.detach(element, event);
		let closure = Closure::wrap(Box::new(move |dom_event: web_sys::Event| handler(&dom_event)) as Box<dyn Fn(web_sys::Event)>);
		if let Err(error) = element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
			error!("could not attach a {:?} listener: {:?}", event, error);
			return;
		}
		let id = self.id_of(element);
		self.listeners.insert((id, event.to_owned()), closure);
	}

	pub fn detach(&mut self, element: &web_sys::Element, event: &str) {
		let id = self.id_of(element);
		if let Some(closure) = self.listeners.remove(&(id, event.to_owned())) {
			if let Err(error) = element.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
				error!("could not detach a {:?} listener: {:?}", event, error);
			}
		}
	}

	/// Detaches every listener still registered on `element`. Called before the element
	/// leaves the document.
	pub fn detach_all(&mut self, element: &web_sys::Element) {
		let id = self.id_of(element);
		let events: Vec<String> = self
			.listeners
			.keys()
			.filter(|(listener_id, _)| *listener_id == id)
			.map(|(_, event)| event.clone())
			.collect();
		for event in events {
			self.detach(element, &event);
		}
	}
}

/// Applies one attribute transition (`old` → `new`) to a live element.
///
/// `key` participates in node identity only and is never written out.
pub fn apply_attribute(
	binder: &mut Binder,
	element: &web_sys::Element,
	name: &str,
	old: Option<&AttrValue>,
	new: Option<&AttrValue>,
	is_svg: bool,
) {
	if name == "key" || old == new {
		return;
	}

	if name.len() > 2 && name.starts_with("on") && is_listener_slot(old, new) {
		let event = name[2..].to_ascii_lowercase();
		match new {
			Some(AttrValue::Handler(handler)) => binder.attach(element, &event, handler.clone()),
			_ => binder.detach(element, &event),
		}
		return;
	}

	match name {
		"style" => apply_style(element, old, new),
		"class" | "className" => apply_class(element, new, is_svg),
		_ => apply_generic(element, name, new, is_svg),
	}
}

fn is_listener_slot(old: Option<&AttrValue>, new: Option<&AttrValue>) -> bool {
	matches!(old, Some(AttrValue::Handler(_))) || matches!(new, Some(AttrValue::Handler(_)))
}

fn apply_style(element: &web_sys::Element, old: Option<&AttrValue>, new: Option<&AttrValue>) {
	let style: web_sys::CssStyleDeclaration = match Reflect::get(element, &JsValue::from_str("style")).and_then(JsValue::dyn_into) {
		Ok(style) => style,
		Err(error) => {
			error!("element has no style declaration: {:?}", error);
			return;
		}
	};
	match new {
		Some(AttrValue::Text(text)) => style.set_css_text(text),
		Some(AttrValue::Map(declarations)) => {
			if let Some(AttrValue::Map(previous)) = old {
				for (property, _) in previous {
					if !declarations.iter().any(|(name, _)| name == property) {
						remove_style_property(&style, property);
					}
				}
			} else {
				style.set_css_text("");
			}
			for (property, value) in declarations {
				let unchanged = matches!(old, Some(AttrValue::Map(previous))
					if previous.iter().any(|(name, previous_value)| name == property && previous_value == value));
				if unchanged {
					continue;
				}
				set_style_property(&style, property, &value.to_text());
			}
		}
		_ => style.set_css_text(""),
	}
}

fn set_style_property(style: &web_sys::CssStyleDeclaration, property: &str, value: &str) {
	if property.starts_with("--") {
		if let Err(error) = style.set_property(property, value) {
			error!("could not set custom property {:?}: {:?}", property, error);
		}
	} else if let Err(error) = Reflect::set(style, &JsValue::from_str(&camel_case(property)), &JsValue::from_str(value)) {
		error!("could not set style property {:?}: {:?}", property, error);
	}
}

fn remove_style_property(style: &web_sys::CssStyleDeclaration, property: &str) {
	if property.starts_with("--") {
		if let Err(error) = style.remove_property(property) {
			error!("could not remove custom property {:?}: {:?}", property, error);
		}
	} else if let Err(error) = Reflect::set(style, &JsValue::from_str(&camel_case(property)), &JsValue::from_str("")) {
		error!("could not clear style property {:?}: {:?}", property, error);
	}
}

fn apply_class(element: &web_sys::Element, new: Option<&AttrValue>, is_svg: bool) {
	let class = match new {
		None | Some(AttrValue::Null) => String::new(),
		Some(AttrValue::Map(entries)) => entries
			.iter()
			.filter(|(_, value)| is_truthy(value))
			.map(|(name, _)| name.as_str())
			.collect::<Vec<_>>()
			.join(" "),
		Some(value) => value.to_text(),
	};
	// SVG elements have a readonly `className` (an SVGAnimatedString), so the class
	// goes through the attribute there.
	if is_svg {
		if let Err(error) = element.set_attribute("class", &class) {
			error!("could not set the class attribute: {:?}", error);
		}
	} else if let Err(error) = Reflect::set(element, &JsValue::from_str("className"), &JsValue::from_str(&class)) {
		error!("could not set className: {:?}", error);
	}
}

fn apply_generic(element: &web_sys::Element, name: &str, new: Option<&AttrValue>, is_svg: bool) {
	let use_property = !is_svg
		&& !ATTRIBUTE_ONLY.contains(&name)
		&& Reflect::has(element, &JsValue::from_str(name)).unwrap_or(false);
	if use_property {
		// IDL string setters stringify `null` into the literal text "null", so a removed
		// value clears through the empty string and drops the serialized attribute too.
		let value = match new {
			None | Some(AttrValue::Null) => JsValue::from_str(""),
			Some(AttrValue::Bool(boolean)) => JsValue::from_bool(*boolean),
			Some(AttrValue::Number(number)) => JsValue::from_f64(*number),
			Some(other) => JsValue::from_str(&other.to_text()),
		};
		if Reflect::set(element, &JsValue::from_str(name), &value).is_ok() {
			if matches!(new, None | Some(AttrValue::Null)) {
				remove_attribute(element, name);
			}
			return;
		}
		// Readonly property (e.g. `form` on some elements); write the attribute instead.
	}

	match new {
		None | Some(AttrValue::Null) => remove_attribute(element, name),
		// A plain boolean attribute toggles by presence; hyphenated names (data-*,
		// aria-*) carry "false" literally instead.
		Some(AttrValue::Bool(false)) if !name.contains('-') => remove_attribute(element, name),
		Some(value) => {
			if let Err(error) = element.set_attribute(name, &value.to_text()) {
				error!("could not set attribute {:?}: {:?}", name, error);
			}
		}
	}
}

fn remove_attribute(element: &web_sys::Element, name: &str) {
	if let Err(error) = element.remove_attribute(name) {
		error!("could not remove attribute {:?}: {:?}", name, error);
	}
}

fn is_truthy(value: &AttrValue) -> bool {
	match value {
		AttrValue::Null => false,
		AttrValue::Bool(boolean) => *boolean,
		AttrValue::Number(number) => *number != 0.0 && !number.is_nan(),
		AttrValue::Text(text) => !text.is_empty(),
		AttrValue::List(_) | AttrValue::Map(_) | AttrValue::Handler(_) => true,
	}
}

fn camel_case(property: &str) -> String {
	let mut camel = String::with_capacity(property.len());
	let mut upper_next = false;
	for character in property.chars() {
		if character == '-' {
			upper_next = true;
		} else if upper_next {
			camel.extend(character.to_uppercase());
			upper_next = false;
		} else {
			camel.push(character);
		}
	}
	camel
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn camel_cases_css_property_names() {
		assert_eq!(camel_case("background-color"), "backgroundColor");
		assert_eq!(camel_case("color"), "color");
		assert_eq!(camel_case("-webkit-transform"), "WebkitTransform");
	}

	#[test]
	fn truthiness() {
		assert!(!is_truthy(&AttrValue::Null));
		assert!(!is_truthy(&AttrValue::Bool(false)));
		assert!(!is_truthy(&AttrValue::Number(0.0)));
		assert!(!is_truthy(&AttrValue::Text(String::new())));
		assert!(is_truthy(&AttrValue::Bool(true)));
		assert!(is_truthy(&AttrValue::Number(1.0)));
		assert!(is_truthy(&AttrValue::Text("x".to_owned())));
	}
}
