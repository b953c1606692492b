//! Document-level delegation: intercepts link clicks and form submissions whose
//! targets resolve against the registry, and mirrors history traversal as
//! `pathchange` notifications.

use crate::{
	app::{App, AppInner},
	evented::EventArg,
	value::Value,
};
use js_sys::Reflect;
use std::rc::{Rc, Weak};
use tracing::error;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue, UnwrapThrowExt};

/// The installed delegation listeners. Dropping uninstalls them.
///
/// All three closures hold the application weakly, so the bridge living inside the
/// application never forms a cycle.
pub(crate) struct Bridge {
	click: Closure<dyn Fn(web_sys::Event)>,
	submit: Closure<dyn Fn(web_sys::Event)>,
	popstate: Closure<dyn Fn(web_sys::Event)>,
}

impl Bridge {
	pub(crate) fn install(inner: &Rc<AppInner>) -> Self {
		let window = web_sys::window().expect_throw("no `window` global");
		let document = window.document().expect_throw("no `document` global");

		let click = delegate(inner, handle_click);
		let submit = delegate(inner, handle_submit);
		let popstate = {
			let app: Weak<AppInner> = Rc::downgrade(inner);
			Closure::wrap(Box::new(move |_event: web_sys::Event| {
				// Back/forward traversal announces the path; it never re-dispatches the
				// route, so listeners decide what a restored path means.
				if let Some(inner) = app.upgrade() {
					let app = App::from_inner(inner);
					let path = app.path();
					app.emit("pathchange", &[EventArg::Value(Value::string(path))]);
				}
			}) as Box<dyn Fn(web_sys::Event)>)
		};

		document
			.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())
			.unwrap_throw();
		document
			.add_event_listener_with_callback("submit", submit.as_ref().unchecked_ref())
			.unwrap_throw();
		window
			.add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())
			.unwrap_throw();

		Self { click, submit, popstate }
	}
}

impl Drop for Bridge {
	fn drop(&mut self) {
		if let Some(window) = web_sys::window() {
			if let Some(document) = window.document() {
				let _ = document.remove_event_listener_with_callback("click", self.click.as_ref().unchecked_ref());
				let _ = document.remove_event_listener_with_callback("submit", self.submit.as_ref().unchecked_ref());
			}
			let _ = window.remove_event_listener_with_callback("popstate", self.popstate.as_ref().unchecked_ref());
		}
	}
}

fn delegate(inner: &Rc<AppInner>, handle: fn(&App, &web_sys::Event)) -> Closure<dyn Fn(web_sys::Event)> {
	let app: Weak<AppInner> = Rc::downgrade(inner);
	Closure::wrap(Box::new(move |event: web_sys::Event| {
		if let Some(inner) = app.upgrade() {
			handle(&App::from_inner(inner), &event);
		}
	}) as Box<dyn Fn(web_sys::Event)>)
}

fn handle_click(app: &App, event: &web_sys::Event) {
	if event.default_prevented() {
		return;
	}
	if let Some(mouse) = event.dyn_ref::<web_sys::MouseEvent>() {
		if mouse.button() != 0 || mouse.ctrl_key() || mouse.meta_key() || mouse.alt_key() || mouse.shift_key() {
			return;
		}
	}
	let target: web_sys::Element = match event.target().and_then(|target| target.dyn_into().ok()) {
		Some(target) => target,
		None => return,
	};
	let anchor = match target.closest("a").ok().flatten() {
		Some(anchor) => anchor,
		None => return,
	};
	if anchor.get_attribute("target").map_or(false, |target| target != "_self") {
		return;
	}
	if anchor.has_attribute("download") {
		return;
	}
	if anchor
		.get_attribute("rel")
		.map_or(false, |rel| rel.split_ascii_whitespace().any(|token| token.eq_ignore_ascii_case("external")))
	{
		return;
	}

	// The raw attribute value is the dispatch key; the resolved `href` property would
	// turn an action name like `save` into a full URL.
	let href = match raw_href(&anchor) {
		Some(href) if !href.is_empty() => href,
		_ => return,
	};
	if href.starts_with("mailto:") || !same_origin(&href) {
		return;
	}

	if app.handle_dispatch_key(&href, event, &anchor) {
		event.prevent_default();
	}
}

fn handle_submit(app: &App, event: &web_sys::Event) {
	if event.default_prevented() {
		return;
	}
	let form: web_sys::Element = match event.target().and_then(|target| target.dyn_into().ok()) {
		Some(form) => form,
		None => return,
	};
	let action = match form.get_attribute("action") {
		Some(action) if !action.is_empty() => action,
		_ => return,
	};
	if app.handle_dispatch_key(&action, event, &form) {
		event.prevent_default();
	}
}

fn raw_href(anchor: &web_sys::Element) -> Option<String> {
	if let Some(href) = anchor.get_attribute("href") {
		return Some(href);
	}
	// SVG anchors expose `href` as an SVGAnimatedString.
	let animated = Reflect::get(anchor, &JsValue::from_str("href")).ok()?;
	Reflect::get(&animated, &JsValue::from_str("baseVal")).ok()?.as_string()
}

/// Whether a (possibly relative) link target stays on the current origin; links that
/// leave it are never intercepted.
fn same_origin(href: &str) -> bool {
	let location = match web_sys::window() {
		Some(window) => window.location(),
		None => return false,
	};
	let base = match location.href() {
		Ok(base) => base,
		Err(error) => {
			error!("could not read the current location: {:?}", error);
			return false;
		}
	};
	let url = match web_sys::Url::new_with_base(href, &base) {
		Ok(url) => url,
		Err(_) => return false,
	};
	let protocol = location.protocol().unwrap_or_default();
	url.protocol() == protocol
		&& url.hostname() == location.hostname().unwrap_or_default()
		&& effective_port(&url.port(), &url.protocol()) == effective_port(&location.port().unwrap_or_default(), &protocol)
}

fn effective_port(port: &str, protocol: &str) -> String {
	if port.is_empty() {
		match protocol {
			"https:" => "443",
			_ => "80",
		}
		.to_owned()
	} else {
		port.to_owned()
	}
}
