#![cfg(target_arch = "wasm32")]

use std::{cell::RefCell, rc::Rc};
use suberin::{App, Handler, Outcome, Value, ValueMap};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::window;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn sync_actions_return_their_value() {
	let app = App::new(ValueMap::new());
	app.action(
		"greet",
		Handler::sync(|context| Value::string(format!("hello {}", context.params().to_text()))),
	);

	match app.dispatch(Some("greet"), "world".into()) {
		Some(Outcome::Value(value)) => assert_eq!(value, Value::string("hello world")),
		Some(Outcome::Promise(_)) => panic!("a synchronous handler must not produce a promise"),
		None => panic!("the action must resolve"),
	}
	assert!(app.dispatch(Some("missing"), Value::Null).is_none());
}

#[wasm_bindgen_test]
async fn deferred_actions_settle_their_promise() {
	let app = App::new(ValueMap::new());
	app.action(
		"later",
		Handler::deferred(|_context, resolve, _reject| {
			resolve.call1(&JsValue::NULL, &JsValue::from_str("done")).unwrap();
		}),
	);

	match app.dispatch(Some("later"), Value::Null) {
		Some(Outcome::Promise(promise)) => {
			let settled = JsFuture::from(promise).await.unwrap();
			assert_eq!(settled.as_string().as_deref(), Some("done"));
		}
		_ => panic!("a deferred handler must produce a promise"),
	}
}

#[wasm_bindgen_test]
fn dispatch_notifications_are_positional() {
	let app = App::new(ValueMap::new());
	app.action("noop", Handler::sync(|_| Value::Bool(true)));

	let seen = Rc::new(RefCell::new(None));
	{
		let seen = seen.clone();
		app.on(
			"dispatch",
			Rc::new(move |args| {
				let kind = args[0].as_value().unwrap().to_text();
				let key = args[1].as_value().unwrap().to_text();
				let params = args[3].as_value().unwrap().clone();
				let outcome = args[5].as_value().cloned();
				*seen.borrow_mut() = Some((kind, key, params, outcome));
			}),
		);
	}

	app.dispatch(Some("noop"), Value::string("p"));
	assert_eq!(
		*seen.borrow(),
		Some(("action".to_owned(), "noop".to_owned(), Value::string("p"), Some(Value::Bool(true))))
	);
}

#[wasm_bindgen_test]
fn path_dispatch_carries_route_captures() {
	let app = App::new(ValueMap::new());
	let seen = Rc::new(RefCell::new(None));
	{
		let seen = seen.clone();
		app.route(
			"/widgets/:id",
			Handler::sync(move |context| {
				*seen.borrow_mut() = context.params().as_map().and_then(|params| params.get("id")).cloned();
				Value::Null
			}),
		);
	}

	// A plain dispatch invokes the route without touching the session history.
	let before = window().unwrap().location().pathname().unwrap();
	assert!(app.dispatch(Some("/widgets/42/"), Value::Null).is_some());
	assert_eq!(*seen.borrow(), Some(Value::Number(42.0)));
	assert_eq!(window().unwrap().location().pathname().unwrap(), before);
}

#[wasm_bindgen_test]
fn navigation_pushes_history_and_invokes_the_route() {
	let app = App::new(ValueMap::new());
	let seen = Rc::new(RefCell::new(None));
	{
		let seen = seen.clone();
		app.route(
			"/gadgets/:id",
			Handler::sync(move |context| {
				*seen.borrow_mut() = context.params().as_map().and_then(|params| params.get("id")).cloned();
				Value::Null
			}),
		);
	}

	let paths = Rc::new(RefCell::new(Vec::new()));
	{
		let paths = paths.clone();
		app.on(
			"pathchange",
			Rc::new(move |args| paths.borrow_mut().push(args[0].as_value().unwrap().to_text())),
		);
	}

	assert!(app.navigate("/gadgets/7").is_some());
	assert_eq!(window().unwrap().location().pathname().unwrap(), "/gadgets/7");
	assert_eq!(*seen.borrow(), Some(Value::Number(7.0)));
	assert_eq!(*paths.borrow(), vec!["/gadgets/7"]);

	assert!(app.navigate("/gadgets/7").is_none(), "navigating to the current path is a no-op");
	assert!(app.navigate("/nowhere").is_none(), "unmatched paths never touch the history");
	assert_eq!(*paths.borrow(), vec!["/gadgets/7"]);

	assert!(app.redirect("/gadgets/8").is_some());
	assert_eq!(window().unwrap().location().pathname().unwrap(), "/gadgets/8");
	assert_eq!(*paths.borrow(), vec!["/gadgets/7", "/gadgets/8"]);
}
