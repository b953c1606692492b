#![doc(html_root_url = "https://docs.rs/suberin/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod app;
mod bridge;
pub mod diff;
pub mod dispatch;
pub mod evented;
pub mod load;
pub mod props;
pub mod router;
pub mod schedule;
pub mod state;
pub mod value;
pub mod vdom;
pub mod view;

pub use app::{App, Context};
pub use dispatch::{Handler, Kind, Outcome};
pub use evented::{EventArg, Subscription};
pub use state::AppState;
pub use value::{Value, ValueMap};
pub use vdom::{attr, h, text, AttrValue, Child, EventHandler, VNode};
pub use view::Dispatcher;
