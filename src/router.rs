//! URL path templates and their matcher programs.
//!
//! A pattern like `/users/:id/posts/:page?` compiles to an anchored sequence of segment
//! matchers (the moral equivalent of the case-insensitive regular expression the pattern
//! describes) plus the ordered capture names. Matching normalizes the path, URL-decodes
//! captures and coerces them to their natural types.
//!
//! Optional parameters are only well-defined in trailing position; a pattern placing one
//! before a later required segment is a caller contract violation and matches whatever
//! the segment program happens to accept.

use crate::value::{Value, ValueMap};
use std::rc::Rc;

/// Reserved parameter name for wildcard captures.
pub const WILDCARD: &str = "wildcard";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param(String),
	Optional(String),
	/// Captures the `/`-joined remainder of the path.
	Wildcard,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct Route {
	segments: Vec<Segment>,
}

impl Route {
	/// Compiles a path template. Segments starting with `:` capture a required parameter,
	/// `:name?` an optional one, `*` the remainder of the path.
	#[must_use]
	pub fn compile(pattern: &str) -> Self {
		let segments = pattern
			.split('/')
			.filter(|raw| !raw.is_empty())
			.map(|raw| {
				if raw.starts_with('*') {
					Segment::Wildcard
				} else if let Some(name) = raw.strip_prefix(':') {
					if let Some(name) = name.strip_suffix('?') {
						Segment::Optional(name.to_owned())
					} else {
						Segment::Param(name.to_owned())
					}
				} else {
					Segment::Literal(raw.to_owned())
				}
			})
			.collect();
		Self { segments }
	}

	/// Matches a normalized path (leading `/`, no trailing slash except `/` itself).
	///
	/// Returns the captured parameters on success; an empty capture set is returned as an
	/// empty mapping, which the dispatch layer represents as null params.
	#[must_use]
	pub fn matches(&self, path: &str) -> Option<ValueMap> {
		if !path.starts_with('/') {
			return None;
		}
		let segments: Vec<&str> = path[1..].split('/').filter(|segment| !segment.is_empty()).collect();

		let mut params = ValueMap::new();
		let mut i = 0;
		for (position, segment) in self.segments.iter().enumerate() {
			match segment {
				Segment::Literal(literal) => {
					let candidate = segments.get(i)?;
					if !candidate.eq_ignore_ascii_case(literal) {
						return None;
					}
					i += 1;
				}
				Segment::Param(name) => {
					let candidate = segments.get(i)?;
					params.insert(Rc::from(name.as_str()), coerce(candidate));
					i += 1;
				}
				Segment::Optional(name) => match segments.get(i) {
					Some(candidate) => {
						params.insert(Rc::from(name.as_str()), coerce(candidate));
						i += 1;
					}
					None => {
						params.insert(Rc::from(name.as_str()), Value::Null);
					}
				},
				Segment::Wildcard => {
					// A bare `/*` pattern also matches the root path with an empty capture;
					// anywhere else the wildcard requires the path to continue.
					if position > 0 && i >= segments.len() {
						return None;
					}
					let remainder = segments[i.min(segments.len())..].join("/");
					params.insert(Rc::from(WILDCARD), Value::string(decode(&remainder)));
					i = segments.len();
				}
			}
		}
		if i == segments.len() {
			Some(params)
		} else {
			None
		}
	}
}

/// Trims the path and strips one trailing slash; the root path stays `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
	let path = path.trim();
	if path == "/" {
		path.to_owned()
	} else if let Some(stripped) = path.strip_suffix('/') {
		stripped.to_owned()
	} else {
		path.to_owned()
	}
}

fn coerce(raw: &str) -> Value {
	Value::from_segment(&decode(raw))
}

/// Percent-decodes a path segment (UTF-8). Malformed escape sequences are passed
/// through verbatim instead of failing the match.
#[must_use]
pub fn decode(raw: &str) -> String {
	let bytes = raw.as_bytes();
	let mut decoded = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' {
			let pair = bytes.get(i + 1..i + 3).and_then(|pair| core::str::from_utf8(pair).ok());
			if let Some(byte) = pair.and_then(|pair| u8::from_str_radix(pair, 16).ok()) {
				decoded.push(byte);
				i += 3;
				continue;
			}
		}
		decoded.push(bytes[i]);
		i += 1;
	}
	String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Value;

	fn params(route: &Route, path: &str) -> Option<Vec<(String, Value)>> {
		route.matches(&normalize_path(path)).map(|map| {
			let mut entries: Vec<(String, Value)> = map.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
			entries.sort_by(|a, b| a.0.cmp(&b.0));
			entries
		})
	}

	#[test]
	fn root_path() {
		let route = Route::compile("/");
		assert_eq!(params(&route, "/"), Some(vec![]));
		assert_eq!(params(&route, ""), None);
		assert_eq!(params(&route, "/foo"), None);
	}

	#[test]
	fn static_paths_with_optional_trailing_slash() {
		let route = Route::compile("/foo/bar/baz");
		assert_eq!(params(&route, "/foo/bar/baz"), Some(vec![]));
		assert_eq!(params(&route, "/foo/bar/baz/"), Some(vec![]));
		assert_eq!(params(&route, "foo/bar/baz"), None);
		assert_eq!(params(&route, "/foo/bar/baz/qux"), None);
		assert_eq!(params(&route, "/fo/bar/baz"), None);
	}

	#[test]
	fn literals_match_case_insensitively() {
		let route = Route::compile("/Foo");
		assert_eq!(params(&route, "/foo"), Some(vec![]));
		assert_eq!(params(&route, "/FOO"), Some(vec![]));
	}

	#[test]
	fn required_params() {
		let route = Route::compile("/root/:foo/:bar");
		assert_eq!(
			params(&route, "/root/aaa/bbb/"),
			Some(vec![("bar".to_owned(), "bbb".into()), ("foo".to_owned(), "aaa".into())])
		);
		assert_eq!(params(&route, "/root/foo"), None);
		assert_eq!(params(&route, "/root/foo/bar/baz"), None);
	}

	#[test]
	fn optional_params_in_trailing_position() {
		let route = Route::compile("/root/:foo?/:bar?");
		assert_eq!(
			params(&route, "/root/foo"),
			Some(vec![("bar".to_owned(), Value::Null), ("foo".to_owned(), "foo".into())])
		);
		assert_eq!(
			params(&route, "/root/aaa/bbb/"),
			Some(vec![("bar".to_owned(), "bbb".into()), ("foo".to_owned(), "aaa".into())])
		);
		assert_eq!(
			params(&route, "/root"),
			Some(vec![("bar".to_owned(), Value::Null), ("foo".to_owned(), Value::Null)])
		);
		assert_eq!(params(&route, "/root/aaa/bbb/ccc"), None);
	}

	#[test]
	fn optional_param_after_static_segment() {
		let route = Route::compile("/root/:foo?/static/:bar?");
		assert_eq!(
			params(&route, "/root/foo/static"),
			Some(vec![("bar".to_owned(), Value::Null), ("foo".to_owned(), "foo".into())])
		);
		assert_eq!(
			params(&route, "/root/aaa/static/bbb/"),
			Some(vec![("bar".to_owned(), "bbb".into()), ("foo".to_owned(), "aaa".into())])
		);
		assert_eq!(params(&route, "/root/foo/staic/bar"), None);
	}

	#[test]
	fn mixed_required_and_optional() {
		let route = Route::compile("/root/:foo/:bar?/:baz?");
		assert_eq!(
			params(&route, "/root/foo"),
			Some(vec![
				("bar".to_owned(), Value::Null),
				("baz".to_owned(), Value::Null),
				("foo".to_owned(), "foo".into()),
			])
		);
		assert_eq!(
			params(&route, "/root/aaa/bbb/ccc/"),
			Some(vec![
				("bar".to_owned(), "bbb".into()),
				("baz".to_owned(), "ccc".into()),
				("foo".to_owned(), "aaa".into()),
			])
		);
		assert_eq!(params(&route, "/root"), None);
	}

	#[test]
	fn wildcards() {
		let route = Route::compile("/root/*");
		assert_eq!(params(&route, "/root/foo"), Some(vec![(WILDCARD.to_owned(), "foo".into())]));
		assert_eq!(params(&route, "/root/foo/bar"), Some(vec![(WILDCARD.to_owned(), "foo/bar".into())]));
		assert_eq!(params(&route, "/root"), None);
		assert_eq!(params(&route, "/root/"), None);

		let catch_all = Route::compile("/*");
		assert_eq!(params(&catch_all, "/"), Some(vec![(WILDCARD.to_owned(), "".into())]));
		assert_eq!(params(&catch_all, "/foo/bar"), Some(vec![(WILDCARD.to_owned(), "foo/bar".into())]));
	}

	#[test]
	fn decodes_and_coerces_captures() {
		let route = Route::compile("/:string/:yes/:no/:int/:float/:null");
		assert_eq!(
			params(&route, "/foo/true/false/123/45.891/undefined"),
			Some(vec![
				("float".to_owned(), Value::Number(45.891)),
				("int".to_owned(), Value::Number(123.0)),
				("no".to_owned(), Value::Bool(false)),
				("null".to_owned(), Value::Null),
				("string".to_owned(), "foo".into()),
				("yes".to_owned(), Value::Bool(true)),
			])
		);

		let unicode = Route::compile("/foo/:bar");
		assert_eq!(
			params(&unicode, "/foo/%D1%88%D0%B5%D0%BB%D0%BB%D1%8B"),
			Some(vec![("bar".to_owned(), "шеллы".into())])
		);
	}

	#[test]
	fn passes_through_rfc3986_special_characters() {
		let route = Route::compile("/foo/:bar");
		assert_eq!(
			params(&route, "/foo/-._~:?#[]@!$&'()*+,;="),
			Some(vec![("bar".to_owned(), "-._~:?#[]@!$&'()*+,;=".into())])
		);
	}

	#[test]
	fn malformed_escapes_pass_through() {
		assert_eq!(decode("%"), "%");
		assert_eq!(decode("%zz"), "%zz");
		assert_eq!(decode("a%2"), "a%2");
	}

	#[test]
	fn path_normalization() {
		assert_eq!(normalize_path("/"), "/");
		assert_eq!(normalize_path("/foo/"), "/foo");
		assert_eq!(normalize_path("  /foo  "), "/foo");
		assert_eq!(normalize_path("/foo"), "/foo");
		assert_eq!(normalize_path(""), "");
	}
}
