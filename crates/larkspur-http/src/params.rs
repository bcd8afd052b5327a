//! Path and query parameters

use std::fmt;
use uuid::Uuid;

/// A typed path-parameter value produced by a path converter.
#[derive(Debug, Clone, PartialEq)]
pub enum PathValue {
	Str(String),
	Int(i64),
	Float(f64),
	Uuid(Uuid),
	/// Remainder of the path, slashes included
	Path(String),
}

impl PathValue {
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(v) => Some(*v),
			Self::Int(v) => Some(*v as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(v) | Self::Path(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_uuid(&self) -> Option<Uuid> {
		match self {
			Self::Uuid(v) => Some(*v),
			_ => None,
		}
	}
}

impl fmt::Display for PathValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(v) | Self::Path(v) => write!(f, "{}", v),
			Self::Int(v) => write!(f, "{}", v),
			Self::Float(v) => write!(f, "{}", v),
			Self::Uuid(v) => write!(f, "{}", v),
		}
	}
}

/// Ordered path parameters captured while matching a route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams(Vec<(String, PathValue)>);

impl PathParams {
	pub fn new() -> Self {
		Self(Vec::new())
	}

	/// Inserts a value, replacing any previous value captured under the same name.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::{PathParams, PathValue};
	///
	/// let mut params = PathParams::new();
	/// params.insert("id", PathValue::Int(1));
	/// params.insert("id", PathValue::Int(2));
	/// assert_eq!(params.len(), 1);
	/// assert_eq!(params.get("id"), Some(&PathValue::Int(2)));
	/// ```
	pub fn insert(&mut self, name: impl Into<String>, value: PathValue) {
		let name = name.into();
		match self.0.iter_mut().find(|(n, _)| *n == name) {
			Some(slot) => slot.1 = value,
			None => self.0.push((name, value)),
		}
	}

	pub fn get(&self, name: &str) -> Option<&PathValue> {
		self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}

	pub fn extend(&mut self, other: PathParams) {
		for (name, value) in other.0 {
			self.insert(name, value);
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &PathValue)> {
		self.0.iter().map(|(n, v)| (n.as_str(), v))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Decoded query-string parameters, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
	/// Parses a raw query string. Malformed pairs are skipped.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::QueryParams;
	///
	/// let params = QueryParams::parse("tag=a&tag=b&q=hello%20world");
	/// assert_eq!(params.get("q"), Some("hello world"));
	/// assert_eq!(params.get_all("tag"), vec!["a", "b"]);
	/// assert_eq!(params.get("missing"), None);
	/// ```
	pub fn parse(query_string: &str) -> Self {
		let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query_string)
			.unwrap_or_else(|e| {
				tracing::debug!(error = %e, "Discarding malformed query string");
				Vec::new()
			});
		Self(pairs)
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.0
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v.as_str())
	}

	pub fn get_all(&self, name: &str) -> Vec<&str> {
		self.0
			.iter()
			.filter(|(n, _)| n == name)
			.map(|(_, v)| v.as_str())
			.collect()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
