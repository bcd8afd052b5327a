//! Path patterns with typed converters
//!
//! Pattern syntax:
//!
//! - `{name}` or `{name:str}` - one path segment (excludes `/`)
//! - `{name:int}` - an integer, converted to [`PathValue::Int`]
//! - `{name:float}` - a decimal number, converted to [`PathValue::Float`]
//! - `{name:uuid}` - a hyphenated UUID, converted to [`PathValue::Uuid`]
//! - `{name:path}` - the rest of the path (includes `/`)
//!
//! A captured value that fails conversion makes the whole pattern a non-match, so
//! matching falls through to later routes.

use larkspur_exception::{Error, Result};
use larkspur_http::{PathParams, PathValue};
use regex::Regex;
use std::collections::HashMap;
use uuid::Uuid;

/// Maximum allowed pattern length
const MAX_PATTERN_LENGTH: usize = 1024;

/// Typed converter of a path parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
	Str,
	Path,
	Int,
	Float,
	Uuid,
}

impl Converter {
	fn from_name(name: &str) -> Result<Self> {
		match name {
			"" | "str" => Ok(Self::Str),
			"path" => Ok(Self::Path),
			"int" => Ok(Self::Int),
			"float" => Ok(Self::Float),
			"uuid" => Ok(Self::Uuid),
			other => Err(Error::Configuration(format!(
				"Unknown path converter \"{}\"",
				other
			))),
		}
	}

	fn regex(&self) -> &'static str {
		match self {
			Self::Str => "[^/]+",
			Self::Path => ".*",
			Self::Int => "[0-9]+",
			Self::Float => r"[0-9]+(?:\.[0-9]+)?",
			Self::Uuid => "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
		}
	}

	/// Converts a raw capture, `None` when the value does not fit the converter.
	pub fn convert(&self, raw: &str) -> Option<PathValue> {
		match self {
			Self::Str => (!raw.is_empty() && !raw.contains('/')).then(|| PathValue::Str(raw.to_string())),
			Self::Path => Some(PathValue::Path(raw.to_string())),
			Self::Int => {
				if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
					return None;
				}
				raw.parse().ok().map(PathValue::Int)
			}
			Self::Float => {
				let valid = raw
					.split_once('.')
					.map(|(int, frac)| is_digits(int) && is_digits(frac))
					.unwrap_or_else(|| is_digits(raw));
				if !valid {
					return None;
				}
				raw.parse().ok().map(PathValue::Float)
			}
			Self::Uuid => Uuid::parse_str(raw)
				.ok()
				.filter(|_| raw.len() == 36)
				.map(PathValue::Uuid),
		}
	}
}

fn is_digits(s: &str) -> bool {
	!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone)]
enum Segment {
	Literal(String),
	Param(String, Converter),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
	raw: String,
	segments: Vec<Segment>,
	full: Regex,
	prefix: Regex,
}

impl PathPattern {
	/// Compiles a pattern.
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`] for unknown converters, unbalanced braces,
	/// duplicated parameter names or oversized patterns.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_urls::PathPattern;
	/// use larkspur_http::PathValue;
	///
	/// let pattern = PathPattern::new("/puppy/{id:int}/").unwrap();
	/// let params = pattern.match_full("/puppy/42/").unwrap();
	/// assert_eq!(params.get("id"), Some(&PathValue::Int(42)));
	/// assert!(pattern.match_full("/puppy/latest/").is_none());
	/// ```
	pub fn new(pattern: &str) -> Result<Self> {
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(Error::Configuration(format!(
				"Pattern length {} exceeds maximum allowed length of {} bytes",
				pattern.len(),
				MAX_PATTERN_LENGTH
			)));
		}

		let segments = Self::parse(pattern)?;
		let mut body = String::new();
		for segment in &segments {
			match segment {
				Segment::Literal(text) => body.push_str(&regex::escape(text)),
				Segment::Param(_, converter) => {
					body.push('(');
					body.push_str(converter.regex());
					body.push(')');
				}
			}
		}

		let compile = |source: String| {
			Regex::new(&source).map_err(|e| {
				Error::Configuration(format!("Failed to compile pattern \"{}\": {}", pattern, e))
			})
		};
		Ok(Self {
			raw: pattern.to_string(),
			full: compile(format!("^{}$", body))?,
			prefix: compile(format!("^{}(/.*)?$", body))?,
			segments,
		})
	}

	fn parse(pattern: &str) -> Result<Vec<Segment>> {
		let mut segments = Vec::new();
		let mut literal = String::new();
		let mut names: Vec<String> = Vec::new();
		let mut chars = pattern.chars();

		while let Some(c) = chars.next() {
			match c {
				'{' => {
					let mut inner = String::new();
					let mut closed = false;
					for next in chars.by_ref() {
						if next == '}' {
							closed = true;
							break;
						}
						inner.push(next);
					}
					if !closed {
						return Err(Error::Configuration(format!(
							"Unclosed parameter in pattern \"{}\"",
							pattern
						)));
					}
					let (name, converter) = inner.split_once(':').unwrap_or((inner.as_str(), ""));
					let name = name.trim();
					if name.is_empty() {
						return Err(Error::Configuration(format!(
							"Empty parameter name in pattern \"{}\"",
							pattern
						)));
					}
					if names.iter().any(|n| n == name) {
						return Err(Error::Configuration(format!(
							"Duplicated parameter \"{}\" in pattern \"{}\"",
							name, pattern
						)));
					}
					if !literal.is_empty() {
						segments.push(Segment::Literal(std::mem::take(&mut literal)));
					}
					names.push(name.to_string());
					segments.push(Segment::Param(
						name.to_string(),
						Converter::from_name(converter.trim())?,
					));
				}
				'}' => {
					return Err(Error::Configuration(format!(
						"Unbalanced \"}}\" in pattern \"{}\"",
						pattern
					)));
				}
				other => literal.push(other),
			}
		}
		if !literal.is_empty() {
			segments.push(Segment::Literal(literal));
		}
		Ok(segments)
	}

	/// The pattern as written
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	pub fn param_names(&self) -> Vec<&str> {
		self.params().map(|(name, _)| name).collect()
	}

	fn params(&self) -> impl Iterator<Item = (&str, Converter)> {
		self.segments.iter().filter_map(|segment| match segment {
			Segment::Param(name, converter) => Some((name.as_str(), *converter)),
			Segment::Literal(_) => None,
		})
	}

	fn convert(&self, captures: &regex::Captures<'_>) -> Option<PathParams> {
		let mut params = PathParams::new();
		for (index, (name, converter)) in self.params().enumerate() {
			let raw = captures.get(index + 1)?.as_str();
			params.insert(name, converter.convert(raw)?);
		}
		Some(params)
	}

	/// Matches the whole path.
	pub fn match_full(&self, path: &str) -> Option<PathParams> {
		let captures = self.full.captures(path)?;
		self.convert(&captures)
	}

	/// Matches a leading portion of the path ending at a segment boundary.
	///
	/// Returns the captured parameters, the matched prefix and the remainder (always
	/// starting with `/`).
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_urls::PathPattern;
	///
	/// let pattern = PathPattern::new("/a").unwrap();
	/// let (_, prefix, remainder) = pattern.match_prefix("/a/b/c").unwrap();
	/// assert_eq!(prefix, "/a");
	/// assert_eq!(remainder, "/b/c");
	/// assert!(pattern.match_prefix("/abc").is_none());
	/// ```
	pub fn match_prefix(&self, path: &str) -> Option<(PathParams, String, String)> {
		let captures = self.prefix.captures(path)?;
		let params = self.convert(&captures)?;
		let remainder_index = self.params().count() + 1;
		let (prefix, remainder) = match captures.get(remainder_index) {
			Some(m) => (path[..m.start()].to_string(), m.as_str().to_string()),
			None => (path.to_string(), "/".to_string()),
		};
		Some((params, prefix, remainder))
	}

	/// Builds a path from parameter values.
	///
	/// Returns the path and the names of the parameters consumed, or `None` when a
	/// parameter is missing or its value does not fit the converter.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_urls::PathPattern;
	/// use std::collections::HashMap;
	///
	/// let pattern = PathPattern::new("/puppy/{id:int}/").unwrap();
	/// let params = HashMap::from([("id".to_string(), "7".to_string())]);
	/// assert_eq!(pattern.reverse(&params).unwrap().0, "/puppy/7/");
	///
	/// let bad = HashMap::from([("id".to_string(), "seven".to_string())]);
	/// assert!(pattern.reverse(&bad).is_none());
	/// ```
	pub fn reverse(&self, params: &HashMap<String, String>) -> Option<(String, Vec<String>)> {
		let mut path = String::new();
		let mut used = Vec::new();
		for segment in &self.segments {
			match segment {
				Segment::Literal(text) => path.push_str(text),
				Segment::Param(name, converter) => {
					let value = params.get(name)?;
					converter.convert(value)?;
					path.push_str(value);
					used.push(name.clone());
				}
			}
		}
		Some((path, used))
	}
}

impl PartialEq for PathPattern {
	fn eq(&self, other: &Self) -> bool {
		self.raw == other.raw
	}
}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.raw)
	}
}
