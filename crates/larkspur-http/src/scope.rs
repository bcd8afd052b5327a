//! Connection scope handed over by the host server runtime

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::net::SocketAddr;

/// Kind of connection a scope describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
	Http,
	WebSocket,
}

/// Description of one inbound connection.
///
/// The host runtime builds a scope per connection; larkspur never parses bytes off the
/// wire itself.
#[derive(Debug, Clone)]
pub struct Scope {
	pub kind: ScopeKind,
	pub method: Method,
	/// Path relative to `root_path`
	pub path: String,
	/// Prefix already consumed by mounts above the current router
	pub root_path: String,
	pub query_string: String,
	pub headers: HeaderMap,
	pub client: Option<SocketAddr>,
}

impl Scope {
	/// Creates an HTTP scope.
	///
	/// A query string embedded in `path` is split off into [`Scope::query_string`].
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::{Scope, ScopeKind};
	/// use http::Method;
	///
	/// let scope = Scope::http(Method::GET, "/items/?page=2");
	/// assert_eq!(scope.kind, ScopeKind::Http);
	/// assert_eq!(scope.path, "/items/");
	/// assert_eq!(scope.query_string, "page=2");
	/// ```
	pub fn http(method: Method, path: impl Into<String>) -> Self {
		Self::new(ScopeKind::Http, method, path.into())
	}

	/// Creates a WebSocket scope. The method is recorded as `GET` (the upgrade request).
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::{Scope, ScopeKind};
	///
	/// let scope = Scope::websocket("/ws/chat");
	/// assert_eq!(scope.kind, ScopeKind::WebSocket);
	/// ```
	pub fn websocket(path: impl Into<String>) -> Self {
		Self::new(ScopeKind::WebSocket, Method::GET, path.into())
	}

	fn new(kind: ScopeKind, method: Method, path: String) -> Self {
		let (path, query_string) = match path.split_once('?') {
			Some((path, query)) => (path.to_string(), query.to_string()),
			None => (path, String::new()),
		};
		Self {
			kind,
			method,
			path,
			root_path: String::new(),
			query_string,
			headers: HeaderMap::new(),
			client: None,
		}
	}

	pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
		self.query_string = query_string.into();
		self
	}

	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.append(name, value);
		self
	}

	pub fn with_client(mut self, client: SocketAddr) -> Self {
		self.client = Some(client);
		self
	}

	pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
		self.root_path = root_path.into();
		self
	}

	/// Path including the root path prefix.
	pub fn full_path(&self) -> String {
		format!("{}{}", self.root_path, self.path)
	}

	/// First value of a header, if present and valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}
}
