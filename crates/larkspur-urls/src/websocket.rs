use crate::pattern::PathPattern;
use larkspur_di::Callable;
use larkspur_exception::Result;
use larkspur_http::{Encoding, PathParams};
use std::sync::Arc;

/// A WebSocket lifecycle hook or function endpoint
pub type Hook = Arc<dyn Callable<Output = ()>>;

/// Lifecycle hooks of a WebSocket endpoint.
///
/// Hooks left unset fall back to the default behavior: `on_connect` accepts the
/// connection, `on_receive` ignores the message and `on_disconnect` closes with the
/// recorded code.
#[derive(Clone)]
pub struct WebSocketEndpoint {
	name: String,
	encoding: Encoding,
	on_connect: Option<Hook>,
	on_receive: Option<Hook>,
	on_disconnect: Option<Hook>,
}

impl WebSocketEndpoint {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			encoding: Encoding::default(),
			on_connect: None,
			on_receive: None,
			on_disconnect: None,
		}
	}

	pub fn with_encoding(mut self, encoding: Encoding) -> Self {
		self.encoding = encoding;
		self
	}

	pub fn on_connect(mut self, hook: Hook) -> Self {
		self.on_connect = Some(hook);
		self
	}

	pub fn on_receive(mut self, hook: Hook) -> Self {
		self.on_receive = Some(hook);
		self
	}

	pub fn on_disconnect(mut self, hook: Hook) -> Self {
		self.on_disconnect = Some(hook);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn encoding(&self) -> Encoding {
		self.encoding
	}

	pub fn connect_hook(&self) -> Option<&Hook> {
		self.on_connect.as_ref()
	}

	pub fn receive_hook(&self) -> Option<&Hook> {
		self.on_receive.as_ref()
	}

	pub fn disconnect_hook(&self) -> Option<&Hook> {
		self.on_disconnect.as_ref()
	}

	pub fn hooks(&self) -> Vec<&Hook> {
		[&self.on_connect, &self.on_receive, &self.on_disconnect]
			.into_iter()
			.flatten()
			.collect()
	}
}

/// What a WebSocket route invokes
#[derive(Clone)]
pub enum WebSocketHandler {
	/// A single callable owning the whole session
	Function(Hook),
	/// Lifecycle hooks driven by the session state machine
	Endpoint(Arc<WebSocketEndpoint>),
}

/// A leaf WebSocket route.
#[derive(Clone)]
pub struct WebSocketRoute {
	pattern: PathPattern,
	handler: WebSocketHandler,
	pub name: Option<String>,
}

impl WebSocketRoute {
	pub fn new(path: &str, function: Hook) -> Result<Self> {
		Ok(Self {
			pattern: PathPattern::new(path)?,
			handler: WebSocketHandler::Function(function),
			name: None,
		})
	}

	/// # Examples
	///
	/// ```
	/// use larkspur_urls::{WebSocketEndpoint, WebSocketRoute};
	/// use larkspur_http::Encoding;
	/// use std::sync::Arc;
	///
	/// let endpoint = WebSocketEndpoint::new("Echo").with_encoding(Encoding::Text);
	/// let route = WebSocketRoute::from_endpoint("/ws/{room}", Arc::new(endpoint)).unwrap();
	/// assert!(route.matches("/ws/lobby").is_some());
	/// assert!(route.matches("/ws/").is_none());
	/// ```
	pub fn from_endpoint(path: &str, endpoint: Arc<WebSocketEndpoint>) -> Result<Self> {
		Ok(Self {
			pattern: PathPattern::new(path)?,
			handler: WebSocketHandler::Endpoint(endpoint),
			name: None,
		})
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn path(&self) -> &str {
		self.pattern.as_str()
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn handler(&self) -> &WebSocketHandler {
		&self.handler
	}

	/// Encoding of inbound frames (`bytes` for function handlers)
	pub fn encoding(&self) -> Encoding {
		match &self.handler {
			WebSocketHandler::Function(_) => Encoding::default(),
			WebSocketHandler::Endpoint(endpoint) => endpoint.encoding(),
		}
	}

	pub fn hooks(&self) -> Vec<&Hook> {
		match &self.handler {
			WebSocketHandler::Function(function) => vec![function],
			WebSocketHandler::Endpoint(endpoint) => endpoint.hooks(),
		}
	}

	pub fn matches(&self, path: &str) -> Option<PathParams> {
		self.pattern.match_full(path)
	}
}

impl std::fmt::Debug for WebSocketRoute {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebSocketRoute")
			.field("path", &self.pattern.as_str())
			.field("name", &self.name)
			.finish()
	}
}
