use crate::pattern::PathPattern;
use http::Method;
use larkspur_di::Callable;
use larkspur_exception::{Error, Result};
use larkspur_http::{PathParams, Returned, Schema};
use std::sync::Arc;

/// An HTTP handler: a callable producing a [`Returned`] value
pub type Handler = Arc<dyn Callable<Output = Returned>>;

/// Class-style endpoint mapping HTTP methods to handlers.
///
/// # Examples
///
/// ```
/// use larkspur_di::{Arguments, AsyncFn};
/// use larkspur_http::Returned;
/// use larkspur_urls::MethodEndpoint;
/// use http::Method;
/// use std::sync::Arc;
///
/// let get = Arc::new(AsyncFn::new("get", Vec::new(), |_: Arguments| async { Ok(Returned::Empty) }));
/// let endpoint = MethodEndpoint::new("PuppyEndpoint").on(Method::GET, get);
/// assert_eq!(endpoint.methods(), vec![Method::GET, Method::HEAD]);
/// ```
#[derive(Clone)]
pub struct MethodEndpoint {
	name: String,
	handlers: Vec<(Method, Handler)>,
}

impl MethodEndpoint {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			handlers: Vec::new(),
		}
	}

	/// Registers the handler of `method`, replacing any previous one.
	pub fn on(mut self, method: Method, handler: Handler) -> Self {
		self.handlers.retain(|(m, _)| *m != method);
		self.handlers.push((method, handler));
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Methods the endpoint defines, plus `HEAD` whenever `GET` is defined.
	pub fn methods(&self) -> Vec<Method> {
		with_implicit_head(self.handlers.iter().map(|(m, _)| m.clone()).collect())
	}

	/// Handler of `method`; `HEAD` falls back to the `GET` handler.
	pub fn handler(&self, method: &Method) -> Option<&Handler> {
		let find = |wanted: &Method| {
			self.handlers
				.iter()
				.find(|(m, _)| m == wanted)
				.map(|(_, h)| h)
		};
		find(method).or_else(|| {
			if *method == Method::HEAD {
				find(&Method::GET)
			} else {
				None
			}
		})
	}

	pub fn handlers(&self) -> impl Iterator<Item = &Handler> {
		self.handlers.iter().map(|(_, h)| h)
	}
}

fn with_implicit_head(mut methods: Vec<Method>) -> Vec<Method> {
	if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
		methods.push(Method::HEAD);
	}
	methods
}

/// What a route invokes
#[derive(Clone)]
pub enum Endpoint {
	Function(Handler),
	Methods(Arc<MethodEndpoint>),
}

/// Outcome of matching a route against a request
#[derive(Debug, Clone, PartialEq)]
pub enum RouteMatch {
	/// Path and method match
	Full(PathParams),
	/// Path matches, method does not
	Partial(PathParams),
	None,
}

/// A leaf HTTP route.
#[derive(Clone)]
pub struct Route {
	pattern: PathPattern,
	endpoint: Endpoint,
	methods: Vec<Method>,
	pub name: Option<String>,
	pub include_in_schema: bool,
	response_schema: Option<Arc<dyn Schema>>,
	request_schema: Option<Arc<dyn Schema>>,
}

impl Route {
	/// Route to a function handler, accepting `GET` and `HEAD` unless
	/// [`Route::with_methods`] says otherwise.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_di::{Arguments, AsyncFn};
	/// use larkspur_http::Returned;
	/// use larkspur_urls::Route;
	/// use http::Method;
	/// use std::sync::Arc;
	///
	/// let handler = Arc::new(AsyncFn::new("list_puppies", Vec::new(), |_: Arguments| async {
	///     Ok(Returned::Empty)
	/// }));
	/// let route = Route::new("/puppy/", handler).unwrap().with_name("puppies");
	/// assert_eq!(route.path(), "/puppy/");
	/// assert_eq!(route.methods(), &[Method::GET, Method::HEAD]);
	/// assert_eq!(route.name.as_deref(), Some("puppies"));
	/// ```
	pub fn new(path: &str, handler: Handler) -> Result<Self> {
		Ok(Self {
			pattern: PathPattern::new(path)?,
			endpoint: Endpoint::Function(handler),
			methods: vec![Method::GET, Method::HEAD],
			name: None,
			include_in_schema: true,
			response_schema: None,
			request_schema: None,
		})
	}

	/// Route to a class-style endpoint, accepting the methods it defines.
	pub fn from_endpoint(path: &str, endpoint: Arc<MethodEndpoint>) -> Result<Self> {
		let methods = endpoint.methods();
		if methods.is_empty() {
			return Err(Error::Configuration(format!(
				"Endpoint \"{}\" defines no method handler",
				endpoint.name()
			)));
		}
		Ok(Self {
			pattern: PathPattern::new(path)?,
			endpoint: Endpoint::Methods(endpoint),
			methods,
			name: None,
			include_in_schema: true,
			response_schema: None,
			request_schema: None,
		})
	}

	/// Overrides the accepted methods. `HEAD` is added whenever `GET` is present; an
	/// empty set keeps the current methods.
	pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
		let mut unique = Vec::new();
		for method in methods {
			if !unique.contains(&method) {
				unique.push(method);
			}
		}
		if !unique.is_empty() {
			self.methods = with_implicit_head(unique);
		}
		self
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn include_in_schema(mut self, include: bool) -> Self {
		self.include_in_schema = include;
		self
	}

	/// Schema that structured data returned by the handler is serialized through
	pub fn with_response_schema(mut self, schema: Arc<dyn Schema>) -> Self {
		self.response_schema = Some(schema);
		self
	}

	/// Schema the request body is validated against by `ValidatedData` parameters
	pub fn with_request_schema(mut self, schema: Arc<dyn Schema>) -> Self {
		self.request_schema = Some(schema);
		self
	}

	pub fn path(&self) -> &str {
		self.pattern.as_str()
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn methods(&self) -> &[Method] {
		&self.methods
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}

	pub fn response_schema(&self) -> Option<&Arc<dyn Schema>> {
		self.response_schema.as_ref()
	}

	pub fn request_schema(&self) -> Option<&Arc<dyn Schema>> {
		self.request_schema.as_ref()
	}

	/// Display name: the explicit name, else the endpoint name.
	pub fn display_name(&self) -> &str {
		match (&self.name, &self.endpoint) {
			(Some(name), _) => name,
			(None, Endpoint::Function(handler)) => handler.name(),
			(None, Endpoint::Methods(endpoint)) => endpoint.name(),
		}
	}

	/// Handler serving `method`, if the route accepts it.
	pub fn handler_for(&self, method: &Method) -> Option<&Handler> {
		if !self.methods.contains(method) {
			return None;
		}
		match &self.endpoint {
			Endpoint::Function(handler) => Some(handler),
			Endpoint::Methods(endpoint) => endpoint.handler(method),
		}
	}

	/// Every handler reachable through this route
	pub fn handlers(&self) -> Vec<&Handler> {
		match &self.endpoint {
			Endpoint::Function(handler) => vec![handler],
			Endpoint::Methods(endpoint) => endpoint.handlers().collect(),
		}
	}

	pub fn matches(&self, method: &Method, path: &str) -> RouteMatch {
		match self.pattern.match_full(path) {
			Some(params) if self.methods.contains(method) => RouteMatch::Full(params),
			Some(params) => RouteMatch::Partial(params),
			None => RouteMatch::None,
		}
	}
}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route")
			.field("path", &self.pattern.as_str())
			.field("methods", &self.methods)
			.field("name", &self.name)
			.finish()
	}
}
