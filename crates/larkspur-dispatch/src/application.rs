//! The root application context
//!
//! An [`Application`] owns the frozen route tree. Every node of the tree holds a weak
//! reference back to it, set once while the tree is built, so dispatch code at any
//! depth can reach the application, its settings and its route table.

use crate::components::builtin_components;
use larkspur_conf::Settings;
use larkspur_di::{Component, ContextTypes, RequestState, Value, WorkerPool};
use larkspur_exception::{Error, Result};
use larkspur_http::{
	Code, Encoding, Message, PathParams, Receiver, Request, Scope, ScopeKind, Transmitter,
	WebSocket,
};
use larkspur_urls::{Route, RouteTree, Router, SchemaRoute, WebSocketRoute};
use std::collections::HashMap;
use std::sync::Arc;

/// Request-state keys of the values the dispatcher seeds
pub mod keys {
	pub const SCOPE: &str = "scope";
	pub const RECEIVE: &str = "receive";
	pub const SEND: &str = "send";
	pub const APP: &str = "app";
	pub const PATH_PARAMS: &str = "path_params";
	pub const ROUTE: &str = "route";
	pub const REQUEST: &str = "request";
	pub const WEBSOCKET: &str = "websocket";
	pub const WEBSOCKET_ENCODING: &str = "websocket_encoding";
	pub const WEBSOCKET_MESSAGE: &str = "websocket_message";
	pub const WEBSOCKET_CODE: &str = "websocket_code";
}

/// Types handlers and components receive straight from the request state.
pub fn context_types() -> ContextTypes {
	ContextTypes::new()
		.with::<Scope>(keys::SCOPE)
		.with::<Receiver>(keys::RECEIVE)
		.with::<Transmitter>(keys::SEND)
		.with::<Application>(keys::APP)
		.with::<PathParams>(keys::PATH_PARAMS)
		.with::<Route>(keys::ROUTE)
		.with::<WebSocketRoute>(keys::ROUTE)
		.with::<Request>(keys::REQUEST)
		.with::<WebSocket>(keys::WEBSOCKET)
		.with::<Encoding>(keys::WEBSOCKET_ENCODING)
		.with::<Message>(keys::WEBSOCKET_MESSAGE)
		.with::<Code>(keys::WEBSOCKET_CODE)
}

/// Configures an [`Application`].
///
/// # Examples
///
/// ```
/// use larkspur_di::{Arguments, AsyncFn};
/// use larkspur_dispatch::Application;
/// use larkspur_http::Returned;
/// use larkspur_urls::Route;
/// use std::sync::Arc;
///
/// let hello = Arc::new(AsyncFn::new("hello", Vec::new(), |_: Arguments| async {
///     Ok(Returned::from("Hello, World!"))
/// }));
///
/// let mut builder = Application::builder();
/// builder.add_route(Route::new("/", hello).unwrap().with_name("hello"));
/// let app = builder.build().unwrap();
/// assert_eq!(app.url_path_for("hello", &Default::default()).unwrap(), "/");
/// ```
#[derive(Default)]
pub struct ApplicationBuilder {
	settings: Settings,
	router: Router,
}

impl ApplicationBuilder {
	pub fn new(settings: Settings) -> Self {
		Self {
			settings,
			router: Router::new(),
		}
	}

	pub fn add_route(&mut self, route: Route) -> &mut Self {
		self.router.add_route(route);
		self
	}

	pub fn add_websocket_route(&mut self, route: WebSocketRoute) -> &mut Self {
		self.router.add_websocket_route(route);
		self
	}

	/// Mounts `router` under `path` and returns it for further configuration.
	pub fn mount(&mut self, path: &str, router: Router) -> Result<&mut Router> {
		self.router.mount(path, router)
	}

	pub fn mount_named(
		&mut self,
		path: &str,
		name: impl Into<String>,
		router: Router,
	) -> Result<&mut Router> {
		self.router.mount_named(path, name, router)
	}

	/// Registers an application-level component, visible to every route.
	pub fn add_component(&mut self, component: Arc<dyn Component>) -> &mut Self {
		self.router.add_component(component);
		self
	}

	pub fn router_mut(&mut self) -> &mut Router {
		&mut self.router
	}

	/// Freezes the routes and pre-builds every resolution plan.
	///
	/// # Errors
	///
	/// Configuration errors: invalid settings, a handler parameter no component can
	/// satisfy, a dependency cycle or a component without an output type.
	pub fn build(self) -> Result<Arc<Application>> {
		self.settings
			.validate()
			.map_err(|e| Error::Configuration(e.to_string()))?;
		let pool = WorkerPool::new(self.settings.worker_threads);
		let builtins = builtin_components();
		let context_types = context_types();
		let Self { settings, router } = self;

		let app = Arc::new_cyclic(|weak| Application {
			tree: router.freeze(weak.clone(), &builtins, &context_types, &pool),
			settings,
		});
		app.tree.prepare()?;
		tracing::info!(
			app = %app.settings.app_name,
			routes = app.tree.schema_routes().len(),
			worker_threads = pool.size(),
			"Application built"
		);
		Ok(app)
	}
}

/// Root owning context of a route tree.
pub struct Application {
	settings: Settings,
	tree: RouteTree<Application>,
}

impl Application {
	pub fn builder() -> ApplicationBuilder {
		ApplicationBuilder::default()
	}

	pub fn with_settings(settings: Settings) -> ApplicationBuilder {
		ApplicationBuilder::new(settings)
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn tree(&self) -> &RouteTree<Application> {
		&self.tree
	}

	pub fn url_path_for(&self, name: &str, params: &HashMap<String, String>) -> Result<String> {
		self.tree.url_path_for(name, params)
	}

	pub fn schema_routes(&self) -> Vec<SchemaRoute> {
		self.tree.schema_routes()
	}

	/// Serves one connection handed over by the host runtime.
	///
	/// Failures of the request itself are answered on the transport; the returned
	/// error only reports that the transport could not be written to.
	pub async fn handle(
		self: &Arc<Self>,
		scope: Scope,
		receive: Receiver,
		transmit: Transmitter,
	) -> Result<()> {
		match scope.kind {
			ScopeKind::Http => crate::handler::handle_http(self, scope, receive, transmit).await,
			ScopeKind::WebSocket => {
				crate::websocket::handle_websocket(self, scope, receive, transmit).await
			}
		}
	}

	/// Request state with the values shared by HTTP and WebSocket dispatch.
	pub(crate) fn seed(
		self: &Arc<Self>,
		scope: &Arc<Scope>,
		receive: &Receiver,
		transmit: &Transmitter,
		path_params: PathParams,
	) -> RequestState {
		let mut state = RequestState::new();
		state.set(keys::SCOPE, Value::from_arc(scope.clone()));
		state.set(keys::RECEIVE, Value::new(receive.clone()));
		state.set(keys::SEND, Value::new(transmit.clone()));
		state.set(keys::APP, Value::from_arc(self.clone()));
		state.set(keys::PATH_PARAMS, Value::new(path_params));
		state
	}
}

impl std::fmt::Debug for Application {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Application")
			.field("settings", &self.settings)
			.finish()
	}
}

/// Scope seen by a handler mounted under `root_path`: the prefix moves from `path` to
/// `root_path`.
pub(crate) fn mounted_scope(mut scope: Scope, root_path: &str) -> Scope {
	if !root_path.is_empty() {
		if let Some(rest) = scope.path.strip_prefix(root_path) {
			scope.path = if rest.is_empty() {
				"/".to_string()
			} else {
				rest.to_string()
			};
		}
		scope.root_path.push_str(root_path);
	}
	scope
}

#[cfg(test)]
mod tests {
	use super::*;
	use larkspur_di::{Arguments, AsyncFn, Parameter};
	use larkspur_http::{Method, Returned};
	use rstest::rstest;

	struct Database;

	#[rstest]
	#[case("/a/b/c", "/a/b", "/c", "/a/b")]
	#[case("/api", "/api", "/", "/api")]
	#[case("/items", "", "/items", "")]
	fn test_mounted_scope(
		#[case] path: &str,
		#[case] root_path: &str,
		#[case] expected_path: &str,
		#[case] expected_root: &str,
	) {
		let scope = mounted_scope(Scope::http(Method::GET, path), root_path);

		assert_eq!(scope.path, expected_path);
		assert_eq!(scope.root_path, expected_root);
	}

	#[rstest]
	fn test_build_fails_on_unsatisfiable_parameter() {
		// Arrange
		let handler = Arc::new(AsyncFn::new(
			"needs_db",
			vec![Parameter::of::<Database>("db")],
			|_: Arguments| async { Ok(Returned::Empty) },
		));
		let mut builder = Application::builder();
		builder.add_route(Route::new("/", handler).unwrap());

		// Act
		let err = builder.build().unwrap_err();

		// Assert
		assert!(matches!(err, Error::ComponentNotFound { ref parameter, .. } if parameter == "db"));
	}

	#[rstest]
	fn test_build_rejects_invalid_settings() {
		let settings = Settings {
			worker_threads: 0,
			..Settings::default()
		};

		let err = Application::with_settings(settings).build().unwrap_err();

		assert!(err.is_configuration());
	}

	#[rstest]
	fn test_tree_reaches_application() {
		let handler = Arc::new(AsyncFn::new("index", Vec::new(), |_: Arguments| async {
			Ok(Returned::Empty)
		}));
		let mut builder = Application::builder();
		builder.add_route(Route::new("/", handler).unwrap());

		let app = builder.build().unwrap();

		let context = app.tree().root().context().unwrap();
		assert!(Arc::ptr_eq(&context, &app));
	}
}
