//! Frozen route tree
//!
//! ## Matching
//!
//! Entries are tried in registration order. A leaf route either matches fully (path
//! and method), partially (path only) or not at all. A mount strips its prefix and
//! recurses with the remainder, appending the prefix to the root path. The first full
//! match at any depth wins; otherwise the first partial match is reported so callers
//! can answer "method not allowed" instead of "not found".

use crate::pattern::PathPattern;
use crate::route::{Route, RouteMatch};
use crate::websocket::WebSocketRoute;
use http::Method;
use larkspur_di::{Components, Injector};
use larkspur_exception::{Error, Result};
use larkspur_http::{PathParams, ScopeKind};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

pub(crate) enum Entry<C> {
	Route(Arc<Route>),
	WebSocket(Arc<WebSocketRoute>),
	Mount {
		pattern: PathPattern,
		name: Option<String>,
		node: Arc<RouterNode<C>>,
	},
}

/// One frozen router: its entries, its visible components and the owning context.
pub struct RouterNode<C> {
	context: Weak<C>,
	injector: Arc<Injector>,
	entries: Vec<Entry<C>>,
}

impl<C> RouterNode<C> {
	pub(crate) fn new(context: Weak<C>, injector: Arc<Injector>, entries: Vec<Entry<C>>) -> Self {
		Self {
			context,
			injector,
			entries,
		}
	}

	/// The owning application context, while it is alive.
	pub fn context(&self) -> Option<Arc<C>> {
		self.context.upgrade()
	}

	/// Injector resolving against this node's visible components
	pub fn injector(&self) -> &Arc<Injector> {
		&self.injector
	}

	/// Components visible from this node: every ancestor's followed by its own. The root
	/// also sees those of every mounted router.
	pub fn components(&self) -> &Components {
		self.injector.components()
	}

	fn resolve(
		self: &Arc<Self>,
		kind: ScopeKind,
		method: &Method,
		path: &str,
		root_path: &str,
	) -> Resolution<C> {
		let mut partial: Option<Resolved<C>> = None;
		for entry in &self.entries {
			match entry {
				Entry::Route(route) if kind == ScopeKind::Http => {
					match route.matches(method, path) {
						RouteMatch::Full(path_params) => {
							return Resolution::Full(self.resolved(
								Target::Http(route.clone()),
								path_params,
								root_path,
							));
						}
						RouteMatch::Partial(path_params) => {
							if partial.is_none() {
								partial = Some(self.resolved(
									Target::Http(route.clone()),
									path_params,
									root_path,
								));
							}
						}
						RouteMatch::None => {}
					}
				}
				Entry::WebSocket(route) if kind == ScopeKind::WebSocket => {
					if let Some(path_params) = route.matches(path) {
						return Resolution::Full(self.resolved(
							Target::WebSocket(route.clone()),
							path_params,
							root_path,
						));
					}
				}
				Entry::Mount { pattern, node, .. } => {
					let Some((mount_params, prefix, remainder)) = pattern.match_prefix(path)
					else {
						continue;
					};
					let child_root = format!("{}{}", root_path, prefix);
					match node.resolve(kind, method, &remainder, &child_root) {
						Resolution::Full(resolved) => {
							return Resolution::Full(resolved.with_mount_params(mount_params));
						}
						Resolution::Partial(resolved) => {
							if partial.is_none() {
								partial = Some(resolved.with_mount_params(mount_params));
							}
						}
						Resolution::NotFound => {}
					}
				}
				_ => {}
			}
		}
		match partial {
			Some(resolved) => Resolution::Partial(resolved),
			None => Resolution::NotFound,
		}
	}

	fn resolved(self: &Arc<Self>, target: Target, path_params: PathParams, root_path: &str) -> Resolved<C> {
		Resolved {
			target,
			path_params,
			root_path: root_path.to_string(),
			node: self.clone(),
		}
	}

	fn url_path_for(&self, name: &str, params: &HashMap<String, String>) -> Option<String> {
		for entry in &self.entries {
			match entry {
				Entry::Route(route) if route.name.as_deref() == Some(name) => {
					if let Some(path) = reverse_exact(route.pattern(), params) {
						return Some(path);
					}
				}
				Entry::WebSocket(route) if route.name.as_deref() == Some(name) => {
					if let Some(path) = reverse_exact(route.pattern(), params) {
						return Some(path);
					}
				}
				Entry::Mount {
					pattern,
					name: mount_name,
					node,
				} => {
					let remaining_name = match mount_name {
						Some(mount_name) => match name.split_once(':') {
							Some((head, rest)) if head == mount_name => rest,
							_ => continue,
						},
						None => name,
					};
					let Some((prefix, used)) = pattern.reverse(params) else {
						continue;
					};
					let child_params: HashMap<String, String> = params
						.iter()
						.filter(|(key, _)| !used.contains(*key))
						.map(|(key, value)| (key.clone(), value.clone()))
						.collect();
					if let Some(path) = node.url_path_for(remaining_name, &child_params) {
						return Some(format!("{}{}", prefix, path));
					}
				}
				_ => {}
			}
		}
		None
	}

	fn collect_schema_routes(&self, prefix: &str, out: &mut Vec<SchemaRoute>) {
		for entry in &self.entries {
			match entry {
				Entry::Route(route) if route.include_in_schema => out.push(SchemaRoute {
					path: format!("{}{}", prefix, route.path()),
					methods: route.methods().to_vec(),
					name: route.display_name().to_string(),
					route: route.clone(),
				}),
				Entry::Mount { pattern, node, .. } => {
					node.collect_schema_routes(&format!("{}{}", prefix, pattern.as_str()), out)
				}
				_ => {}
			}
		}
	}

	fn for_each_node(self: &Arc<Self>, f: &mut dyn FnMut(&Arc<RouterNode<C>>) -> Result<()>) -> Result<()> {
		f(self)?;
		for entry in &self.entries {
			if let Entry::Mount { node, .. } = entry {
				node.for_each_node(f)?;
			}
		}
		Ok(())
	}

	/// Leaf routes registered directly on this node
	pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
		self.entries.iter().filter_map(|entry| match entry {
			Entry::Route(route) => Some(route),
			_ => None,
		})
	}

	/// WebSocket routes registered directly on this node
	pub fn websocket_routes(&self) -> impl Iterator<Item = &Arc<WebSocketRoute>> {
		self.entries.iter().filter_map(|entry| match entry {
			Entry::WebSocket(route) => Some(route),
			_ => None,
		})
	}
}

/// Reverses a leaf pattern, requiring every given parameter to be consumed.
fn reverse_exact(pattern: &PathPattern, params: &HashMap<String, String>) -> Option<String> {
	let (path, used) = pattern.reverse(params)?;
	(used.len() == params.len()).then_some(path)
}

/// Matched leaf
#[derive(Debug, Clone)]
pub enum Target {
	Http(Arc<Route>),
	WebSocket(Arc<WebSocketRoute>),
}

/// A matched route with everything needed to dispatch it
pub struct Resolved<C> {
	pub target: Target,
	pub path_params: PathParams,
	/// Concatenation of every ancestor mount prefix
	pub root_path: String,
	/// Node the route belongs to
	pub node: Arc<RouterNode<C>>,
}

impl<C> Resolved<C> {
	fn with_mount_params(mut self, mount_params: PathParams) -> Self {
		let mut params = mount_params;
		params.extend(self.path_params);
		self.path_params = params;
		self
	}

	pub fn injector(&self) -> &Arc<Injector> {
		self.node.injector()
	}
}

impl<C> std::fmt::Debug for Resolved<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Resolved")
			.field("target", &self.target)
			.field("path_params", &self.path_params)
			.field("root_path", &self.root_path)
			.finish()
	}
}

/// Outcome of resolving a request against the tree
pub enum Resolution<C> {
	Full(Resolved<C>),
	/// Path matched but not the method
	Partial(Resolved<C>),
	NotFound,
}

impl<C> Resolution<C> {
	fn outcome(&self) -> &'static str {
		match self {
			Self::Full(_) => "full",
			Self::Partial(_) => "partial",
			Self::NotFound => "not_found",
		}
	}
}

impl<C> std::fmt::Debug for Resolution<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Full(resolved) => f.debug_tuple("Full").field(resolved).finish(),
			Self::Partial(resolved) => f.debug_tuple("Partial").field(resolved).finish(),
			Self::NotFound => f.write_str("NotFound"),
		}
	}
}

/// A leaf route visible to schema generators
#[derive(Debug, Clone)]
pub struct SchemaRoute {
	/// Absolute path pattern, every mount prefix included
	pub path: String,
	pub methods: Vec<Method>,
	pub name: String,
	pub route: Arc<Route>,
}

/// Immutable route tree built by [`Router::freeze`](crate::Router::freeze).
pub struct RouteTree<C> {
	root: Arc<RouterNode<C>>,
}

impl<C> RouteTree<C> {
	pub(crate) fn new(root: Arc<RouterNode<C>>) -> Self {
		Self { root }
	}

	pub fn root(&self) -> &Arc<RouterNode<C>> {
		&self.root
	}

	/// Resolves a request path.
	pub fn resolve(&self, kind: ScopeKind, method: &Method, path: &str) -> Resolution<C> {
		let resolution = self.root.resolve(kind, method, path, "");
		tracing::debug!(
			path,
			method = %method,
			outcome = resolution.outcome(),
			"Resolved route"
		);
		resolution
	}

	/// Absolute path of the route called `name`.
	///
	/// Routes inside named mounts are addressed as `mount:route`; unnamed mounts are
	/// transparent.
	///
	/// # Errors
	///
	/// [`Error::NoReverseMatch`] when no route has that name or the parameters do not
	/// fit its pattern.
	pub fn url_path_for(&self, name: &str, params: &HashMap<String, String>) -> Result<String> {
		self.root
			.url_path_for(name, params)
			.ok_or_else(|| Error::NoReverseMatch(name.to_string()))
	}

	/// Every leaf route flagged for schema inclusion, with absolute paths.
	pub fn schema_routes(&self) -> Vec<SchemaRoute> {
		let mut out = Vec::new();
		self.root.collect_schema_routes("", &mut out);
		out
	}

	/// Prepares the resolution plan of every handler and hook in the tree.
	///
	/// # Errors
	///
	/// The first configuration error found, e.g. a parameter no component provides.
	pub fn prepare(&self) -> Result<()> {
		self.root.for_each_node(&mut |node| {
			for route in node.routes() {
				for handler in route.handlers() {
					node.injector().prepare(handler).map_err(|e| {
						tracing::error!(route = route.path(), error = %e, "Invalid route");
						e
					})?;
				}
			}
			for route in node.websocket_routes() {
				for hook in route.hooks() {
					node.injector().prepare(hook).map_err(|e| {
						tracing::error!(route = route.path(), error = %e, "Invalid WebSocket route");
						e
					})?;
				}
			}
			Ok(())
		})
	}
}
