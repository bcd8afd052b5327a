//! Router builder
//!
//! A [`Router`] collects routes, WebSocket routes, mounts and components in
//! registration order. It is mutable only while the application is being configured;
//! [`Router::freeze`] turns it into an immutable [`RouteTree`] whose every node holds
//! the owning application context.

use crate::pattern::PathPattern;
use crate::route::Route;
use crate::tree::{Entry as FrozenEntry, RouteTree, RouterNode};
use crate::websocket::WebSocketRoute;
use larkspur_di::{Component, Components, ContextTypes, Injector, WorkerPool};
use larkspur_exception::Result;
use std::sync::{Arc, Weak};

/// A sub-router attached under a path prefix
pub struct Mount {
	pattern: PathPattern,
	pub name: Option<String>,
	router: Router,
}

impl Mount {
	/// Trailing slashes of `path` are ignored: `/api/` and `/api` mount the same prefix.
	pub fn new(path: &str, router: Router) -> Result<Self> {
		Ok(Self {
			pattern: PathPattern::new(path.trim_end_matches('/'))?,
			name: None,
			router,
		})
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn path(&self) -> &str {
		self.pattern.as_str()
	}

	pub fn router(&self) -> &Router {
		&self.router
	}
}

enum Entry {
	Route(Route),
	WebSocket(WebSocketRoute),
	Mount(Mount),
}

/// Mutable route registry used while configuring an application.
///
/// # Examples
///
/// ```
/// use larkspur_di::{Arguments, AsyncFn};
/// use larkspur_http::Returned;
/// use larkspur_urls::{Route, Router};
/// use std::sync::Arc;
///
/// let handler = Arc::new(AsyncFn::new("c", Vec::new(), |_: Arguments| async { Ok(Returned::Empty) }));
///
/// let mut router = Router::new();
/// router
///     .mount("/a", Router::new())
///     .unwrap()
///     .mount("/b", Router::new())
///     .unwrap()
///     .add_route(Route::new("/c", handler).unwrap());
/// assert_eq!(router.len(), 1);
/// ```
#[derive(Default)]
pub struct Router {
	entries: Vec<Entry>,
	components: Components,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_route(&mut self, route: Route) -> &mut Self {
		tracing::debug!(path = route.path(), name = ?route.name, "Adding route");
		self.entries.push(Entry::Route(route));
		self
	}

	pub fn add_websocket_route(&mut self, route: WebSocketRoute) -> &mut Self {
		tracing::debug!(path = route.path(), name = ?route.name, "Adding WebSocket route");
		self.entries.push(Entry::WebSocket(route));
		self
	}

	/// Mounts `router` under `path` and returns the mounted router for further
	/// configuration.
	pub fn mount(&mut self, path: &str, router: Router) -> Result<&mut Router> {
		self.add_mount(Mount::new(path, router)?)
	}

	/// Mounts `router` under `path` with a name used by reverse lookups (`name:route`).
	pub fn mount_named(
		&mut self,
		path: &str,
		name: impl Into<String>,
		router: Router,
	) -> Result<&mut Router> {
		self.add_mount(Mount::new(path, router)?.with_name(name))
	}

	pub fn add_mount(&mut self, mount: Mount) -> Result<&mut Router> {
		tracing::debug!(path = mount.path(), name = ?mount.name, "Mounting router");
		self.entries.push(Entry::Mount(mount));
		match self.entries.last_mut() {
			Some(Entry::Mount(mount)) => Ok(&mut mount.router),
			_ => Err(larkspur_exception::Error::Internal(
				"mount entry vanished".to_string(),
			)),
		}
	}

	/// Registers a component at this router's scope.
	pub fn add_component(&mut self, component: Arc<dyn Component>) -> &mut Self {
		self.components.push(component);
		self
	}

	/// Components registered on this router followed by those of every mounted router.
	pub fn components(&self) -> Components {
		let mut all = self.components.clone();
		for entry in &self.entries {
			if let Entry::Mount(mount) = entry {
				all = all.union(&mount.router.components());
			}
		}
		all
	}

	pub fn routes(&self) -> impl Iterator<Item = &Route> {
		self.entries.iter().filter_map(|entry| match entry {
			Entry::Route(route) => Some(route),
			_ => None,
		})
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Freezes the router into a route tree owned by `context`.
	///
	/// The root node sees `inherited` followed by [`Router::components`] (its own and
	/// every mounted router's). A mounted node sees its parent's components followed
	/// by its own.
	pub fn freeze<C>(
		self,
		context: Weak<C>,
		inherited: &Components,
		context_types: &ContextTypes,
		pool: &WorkerPool,
	) -> RouteTree<C> {
		let visible = inherited.union(&self.components());
		RouteTree::new(Arc::new(self.freeze_node(
			&context,
			visible,
			context_types,
			pool,
		)))
	}

	fn freeze_node<C>(
		self,
		context: &Weak<C>,
		visible: Components,
		context_types: &ContextTypes,
		pool: &WorkerPool,
	) -> RouterNode<C> {
		let entries = self
			.entries
			.into_iter()
			.map(|entry| match entry {
				Entry::Route(route) => FrozenEntry::Route(Arc::new(route)),
				Entry::WebSocket(route) => FrozenEntry::WebSocket(Arc::new(route)),
				Entry::Mount(mount) => {
					let child_visible = visible.union(&mount.router.components);
					FrozenEntry::Mount {
						pattern: mount.pattern,
						name: mount.name,
						node: Arc::new(mount.router.freeze_node(
							context,
							child_visible,
							context_types,
							pool,
						)),
					}
				}
			})
			.collect();
		RouterNode::new(
			context.clone(),
			Arc::new(Injector::new(visible, context_types.clone(), pool.clone())),
			entries,
		)
	}
}
