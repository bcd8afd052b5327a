//! # Larkspur URLs
//!
//! Route registration, matching and reverse lookup.
//!
//! Configuration code builds a [`Router`]: leaf [`Route`]s, [`WebSocketRoute`]s,
//! [`Mount`]ed sub-routers and router-scoped components. Freezing the router produces a
//! [`RouteTree`] in which every node holds a reference to the owning application
//! context and an injector over the components it can see. The root sees every
//! registered component, its own first; a mounted node sees its ancestors' followed by
//! its own.
//!
//! ```
//! use larkspur_di::{Arguments, AsyncFn, Components, ContextTypes, WorkerPool};
//! use larkspur_http::{Returned, ScopeKind};
//! use larkspur_urls::{Resolution, Route, Router};
//! use http::Method;
//! use std::sync::Arc;
//!
//! struct App;
//!
//! let handler = Arc::new(AsyncFn::new("c", Vec::new(), |_: Arguments| async { Ok(Returned::Empty) }));
//! let mut router = Router::new();
//! router
//!     .mount("/a", Router::new())
//!     .unwrap()
//!     .mount("/b", Router::new())
//!     .unwrap()
//!     .add_route(Route::new("/c", handler).unwrap());
//!
//! let app = Arc::new(App);
//! let tree = router.freeze(
//!     Arc::downgrade(&app),
//!     &Components::new(),
//!     &ContextTypes::new(),
//!     &WorkerPool::default(),
//! );
//! match tree.resolve(ScopeKind::Http, &Method::GET, "/a/b/c") {
//!     Resolution::Full(resolved) => assert_eq!(resolved.root_path, "/a/b"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

pub mod pattern;
pub mod route;
pub mod router;
pub mod tree;
pub mod websocket;

pub use pattern::{Converter, PathPattern};
pub use route::{Endpoint, Handler, MethodEndpoint, Route, RouteMatch};
pub use router::{Mount, Router};
pub use tree::{Resolution, Resolved, RouteTree, RouterNode, SchemaRoute, Target};
pub use websocket::{Hook, WebSocketEndpoint, WebSocketHandler, WebSocketRoute};
