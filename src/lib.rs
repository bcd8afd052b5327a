//! # Larkspur
//!
//! A component-injected request engine for async Rust web applications.
//!
//! Larkspur resolves incoming HTTP and WebSocket connections against a tree of routes
//! and mounted routers, binds each handler's parameters through a dependency
//! injector and turns whatever the handler returns into a response. WebSocket
//! endpoints are driven through a connect / receive / disconnect lifecycle.
//!
//! The crate itself is a facade over the workspace crates:
//!
//! - [`conf`]: settings loaded from TOML and `LARKSPUR_*` environment variables
//! - [`di`]: callables, components and the injector
//! - [`http`]: scopes, transport messages, requests, responses and WebSockets
//! - [`urls`]: routers, route patterns and the frozen route tree
//! - [`dispatch`]: the application context and endpoint dispatch
//! - [`logging`]: `tracing` subscriber setup driven by [`Settings`]
//! - [`test`]: an in-memory client for HTTP and WebSocket sessions (feature `test`)
//!
//! ## Feature Flags
//!
//! - `full` (default): everything, including the test utilities
//! - `test`: the [`test`] module
//! - `minimal`: routing, injection, dispatch and settings only
//!
//! ## Quick Start
//!
//! ```rust
//! use larkspur::di::{Arguments, AsyncFn, Parameter, Value};
//! use larkspur::dispatch::Query;
//! use larkspur::{Application, Returned, Route};
//! use std::sync::Arc;
//!
//! let hello = Arc::new(AsyncFn::new(
//!     "hello",
//!     vec![Parameter::of::<Query<String>>("name").with_default(Value::new(Query("World".to_string())))],
//!     |args: Arguments| async move {
//!         let name = args.get::<Query<String>>("name")?;
//!         Ok(Returned::from(format!("Hello, {}!", name.0)))
//!     },
//! ));
//!
//! let mut builder = Application::builder();
//! builder.add_route(Route::new("/hello", hello).unwrap());
//! let app = builder.build().unwrap();
//! assert!(!app.settings().debug);
//! ```

pub mod conf;
pub mod di;
pub mod dispatch;
pub mod http;
pub mod logging;
pub mod urls;

pub use larkspur_conf::{ConfError, Settings};
pub use larkspur_dispatch::{Application, ApplicationBuilder};
pub use larkspur_exception::{Error, FieldError, Result};
pub use larkspur_http::{Method, Request, Response, Returned, Scope, StatusCode, WebSocket};
pub use larkspur_urls::{MethodEndpoint, Route, Router, WebSocketEndpoint, WebSocketRoute};
