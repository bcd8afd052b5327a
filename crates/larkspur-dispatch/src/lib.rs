//! # Larkspur Dispatch
//!
//! Application context and endpoint dispatch.
//!
//! ## Overview
//!
//! The dispatch layer:
//! - owns the frozen route tree inside an [`Application`]
//! - seeds the per-request state (scope, transport halves, path parameters, route)
//! - binds handlers through the injector of the node that matched
//! - normalizes handler results into responses and errors into failure responses
//! - drives WebSocket endpoints through their connect / receive / disconnect hooks
//!
//! ## Architecture
//!
//! ```text
//! Host runtime → Application::handle ─┬─ HTTP ─────→ handler → normalize → Response
//!                                     └─ WebSocket → Session (on_connect, on_receive*, on_disconnect)
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use larkspur_di::{Arguments, AsyncFn, Parameter, Provide};
//! use larkspur_dispatch::Application;
//! use larkspur_http::{Message, Receive, Returned, Scope, Transmit};
//! use larkspur_exception::Result;
//! use larkspur_urls::Route;
//! use async_trait::async_trait;
//! use http::{Method, StatusCode};
//! use std::sync::{Arc, Mutex};
//!
//! struct Greeting(String);
//!
//! #[derive(Default)]
//! struct Wire(Mutex<Vec<Message>>);
//!
//! #[async_trait]
//! impl Receive for Wire {
//!     async fn receive(&self) -> Result<Message> {
//!         Ok(Message::HttpRequest { body: Default::default(), more_body: false })
//!     }
//! }
//!
//! #[async_trait]
//! impl Transmit for Wire {
//!     async fn transmit(&self, message: Message) -> Result<()> {
//!         self.0.lock().unwrap().push(message);
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let greeting = Arc::new(Provide::new(AsyncFn::new("greeting", Vec::new(), |_: Arguments| async {
//!     Ok(Greeting("Hello, World!".to_string()))
//! })));
//! let hello = Arc::new(AsyncFn::new(
//!     "hello",
//!     vec![Parameter::of::<Greeting>("greeting")],
//!     |args: Arguments| async move { Ok(Returned::from(args.get::<Greeting>("greeting")?.0.clone())) },
//! ));
//!
//! let mut builder = Application::builder();
//! builder.add_component(greeting).add_route(Route::new("/", hello).unwrap());
//! let app = builder.build().unwrap();
//!
//! let wire = Arc::new(Wire::default());
//! app.handle(Scope::http(Method::GET, "/"), wire.clone(), wire.clone()).await.unwrap();
//!
//! let sent = wire.0.lock().unwrap();
//! assert!(matches!(&sent[0], Message::HttpResponseStart { status, .. } if *status == StatusCode::OK));
//! assert!(matches!(&sent[1], Message::HttpResponseBody { body, .. } if body == "Hello, World!"));
//! # });
//! ```

pub mod application;
pub mod components;
pub mod exception;
pub mod handler;
pub mod websocket;

pub use application::{Application, ApplicationBuilder, context_types, keys};
pub use components::{
	Body, Data, Header, HeaderComponent, JsonDataComponent, Query, QueryParamComponent,
	RequestBodyComponent, RequestData, ValidatedData, ValidatedDataComponent,
	WebSocketDataComponent, builtin_components,
};
pub use exception::{close_code_for, convert_exception_to_response};
pub use handler::normalize;
pub use websocket::SessionState;
