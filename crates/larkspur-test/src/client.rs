//! Test client driving an application through the in-memory transport

use crate::response::TestResponse;
use crate::transport::{Exhausted, MemoryTransport};
use crate::websocket::WebSocketScript;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, Method};
use larkspur_dispatch::Application;
use larkspur_http::{Message, Scope};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
	#[error("Application error: {0}")]
	Application(#[from] larkspur_exception::Error),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Invalid header name: {0}")]
	InvalidHeaderName(#[from] http::header::InvalidHeaderName),

	#[error("Invalid header value: {0}")]
	InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

	#[error("The application sent no response")]
	NoResponse,
}

/// Sends requests to an [`Application`] without a server.
///
/// # Examples
///
/// ```
/// use larkspur_di::{Arguments, AsyncFn};
/// use larkspur_dispatch::Application;
/// use larkspur_http::Returned;
/// use larkspur_test::TestClient;
/// use larkspur_urls::Route;
/// use http::StatusCode;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let hello = Arc::new(AsyncFn::new("hello", Vec::new(), |_: Arguments| async {
///     Ok(Returned::from("Hello"))
/// }));
/// let mut builder = Application::builder();
/// builder.add_route(Route::new("/", hello).unwrap());
/// let client = TestClient::new(builder.build().unwrap());
///
/// let response = client.get("/").await.unwrap();
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.text(), "Hello");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TestClient {
	app: Arc<Application>,
}

impl TestClient {
	pub fn new(app: Arc<Application>) -> Self {
		Self { app }
	}

	pub fn app(&self) -> &Arc<Application> {
		&self.app
	}

	/// Starts building a request. `path` may carry a query string.
	pub fn request(&self, method: Method, path: &str) -> RequestBuilder<'_> {
		RequestBuilder {
			client: self,
			scope: Ok(Scope::http(method, path)),
			body: Bytes::new(),
		}
	}

	pub async fn get(&self, path: &str) -> Result<TestResponse, ClientError> {
		self.request(Method::GET, path).send().await
	}

	pub async fn post_json<T: Serialize>(
		&self,
		path: &str,
		data: &T,
	) -> Result<TestResponse, ClientError> {
		self.request(Method::POST, path).json(data).send().await
	}

	/// Starts scripting a WebSocket session on `path`.
	pub fn websocket(&self, path: &str) -> WebSocketScript {
		WebSocketScript::new(self.app.clone(), Scope::websocket(path))
	}
}

/// A request under construction
pub struct RequestBuilder<'a> {
	client: &'a TestClient,
	scope: Result<Scope, ClientError>,
	body: Bytes,
}

impl RequestBuilder<'_> {
	pub fn header(mut self, name: &str, value: &str) -> Self {
		self.scope = self.scope.and_then(|scope| {
			let name = HeaderName::from_bytes(name.as_bytes())?;
			let value = HeaderValue::from_str(value)?;
			Ok(scope.with_header(name, value))
		});
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// JSON body with the matching content type
	pub fn json<T: Serialize>(mut self, data: &T) -> Self {
		match serde_json::to_vec(data) {
			Ok(body) => {
				self.body = Bytes::from(body);
				self.header("content-type", "application/json")
			}
			Err(e) => {
				self.scope = Err(e.into());
				self
			}
		}
	}

	/// Runs the request through the application and collects the response.
	pub async fn send(self) -> Result<TestResponse, ClientError> {
		let scope = self.scope?;
		let transport = Arc::new(MemoryTransport::new(Exhausted::Repeat(
			Message::HttpDisconnect,
		)));
		transport.push(Message::HttpRequest {
			body: self.body,
			more_body: false,
		});
		self.client
			.app
			.handle(scope, transport.clone(), transport.clone())
			.await?;
		TestResponse::from_messages(&transport.sent())
	}
}
