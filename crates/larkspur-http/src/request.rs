use crate::params::QueryParams;
use crate::scope::Scope;
use crate::transport::{Message, Receive, close_code};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Method, StatusCode};
use larkspur_exception::{Error, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// An HTTP request bound to its transport.
///
/// The body is pulled lazily from the receive half and cached, so several components
/// may read it within the same request.
pub struct Request {
	scope: Arc<Scope>,
	receive: Arc<dyn Receive>,
	body: OnceCell<Bytes>,
}

impl Request {
	pub fn new(scope: Arc<Scope>, receive: Arc<dyn Receive>) -> Self {
		Self {
			scope,
			receive,
			body: OnceCell::new(),
		}
	}

	pub fn scope(&self) -> &Scope {
		&self.scope
	}

	pub fn method(&self) -> &Method {
		&self.scope.method
	}

	pub fn path(&self) -> &str {
		&self.scope.path
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.scope.headers
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.scope.header(name)
	}

	pub fn query_params(&self) -> QueryParams {
		QueryParams::parse(&self.scope.query_string)
	}

	/// Media type of the body, without parameters.
	pub fn content_type(&self) -> Option<&str> {
		self.header("content-type")
			.map(|v| v.split(';').next().unwrap_or(v).trim())
	}

	/// Full request body.
	///
	/// Chunks are read until the transport reports no more body. A disconnect before
	/// the body completes yields [`Error::ClientDisconnected`].
	pub async fn body(&self) -> Result<Bytes> {
		self.body
			.get_or_try_init(|| async {
				let mut buffer = BytesMut::new();
				loop {
					match self.receive.receive().await? {
						Message::HttpRequest { body, more_body } => {
							buffer.extend_from_slice(&body);
							if !more_body {
								break;
							}
						}
						Message::HttpDisconnect => {
							return Err(Error::ClientDisconnected {
								code: close_code::GOING_AWAY,
							});
						}
						other => {
							tracing::debug!(message = ?other, "Ignoring unexpected message while reading body");
						}
					}
				}
				Ok(buffer.freeze())
			})
			.await
			.cloned()
	}

	/// Body decoded as JSON. An empty body decodes to `null`.
	pub async fn json(&self) -> Result<serde_json::Value> {
		let body = self.body().await?;
		if body.is_empty() {
			return Ok(serde_json::Value::Null);
		}
		serde_json::from_slice(&body).map_err(|e| {
			Error::http_with_detail(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e))
		})
	}
}

impl std::fmt::Debug for Request {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Request")
			.field("method", &self.scope.method)
			.field("path", &self.scope.path)
			.finish()
	}
}
