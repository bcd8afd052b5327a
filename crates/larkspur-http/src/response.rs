use crate::transport::{Message, Transmit};
use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use larkspur_exception::{Error, Result};
use serde::Serialize;

/// HTTP response produced by a handler or by error mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn no_content() -> Self {
		Self::new(StatusCode::NO_CONTENT)
	}

	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Add a custom header to the response. Invalid names or values are ignored.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::Response;
	///
	/// let response = Response::ok().with_header("X-Custom-Header", "custom-value");
	/// assert_eq!(
	///     response.headers.get("X-Custom-Header").unwrap().to_str().unwrap(),
	///     "custom-value"
	/// );
	/// ```
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	/// Plain text response with `text/plain; charset=utf-8` content type
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::Response;
	///
	/// let response = Response::text("hello");
	/// assert_eq!(response.body, "hello");
	/// assert_eq!(response.content_type(), Some("text/plain; charset=utf-8"));
	/// ```
	pub fn text(body: impl Into<String>) -> Self {
		Self::ok()
			.with_body(body.into())
			.with_content_type("text/plain; charset=utf-8")
	}

	/// JSON response with `application/json` content type
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_http::Response;
	/// use serde_json::json;
	///
	/// let response = Response::json(&json!({"name": "Canna"})).unwrap();
	/// assert_eq!(response.content_type(), Some("application/json"));
	/// assert_eq!(response.body, r#"{"name":"Canna"}"#);
	/// ```
	pub fn json<T: Serialize>(data: &T) -> Result<Self> {
		Self::ok().with_json(data)
	}

	/// Set the response body to JSON and add the matching content type
	pub fn with_json<T: Serialize>(mut self, data: &T) -> Result<Self> {
		let body = serde_json::to_vec(data).map_err(|e| Error::Internal(e.to_string()))?;
		self.body = Bytes::from(body);
		Ok(self.with_content_type("application/json"))
	}

	fn with_content_type(mut self, content_type: &'static str) -> Self {
		self.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
		self
	}

	pub fn content_type(&self) -> Option<&str> {
		self.headers
			.get(header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
	}

	/// Client-facing response for a failed request.
	///
	/// The body is `{"detail": ...}` using [`Error::detail`]; with `debug` enabled an
	/// `error` field carrying the error text is added. `405` responses carry an `Allow`
	/// header listing the accepted methods.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_exception::Error;
	/// use larkspur_http::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::from_error(&Error::NotFound, false);
	/// assert_eq!(response.status, StatusCode::NOT_FOUND);
	/// assert_eq!(response.body, r#"{"detail":"Not Found"}"#);
	/// ```
	pub fn from_error(error: &Error, debug: bool) -> Self {
		let mut payload = serde_json::Map::new();
		payload.insert("detail".to_string(), error.detail());
		if debug {
			payload.insert(
				"error".to_string(),
				serde_json::Value::String(error.to_string()),
			);
		}
		let payload = serde_json::Value::Object(payload);
		let mut response = Self::new(error.status_code())
			.with_body(payload.to_string())
			.with_content_type("application/json");
		if let Error::MethodNotAllowed { allowed } = error {
			response = response.with_header("allow", &allowed.join(", "));
		}
		response
	}

	/// Emit the response on the transport as a start message followed by one body chunk.
	pub async fn send(self, transmit: &dyn Transmit) -> Result<()> {
		let mut headers = self.headers;
		if !headers.contains_key(header::CONTENT_LENGTH) {
			headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
		}
		transmit
			.transmit(Message::HttpResponseStart {
				status: self.status,
				headers,
			})
			.await?;
		transmit
			.transmit(Message::HttpResponseBody {
				body: self.body,
				more_body: false,
			})
			.await
	}
}

/// Value returned by an HTTP handler, before normalization into a [`Response`].
#[derive(Debug, Clone, PartialEq)]
pub enum Returned {
	/// Structured data, serialized as JSON (through the route's response schema if any)
	Data(serde_json::Value),
	/// Plain text
	Text(String),
	/// Nothing; becomes an empty body
	Empty,
	/// A ready-made response, passed through untouched
	Response(Response),
}

impl From<serde_json::Value> for Returned {
	fn from(value: serde_json::Value) -> Self {
		Self::Data(value)
	}
}

impl From<String> for Returned {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<&str> for Returned {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<()> for Returned {
	fn from(_: ()) -> Self {
		Self::Empty
	}
}

impl From<Response> for Returned {
	fn from(value: Response) -> Self {
		Self::Response(value)
	}
}
