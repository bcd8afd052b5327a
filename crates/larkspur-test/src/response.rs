//! Response collected from the transport

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use larkspur_http::Message;
use serde::de::DeserializeOwned;

use crate::client::ClientError;

/// An HTTP response reassembled from transmitted messages
#[derive(Debug, Clone)]
pub struct TestResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Bytes,
}

impl TestResponse {
	/// Reassembles the response from a start message and its body chunks.
	pub fn from_messages(messages: &[Message]) -> Result<Self, ClientError> {
		let mut start = None;
		let mut body = BytesMut::new();
		for message in messages {
			match message {
				Message::HttpResponseStart { status, headers } => {
					start = Some((*status, headers.clone()));
				}
				Message::HttpResponseBody { body: chunk, .. } => body.extend_from_slice(chunk),
				_ => {}
			}
		}
		let (status, headers) = start.ok_or(ClientError::NoResponse)?;
		Ok(Self {
			status,
			headers,
			body: body.freeze(),
		})
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	pub fn body(&self) -> &Bytes {
		&self.body
	}

	/// Body as text (lossy UTF-8)
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
		Ok(serde_json::from_slice(&self.body)?)
	}
}
