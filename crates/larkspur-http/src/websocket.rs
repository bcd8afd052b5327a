//! WebSocket connection handle
//!
//! Tracks both sides of the connection: the client side advances as inbound messages
//! arrive, the application side as the handle accepts and closes.

use crate::scope::Scope;
use crate::transport::{Frame, Message, Receive, Transmit};
use bytes::Bytes;
use larkspur_exception::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// State of one side of a WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Connecting,
	Connected,
	Disconnected,
}

/// How inbound frames are decoded before reaching `on_receive`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
	#[default]
	Bytes,
	Text,
	Json,
}

/// Decoded payload of an inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
	Bytes(Bytes),
	Text(String),
	Json(serde_json::Value),
}

/// Close code reported by the peer or chosen by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(pub u16);

#[derive(Debug)]
struct States {
	client: ConnectionState,
	application: ConnectionState,
}

/// A WebSocket connection bound to its transport.
pub struct WebSocket {
	scope: Arc<Scope>,
	receive: Arc<dyn Receive>,
	transmit: Arc<dyn Transmit>,
	states: Mutex<States>,
}

impl WebSocket {
	pub fn new(scope: Arc<Scope>, receive: Arc<dyn Receive>, transmit: Arc<dyn Transmit>) -> Self {
		Self {
			scope,
			receive,
			transmit,
			states: Mutex::new(States {
				client: ConnectionState::Connecting,
				application: ConnectionState::Connecting,
			}),
		}
	}

	pub fn scope(&self) -> &Scope {
		&self.scope
	}

	pub fn client_state(&self) -> ConnectionState {
		self.states
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.client
	}

	pub fn application_state(&self) -> ConnectionState {
		self.states
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.application
	}

	/// True while both sides are connected.
	pub fn is_connected(&self) -> bool {
		let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
		states.client == ConnectionState::Connected
			&& states.application == ConnectionState::Connected
	}

	fn set_client(&self, state: ConnectionState) {
		self.states
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.client = state;
	}

	fn set_application(&self, state: ConnectionState) {
		self.states
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.application = state;
	}

	/// Next inbound message, advancing the client state.
	pub async fn receive(&self) -> Result<Message> {
		let state = self.client_state();
		if state == ConnectionState::Disconnected {
			return Err(Error::WebSocket {
				code: crate::close_code::INTERNAL_ERROR,
				reason: "receive after disconnect".to_string(),
			});
		}
		let message = self.receive.receive().await?;
		match (&message, state) {
			(Message::WebSocketConnect, ConnectionState::Connecting) => {
				self.set_client(ConnectionState::Connected);
			}
			(Message::WebSocketDisconnect { .. }, _) => {
				self.set_client(ConnectionState::Disconnected);
			}
			(Message::WebSocketReceive(_), ConnectionState::Connected) => {}
			(other, _) => {
				return Err(Error::WebSocket {
					code: crate::close_code::INTERNAL_ERROR,
					reason: format!("unexpected message {:?} in state {:?}", other, state),
				});
			}
		}
		Ok(message)
	}

	/// Accept the handshake, consuming the connect message first if still pending.
	pub async fn accept(&self, subprotocol: Option<String>) -> Result<()> {
		if self.client_state() == ConnectionState::Connecting {
			self.receive().await?;
		}
		self.transmit
			.transmit(Message::WebSocketAccept { subprotocol })
			.await?;
		self.set_application(ConnectionState::Connected);
		Ok(())
	}

	/// Next data frame; a peer disconnect surfaces as [`Error::ClientDisconnected`].
	pub async fn receive_frame(&self) -> Result<Frame> {
		match self.receive().await? {
			Message::WebSocketReceive(frame) => Ok(frame),
			Message::WebSocketDisconnect { code } => Err(Error::ClientDisconnected { code }),
			other => Err(Error::WebSocket {
				code: crate::close_code::INTERNAL_ERROR,
				reason: format!("unexpected message {:?}", other),
			}),
		}
	}

	pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
		self.send(Frame::Text(text.into())).await
	}

	pub async fn send_bytes(&self, bytes: impl Into<Bytes>) -> Result<()> {
		self.send(Frame::Binary(bytes.into())).await
	}

	pub async fn send_json<T: Serialize>(&self, data: &T) -> Result<()> {
		let text = serde_json::to_string(data).map_err(|e| Error::Internal(e.to_string()))?;
		self.send_text(text).await
	}

	async fn send(&self, frame: Frame) -> Result<()> {
		if self.application_state() != ConnectionState::Connected {
			return Err(Error::WebSocket {
				code: crate::close_code::INTERNAL_ERROR,
				reason: "send on a connection that is not accepted".to_string(),
			});
		}
		self.transmit.transmit(Message::WebSocketSend(frame)).await
	}

	/// Send a close frame. Closing an already closed connection is a no-op.
	pub async fn close(&self, code: u16) -> Result<()> {
		{
			let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
			if states.application == ConnectionState::Disconnected {
				return Ok(());
			}
			states.application = ConnectionState::Disconnected;
		}
		tracing::debug!(code, path = %self.scope.path, "Closing WebSocket");
		self.transmit
			.transmit(Message::WebSocketClose {
				code,
				reason: String::new(),
			})
			.await
	}
}

impl std::fmt::Debug for WebSocket {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebSocket")
			.field("path", &self.scope.path)
			.field("states", &self.states)
			.finish()
	}
}

/// Decode a frame according to the endpoint's encoding.
///
/// Text frames are accepted for `bytes` (as UTF-8 bytes) and binary frames for `text`
/// when they hold valid UTF-8. Anything else is unsupported data (close code 1003).
///
/// # Examples
///
/// ```
/// use larkspur_http::{Data, Encoding, Frame, decode_frame};
///
/// let data = decode_frame(Encoding::Json, Frame::Text(r#"{"a":1}"#.into())).unwrap();
/// assert_eq!(data, Data::Json(serde_json::json!({"a": 1})));
/// assert!(decode_frame(Encoding::Json, Frame::Text("nope".into())).is_err());
/// ```
pub fn decode_frame(encoding: Encoding, frame: Frame) -> Result<Data> {
	let unsupported = |reason: String| Error::WebSocket {
		code: crate::close_code::UNSUPPORTED_DATA,
		reason,
	};
	match (encoding, frame) {
		(Encoding::Bytes, Frame::Binary(bytes)) => Ok(Data::Bytes(bytes)),
		(Encoding::Bytes, Frame::Text(text)) => Ok(Data::Bytes(Bytes::from(text))),
		(Encoding::Text, Frame::Text(text)) => Ok(Data::Text(text)),
		(Encoding::Text, Frame::Binary(bytes)) => String::from_utf8(bytes.to_vec())
			.map(Data::Text)
			.map_err(|e| unsupported(e.to_string())),
		(Encoding::Json, frame) => {
			let raw = match frame {
				Frame::Text(text) => Bytes::from(text),
				Frame::Binary(bytes) => bytes,
			};
			serde_json::from_slice(&raw)
				.map(Data::Json)
				.map_err(|e| unsupported(format!("Malformed JSON data received: {}", e)))
		}
	}
}
