//! Transport boundary: the receive/transmit pair of the host runtime
//!
//! A connection is described by a [`Scope`](crate::Scope) plus two operations: one
//! yielding the next inbound [`Message`], one emitting an outbound [`Message`].

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use larkspur_exception::Result;
use std::sync::Arc;

/// WebSocket close codes used by the dispatcher
pub mod close_code {
	/// Normal closure
	pub const NORMAL: u16 = 1000;
	/// Endpoint going away
	pub const GOING_AWAY: u16 = 1001;
	/// Data type the endpoint cannot accept
	pub const UNSUPPORTED_DATA: u16 = 1003;
	/// Connection dropped without a close frame
	pub const ABNORMAL: u16 = 1006;
	/// Unexpected condition on the server
	pub const INTERNAL_ERROR: u16 = 1011;
}

/// A WebSocket data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	Text(String),
	Binary(Bytes),
}

/// Messages exchanged with the host runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
	/// Inbound HTTP body chunk
	HttpRequest { body: Bytes, more_body: bool },
	/// Inbound: the HTTP client went away
	HttpDisconnect,
	/// Outbound HTTP response head
	HttpResponseStart { status: StatusCode, headers: HeaderMap },
	/// Outbound HTTP response body chunk
	HttpResponseBody { body: Bytes, more_body: bool },
	/// Inbound WebSocket handshake
	WebSocketConnect,
	/// Inbound WebSocket frame
	WebSocketReceive(Frame),
	/// Inbound: the WebSocket peer disconnected
	WebSocketDisconnect { code: u16 },
	/// Outbound handshake acceptance
	WebSocketAccept { subprotocol: Option<String> },
	/// Outbound WebSocket frame
	WebSocketSend(Frame),
	/// Outbound close frame
	WebSocketClose { code: u16, reason: String },
}

/// Yields the next inbound message of a connection.
#[async_trait]
pub trait Receive: Send + Sync {
	async fn receive(&self) -> Result<Message>;
}

/// Emits an outbound message on a connection.
#[async_trait]
pub trait Transmit: Send + Sync {
	async fn transmit(&self, message: Message) -> Result<()>;
}

/// Shared receive half
pub type Receiver = Arc<dyn Receive>;

/// Shared transmit half
pub type Transmitter = Arc<dyn Transmit>;
