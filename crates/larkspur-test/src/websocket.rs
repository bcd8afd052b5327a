//! Scripted WebSocket sessions

use crate::client::ClientError;
use crate::transport::{Exhausted, MemoryTransport};
use bytes::Bytes;
use larkspur_dispatch::Application;
use larkspur_http::{Frame, Message, Scope, close_code};
use serde::Serialize;
use std::sync::Arc;

/// A WebSocket session played against an application.
///
/// Inbound messages are queued up front. Once they run out the peer disconnects with
/// code 1006, unless [`hang`](Self::hang) was called.
pub struct WebSocketScript {
	app: Arc<Application>,
	scope: Scope,
	inbound: Vec<Message>,
	hang: bool,
}

impl WebSocketScript {
	pub fn new(app: Arc<Application>, scope: Scope) -> Self {
		Self {
			app,
			scope,
			inbound: Vec::new(),
			hang: false,
		}
	}

	pub fn connect(mut self) -> Self {
		self.inbound.push(Message::WebSocketConnect);
		self
	}

	pub fn send_text(mut self, text: impl Into<String>) -> Self {
		self.inbound
			.push(Message::WebSocketReceive(Frame::Text(text.into())));
		self
	}

	pub fn send_bytes(mut self, bytes: impl Into<Bytes>) -> Self {
		self.inbound
			.push(Message::WebSocketReceive(Frame::Binary(bytes.into())));
		self
	}

	pub fn send_json<T: Serialize>(self, data: &T) -> Result<Self, ClientError> {
		let text = serde_json::to_string(data)?;
		Ok(self.send_text(text))
	}

	pub fn disconnect(mut self, code: u16) -> Self {
		self.inbound.push(Message::WebSocketDisconnect { code });
		self
	}

	/// Keep the peer silent after the scripted messages instead of disconnecting.
	pub fn hang(mut self) -> Self {
		self.hang = true;
		self
	}

	/// Builds the transport without running the session.
	pub fn into_parts(self) -> (Arc<Application>, Scope, Arc<MemoryTransport>) {
		let exhausted = if self.hang {
			Exhausted::Hang
		} else {
			Exhausted::Repeat(Message::WebSocketDisconnect {
				code: close_code::ABNORMAL,
			})
		};
		let transport = Arc::new(MemoryTransport::new(exhausted));
		for message in self.inbound {
			transport.push(message);
		}
		(self.app, self.scope, transport)
	}

	/// Plays the session to completion and returns every message the application sent.
	pub async fn run(self) -> Result<Vec<Message>, ClientError> {
		let (app, scope, transport) = self.into_parts();
		app.handle(scope, transport.clone(), transport.clone())
			.await?;
		Ok(transport.sent())
	}
}
