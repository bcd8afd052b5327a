//! In-memory transport

use async_trait::async_trait;
use larkspur_exception::Result;
use larkspur_http::{Message, Receive, Transmit};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// What [`MemoryTransport::receive`] yields once the scripted messages run out
#[derive(Debug, Clone, PartialEq)]
pub enum Exhausted {
	/// Repeat this message forever
	Repeat(Message),
	/// Never resolve, like a peer that stays silent
	Hang,
}

/// Transport whose inbound messages are scripted and whose outbound messages are
/// recorded.
///
/// # Examples
///
/// ```
/// use larkspur_http::{Message, Receive, Transmit};
/// use larkspur_test::{Exhausted, MemoryTransport};
///
/// # tokio_test::block_on(async {
/// let transport = MemoryTransport::new(Exhausted::Repeat(Message::HttpDisconnect));
/// transport.push(Message::WebSocketConnect);
///
/// assert_eq!(transport.receive().await.unwrap(), Message::WebSocketConnect);
/// assert_eq!(transport.receive().await.unwrap(), Message::HttpDisconnect);
///
/// transport.transmit(Message::WebSocketAccept { subprotocol: None }).await.unwrap();
/// assert_eq!(transport.sent().len(), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
	inbound: Mutex<VecDeque<Message>>,
	outbound: Mutex<Vec<Message>>,
	exhausted: Exhausted,
}

impl MemoryTransport {
	pub fn new(exhausted: Exhausted) -> Self {
		Self {
			inbound: Mutex::new(VecDeque::new()),
			outbound: Mutex::new(Vec::new()),
			exhausted,
		}
	}

	/// Queue an inbound message.
	pub fn push(&self, message: Message) {
		self.inbound
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push_back(message);
	}

	/// Every message transmitted so far, in order.
	pub fn sent(&self) -> Vec<Message> {
		self.outbound
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Number of inbound messages not yet received.
	pub fn pending(&self) -> usize {
		self.inbound
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}
}

#[async_trait]
impl Receive for MemoryTransport {
	async fn receive(&self) -> Result<Message> {
		let next = self
			.inbound
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.pop_front();
		match (next, &self.exhausted) {
			(Some(message), _) => Ok(message),
			(None, Exhausted::Repeat(message)) => Ok(message.clone()),
			(None, Exhausted::Hang) => std::future::pending().await,
		}
	}
}

#[async_trait]
impl Transmit for MemoryTransport {
	async fn transmit(&self, message: Message) -> Result<()> {
		tracing::trace!(message = ?message, "Transmitting");
		self.outbound
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(message);
		Ok(())
	}
}
