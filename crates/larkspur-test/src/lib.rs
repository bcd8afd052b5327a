//! # Larkspur Test
//!
//! Testing utilities for larkspur applications.
//!
//! - [`MemoryTransport`]: scripted inbound messages, recorded outbound messages
//! - [`TestClient`]: HTTP requests against an [`Application`](larkspur_dispatch::Application)
//! - [`WebSocketScript`]: scripted WebSocket sessions

pub mod client;
pub mod response;
pub mod transport;
pub mod websocket;

pub use client::{ClientError, RequestBuilder, TestClient};
pub use response::TestResponse;
pub use transport::{Exhausted, MemoryTransport};
pub use websocket::WebSocketScript;
