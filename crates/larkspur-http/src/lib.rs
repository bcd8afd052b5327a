//! # Larkspur HTTP
//!
//! Transport boundary and protocol types.
//!
//! The host server runtime hands each connection over as a [`Scope`] together with a
//! [`Receive`] half and a [`Transmit`] half. Everything larkspur needs to serve the
//! connection is built on top of these three values:
//!
//! - [`Request`]: lazily reads and caches the body of an HTTP request
//! - [`Response`] and [`Returned`]: what handlers produce
//! - [`WebSocket`]: connection state plus frame send/receive
//! - [`Schema`]: payload validation and result serialization
//! - [`PathParams`] and [`QueryParams`]: decoded parameters

pub mod params;
pub mod request;
pub mod response;
pub mod schema;
pub mod scope;
pub mod transport;
pub mod websocket;

pub use params::{PathParams, PathValue, QueryParams};
pub use request::Request;
pub use response::{Response, Returned};
pub use schema::{Schema, SerdeSchema};
pub use scope::{Scope, ScopeKind};
pub use transport::{Frame, Message, Receive, Receiver, Transmit, Transmitter, close_code};
pub use websocket::{Code, ConnectionState, Data, Encoding, WebSocket, decode_frame};

pub use http::{HeaderMap, Method, StatusCode};
