//! Connection scopes, transport messages, requests, responses and WebSockets.

pub use larkspur_http::*;
