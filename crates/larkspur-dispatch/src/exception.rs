//! Mapping of errors onto transport-level failures

use larkspur_exception::Error;
use larkspur_http::{Response, close_code};
use std::any::Any;

/// Converts a failed request into the response sent to the client.
///
/// Client errors are logged at warn level, server errors at error level. With `debug`
/// enabled the error text is included in the body.
pub fn convert_exception_to_response(error: &Error, debug: bool) -> Response {
	let status = error.status_code();
	if status.is_server_error() {
		tracing::error!(status = %status, error = %error, "Request failed");
	} else {
		tracing::warn!(status = %status, error = %error, "Request rejected");
	}
	Response::from_error(error, debug)
}

/// Close code reported to the peer when a WebSocket session fails with `error`.
///
/// Errors carrying their own code keep it; anything else is an unexpected failure
/// (1011).
///
/// # Examples
///
/// ```
/// use larkspur_dispatch::close_code_for;
/// use larkspur_exception::Error;
///
/// assert_eq!(close_code_for(&Error::ClientDisconnected { code: 1001 }), 1001);
/// assert_eq!(close_code_for(&Error::Internal("boom".into())), 1011);
/// ```
pub fn close_code_for(error: &Error) -> u16 {
	match error {
		Error::WebSocket { code, .. } | Error::ClientDisconnected { code } => *code,
		_ => close_code::INTERNAL_ERROR,
	}
}

/// Turns a caught panic payload into an internal error.
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> Error {
	let message = payload
		.downcast_ref::<&str>()
		.map(|s| s.to_string())
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic payload".to_string());
	tracing::error!(panic = %message, "Handler panicked");
	Error::Internal(format!("handler panicked: {}", message))
}
