//! # Larkspur Exception
//!
//! Error taxonomy shared by every larkspur crate.
//!
//! Errors fall into four families:
//!
//! - **Configuration**: detected while registering routes or building resolution plans
//!   ([`Error::Configuration`], [`Error::CircularDependency`], [`Error::ComponentNotFound`]).
//! - **Resolution**: a parameter could not be satisfied while serving a request.
//! - **Validation**: payload data failed the checks of a schema ([`Error::Validation`]).
//! - **Transport**: the peer went away ([`Error::ClientDisconnected`]).
//!
//! Every variant maps to a transport-level status through [`Error::status_code`].

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	/// Dotted location of the offending field (`"__root__"` when unknown)
	pub field: String,
	/// Human readable message
	pub message: String,
}

impl FieldError {
	/// Creates a new field error.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_exception::FieldError;
	///
	/// let err = FieldError::new("name", "missing field");
	/// assert_eq!(err.field, "name");
	/// ```
	pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			message: message.into(),
		}
	}
}

impl fmt::Display for FieldError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.field, self.message)
	}
}

/// Errors raised by routing, injection and dispatch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	/// No component nor request-state entry can satisfy a parameter
	#[error("{}", component_not_found_message(.parameter, .component.as_deref(), .function.as_deref()))]
	ComponentNotFound {
		/// Name of the unsatisfiable parameter
		parameter: String,
		/// Component whose own input could not be satisfied, if nested
		component: Option<String>,
		/// Callable at the root of the resolution
		function: Option<String>,
		/// Callables and components walked from the root down to the failure
		chain: Vec<String>,
	},

	/// Invalid configuration detected at registration or plan-build time
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// A component requires its own output, directly or transitively
	#[error("Circular dependency detected: {path}")]
	CircularDependency {
		/// Cycle path (format: A -> B -> A)
		path: String,
	},

	/// Payload failed schema validation
	#[error("Validation error: {}", join_field_errors(.detail))]
	Validation {
		/// Field-level details
		detail: Vec<FieldError>,
	},

	/// A handler result could not be serialized through its declared schema
	#[error("Serialization error: {}", join_field_errors(.detail))]
	Serialization {
		/// Field-level details
		detail: Vec<FieldError>,
	},

	/// Explicit HTTP failure raised by a component or handler
	#[error("HTTP {status}: {detail}")]
	Http {
		/// Response status
		status: StatusCode,
		/// Response detail
		detail: String,
	},

	/// No route matched the request path
	#[error("Not Found")]
	NotFound,

	/// A route matched the path but not the method
	#[error("Method Not Allowed")]
	MethodNotAllowed {
		/// Methods the matched route accepts
		allowed: Vec<String>,
	},

	/// Reverse URL lookup failed
	#[error("No route found for name: {0}")]
	NoReverseMatch(String),

	/// Application-level WebSocket failure carrying an explicit close code
	#[error("WebSocket error {code}: {reason}")]
	WebSocket {
		/// Close code to report to the peer
		code: u16,
		/// Close reason
		reason: String,
	},

	/// The peer disconnected while the request was being served
	#[error("Client disconnected (code {code})")]
	ClientDisconnected {
		/// Close code reported by the transport
		code: u16,
	},

	/// Unexpected failure inside handler or component code
	#[error("Internal error: {0}")]
	Internal(String),
}

fn component_not_found_message(
	parameter: &str,
	component: Option<&str>,
	function: Option<&str>,
) -> String {
	let mut msg = format!("No component able to handle parameter \"{}\"", parameter);
	if let Some(component) = component {
		msg.push_str(&format!(" in component \"{}\"", component));
	}
	if let Some(function) = function {
		msg.push_str(&format!(" for function \"{}\"", function));
	}
	msg
}

fn join_field_errors(detail: &[FieldError]) -> String {
	detail
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

impl Error {
	/// Shorthand for an [`Error::Http`] with the canonical reason as detail.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_exception::Error;
	/// use http::StatusCode;
	///
	/// let err = Error::http(StatusCode::UNSUPPORTED_MEDIA_TYPE);
	/// assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
	/// assert_eq!(err.to_string(), "HTTP 415 Unsupported Media Type: Unsupported Media Type");
	/// ```
	pub fn http(status: StatusCode) -> Self {
		Self::Http {
			status,
			detail: status.canonical_reason().unwrap_or("").to_string(),
		}
	}

	/// Shorthand for an [`Error::Http`] with a custom detail.
	pub fn http_with_detail(status: StatusCode, detail: impl Into<String>) -> Self {
		Self::Http {
			status,
			detail: detail.into(),
		}
	}

	/// Shorthand for an [`Error::ComponentNotFound`] on a root callable parameter.
	pub fn component_not_found(parameter: impl Into<String>) -> Self {
		Self::ComponentNotFound {
			parameter: parameter.into(),
			component: None,
			function: None,
			chain: Vec::new(),
		}
	}

	/// Shorthand for a single-field [`Error::Validation`].
	pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Validation {
			detail: vec![FieldError::new(field, message)],
		}
	}

	/// Returns true for errors detected while configuring the application.
	///
	/// These fail fast: they prevent the affected route from being served.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			Self::Configuration(_) | Self::CircularDependency { .. } | Self::ComponentNotFound { .. }
		)
	}

	/// Transport-level status this error maps to.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_exception::Error;
	/// use http::StatusCode;
	///
	/// assert_eq!(Error::NotFound.status_code(), StatusCode::NOT_FOUND);
	/// assert_eq!(Error::validation("id", "bad").status_code(), StatusCode::BAD_REQUEST);
	/// assert_eq!(Error::Configuration("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::Validation { .. } => StatusCode::BAD_REQUEST,
			Self::Http { status, .. } => *status,
			Self::NotFound | Self::NoReverseMatch(_) => StatusCode::NOT_FOUND,
			Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
			Self::ComponentNotFound { .. }
			| Self::Configuration(_)
			| Self::CircularDependency { .. }
			| Self::Serialization { .. }
			| Self::WebSocket { .. }
			| Self::ClientDisconnected { .. }
			| Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Machine-readable detail payload for client-facing failure responses.
	pub fn detail(&self) -> serde_json::Value {
		match self {
			Self::Validation { detail } | Self::Serialization { detail } => {
				serde_json::to_value(detail).unwrap_or(serde_json::Value::Null)
			}
			Self::Http { detail, .. } => serde_json::Value::String(detail.clone()),
			other => serde_json::Value::String(
				other
					.status_code()
					.canonical_reason()
					.unwrap_or("Error")
					.to_string(),
			),
		}
	}
}

/// Result alias used across the larkspur crates.
pub type Result<T> = std::result::Result<T, Error>;
