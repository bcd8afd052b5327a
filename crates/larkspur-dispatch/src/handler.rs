//! HTTP request dispatch
//!
//! ```text
//! Scope → RouteTree::resolve → seed RequestState → Injector::inject → handler
//!                                                                       ↓
//!           Transmit ← Response ← normalize ← Returned / Error
//! ```

use crate::application::{Application, keys, mounted_scope};
use crate::exception::{convert_exception_to_response, panic_error};
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderValue, Method, header};
use larkspur_di::Value;
use larkspur_exception::{Error, Result};
use larkspur_http::{
	Receiver, Request, Response, Returned, Schema, Scope, ScopeKind, Transmitter,
};
use larkspur_urls::{Resolution, Resolved, Target};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Converts a handler result into a response.
///
/// Structured data goes through the route's response schema when one is declared.
///
/// # Examples
///
/// ```
/// use larkspur_dispatch::normalize;
/// use larkspur_http::Returned;
/// use http::StatusCode;
///
/// let response = normalize(Returned::from("hello"), None).unwrap();
/// assert_eq!(response.status, StatusCode::OK);
/// assert_eq!(response.body, "hello");
///
/// let response = normalize(Returned::Empty, None).unwrap();
/// assert!(response.body.is_empty());
/// ```
pub fn normalize(returned: Returned, schema: Option<&Arc<dyn Schema>>) -> Result<Response> {
	match returned {
		Returned::Data(data) => {
			let data = match schema {
				Some(schema) => schema
					.validate(&data)
					.map_err(|detail| Error::Serialization { detail })?,
				None => data,
			};
			Response::json(&data)
		}
		Returned::Text(text) => Ok(Response::text(text)),
		Returned::Empty => Ok(Response::ok()),
		Returned::Response(response) => Ok(response),
	}
}

pub(crate) async fn handle_http(
	app: &Arc<Application>,
	scope: Scope,
	receive: Receiver,
	transmit: Transmitter,
) -> Result<()> {
	let method = scope.method.clone();
	let path = scope.path.clone();

	let outcome = match app.tree().resolve(ScopeKind::Http, &method, &path) {
		Resolution::Full(resolved) => serve(app, resolved, scope, &receive, &transmit).await,
		Resolution::Partial(resolved) => Err(method_not_allowed(&resolved)),
		Resolution::NotFound => Err(Error::NotFound),
	};

	let response = match outcome {
		Ok(response) => response,
		Err(Error::ClientDisconnected { code }) => {
			tracing::debug!(path = %path, code, "Client disconnected before the response");
			return Ok(());
		}
		Err(error) => convert_exception_to_response(&error, app.settings().debug),
	};
	tracing::debug!(method = %method, path = %path, status = %response.status, "Request served");

	let response = if method == Method::HEAD {
		strip_body(response)
	} else {
		response
	};
	response.send(transmit.as_ref()).await
}

async fn serve(
	app: &Arc<Application>,
	resolved: Resolved<Application>,
	scope: Scope,
	receive: &Receiver,
	transmit: &Transmitter,
) -> Result<Response> {
	let Target::Http(route) = &resolved.target else {
		return Err(Error::NotFound);
	};
	let handler = route
		.handler_for(&scope.method)
		.cloned()
		.ok_or_else(|| method_not_allowed(&resolved))?;

	let scope = Arc::new(mounted_scope(scope, &resolved.root_path));
	let mut state = app.seed(&scope, receive, transmit, resolved.path_params.clone());
	state.set(keys::ROUTE, Value::from_arc(route.clone()));
	state.set(
		keys::REQUEST,
		Value::new(Request::new(scope.clone(), receive.clone())),
	);

	let injector = resolved.injector().clone();
	let returned = AssertUnwindSafe(async {
		let bound = injector.inject(&handler, &mut state).await?;
		bound.invoke().await
	})
	.catch_unwind()
	.await
	.map_err(panic_error)??;

	normalize(returned, route.response_schema())
}

fn method_not_allowed(resolved: &Resolved<Application>) -> Error {
	let allowed = match &resolved.target {
		Target::Http(route) => route.methods().iter().map(ToString::to_string).collect(),
		Target::WebSocket(_) => Vec::new(),
	};
	Error::MethodNotAllowed { allowed }
}

/// `HEAD` responses keep the headers of the matching `GET`, body length included.
fn strip_body(mut response: Response) -> Response {
	response
		.headers
		.insert(header::CONTENT_LENGTH, HeaderValue::from(response.body.len()));
	response.body = Bytes::new();
	response
}
