//! Built-in components
//!
//! Every application registers these ahead of user components. Query and header
//! lookups are parameter-aware: the handler parameter's name selects the value, so a
//! single component serves `page: Query<i64>` and `limit: Query<i64>` alike.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use larkspur_di::{Arguments, Callable, Component, Components, Parameter, TypeKey, Value};
use larkspur_exception::{Error, Result};
use larkspur_http::{Encoding, Message, QueryParams, Request, Scope, decode_frame};
use larkspur_urls::Route;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

pub use larkspur_http::Data;

/// A query-string value named after the handler parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Query<T>(pub T);

/// A request header named after the handler parameter (`_` stands for `-`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header(pub String);

/// Raw request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body(pub Bytes);

/// Request body decoded from JSON or an urlencoded form
#[derive(Debug, Clone, PartialEq)]
pub struct RequestData(pub serde_json::Value);

/// Request body validated against the route's request schema
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedData(pub serde_json::Value);

fn requesting(args: &Arguments) -> Result<Arc<Parameter>> {
	args.get::<Parameter>("parameter")
}

fn absent(parameter: &Parameter) -> Result<Value> {
	if parameter.has_default() {
		Ok(Value::none())
	} else {
		Err(Error::validation(parameter.name.clone(), "This field is required."))
	}
}

/// Resolves [`Query<T>`] from the query string.
///
/// An absent value resolves to none when the parameter has a default and is a
/// validation error otherwise.
pub struct QueryParamComponent<T> {
	_marker: PhantomData<fn() -> T>,
}

impl<T> QueryParamComponent<T> {
	pub fn new() -> Self {
		Self {
			_marker: PhantomData,
		}
	}
}

impl<T> Default for QueryParamComponent<T> {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl<T> Callable for QueryParamComponent<T>
where
	T: FromStr + Send + Sync + 'static,
	T::Err: Display,
{
	type Output = Value;

	fn name(&self) -> &str {
		"QueryParamComponent"
	}

	fn parameters(&self) -> Vec<Parameter> {
		vec![
			Parameter::of::<Parameter>("parameter"),
			Parameter::of::<Scope>("scope"),
		]
	}

	async fn call(&self, args: Arguments) -> Result<Value> {
		let parameter = requesting(&args)?;
		let scope = args.get::<Scope>("scope")?;
		let params = QueryParams::parse(&scope.query_string);
		let Some(raw) = params.get(&parameter.name) else {
			return absent(&parameter);
		};
		raw.parse::<T>()
			.map(|value| Value::new(Query(value)))
			.map_err(|e| Error::validation(parameter.name.clone(), e.to_string()))
	}
}

impl<T> Component for QueryParamComponent<T>
where
	T: FromStr + Send + Sync + 'static,
	T::Err: Display,
{
	fn output(&self) -> Option<TypeKey> {
		Some(TypeKey::of::<Query<T>>())
	}
}

/// Resolves [`Header`] by parameter name. Absent headers follow the same rule as
/// absent query values.
#[derive(Debug, Default)]
pub struct HeaderComponent;

#[async_trait]
impl Callable for HeaderComponent {
	type Output = Value;

	fn name(&self) -> &str {
		"HeaderComponent"
	}

	fn parameters(&self) -> Vec<Parameter> {
		vec![
			Parameter::of::<Parameter>("parameter"),
			Parameter::of::<Scope>("scope"),
		]
	}

	async fn call(&self, args: Arguments) -> Result<Value> {
		let parameter = requesting(&args)?;
		let scope = args.get::<Scope>("scope")?;
		let name = parameter.name.replace('_', "-");
		match scope.header(&name) {
			Some(value) => Ok(Value::new(Header(value.to_string()))),
			None => absent(&parameter),
		}
	}
}

impl Component for HeaderComponent {
	fn output(&self) -> Option<TypeKey> {
		Some(TypeKey::of::<Header>())
	}
}

/// Resolves [`Body`].
#[derive(Debug, Default)]
pub struct RequestBodyComponent;

#[async_trait]
impl Callable for RequestBodyComponent {
	type Output = Value;

	fn name(&self) -> &str {
		"RequestBodyComponent"
	}

	fn parameters(&self) -> Vec<Parameter> {
		vec![Parameter::of::<Request>("request")]
	}

	async fn call(&self, args: Arguments) -> Result<Value> {
		let request = args.get::<Request>("request")?;
		Ok(Value::new(Body(request.body().await?)))
	}
}

impl Component for RequestBodyComponent {
	fn output(&self) -> Option<TypeKey> {
		Some(TypeKey::of::<Body>())
	}
}

/// Resolves [`RequestData`] from a JSON or `application/x-www-form-urlencoded` body.
///
/// An empty body decodes to `null`. Other media types are rejected with 415.
#[derive(Debug, Default)]
pub struct JsonDataComponent;

#[async_trait]
impl Callable for JsonDataComponent {
	type Output = Value;

	fn name(&self) -> &str {
		"JsonDataComponent"
	}

	fn parameters(&self) -> Vec<Parameter> {
		vec![Parameter::of::<Request>("request")]
	}

	async fn call(&self, args: Arguments) -> Result<Value> {
		let request = args.get::<Request>("request")?;
		let body = request.body().await?;
		if body.is_empty() {
			return Ok(Value::new(RequestData(serde_json::Value::Null)));
		}
		let data = match request.content_type() {
			None | Some("application/json") => request.json().await?,
			Some("application/x-www-form-urlencoded") => decode_form(&body)?,
			Some(other) => {
				tracing::debug!(content_type = other, "Unsupported request media type");
				return Err(Error::http(StatusCode::UNSUPPORTED_MEDIA_TYPE));
			}
		};
		Ok(Value::new(RequestData(data)))
	}
}

impl Component for JsonDataComponent {
	fn output(&self) -> Option<TypeKey> {
		Some(TypeKey::of::<RequestData>())
	}
}

fn decode_form(body: &[u8]) -> Result<serde_json::Value> {
	let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).map_err(|e| {
		Error::http_with_detail(StatusCode::BAD_REQUEST, format!("Invalid form body: {}", e))
	})?;
	Ok(serde_json::Value::Object(
		pairs
			.into_iter()
			.map(|(k, v)| (k, serde_json::Value::String(v)))
			.collect(),
	))
}

/// Resolves [`ValidatedData`] by running [`RequestData`] through the route's request
/// schema. Routes without a request schema pass the data through unchanged.
#[derive(Debug, Default)]
pub struct ValidatedDataComponent;

#[async_trait]
impl Callable for ValidatedDataComponent {
	type Output = Value;

	fn name(&self) -> &str {
		"ValidatedDataComponent"
	}

	fn parameters(&self) -> Vec<Parameter> {
		vec![
			Parameter::of::<RequestData>("data"),
			Parameter::of::<Route>("route"),
		]
	}

	async fn call(&self, args: Arguments) -> Result<Value> {
		let data = args.get::<RequestData>("data")?;
		let route = args.get::<Route>("route")?;
		let validated = match route.request_schema() {
			Some(schema) => schema
				.validate(&data.0)
				.map_err(|detail| Error::Validation { detail })?,
			None => data.0.clone(),
		};
		Ok(Value::new(ValidatedData(validated)))
	}
}

impl Component for ValidatedDataComponent {
	fn output(&self) -> Option<TypeKey> {
		Some(TypeKey::of::<ValidatedData>())
	}
}

/// Resolves [`Data`] by decoding the current WebSocket message with the endpoint's
/// encoding. Undecodable frames fail with close code 1003.
#[derive(Debug, Default)]
pub struct WebSocketDataComponent;

#[async_trait]
impl Callable for WebSocketDataComponent {
	type Output = Value;

	fn name(&self) -> &str {
		"WebSocketDataComponent"
	}

	fn parameters(&self) -> Vec<Parameter> {
		vec![
			Parameter::of::<Message>("message"),
			Parameter::of::<Encoding>("encoding"),
		]
	}

	async fn call(&self, args: Arguments) -> Result<Value> {
		let message = args.get::<Message>("message")?;
		let encoding = args.get::<Encoding>("encoding")?;
		match message.as_ref() {
			Message::WebSocketReceive(frame) => {
				decode_frame(*encoding, frame.clone()).map(Value::new)
			}
			other => Err(Error::WebSocket {
				code: larkspur_http::close_code::INTERNAL_ERROR,
				reason: format!("no data frame to decode, got {:?}", other),
			}),
		}
	}
}

impl Component for WebSocketDataComponent {
	fn output(&self) -> Option<TypeKey> {
		Some(TypeKey::of::<Data>())
	}
}

/// Components every application sees before its own.
pub fn builtin_components() -> Components {
	Components::new()
		.with(Arc::new(QueryParamComponent::<String>::new()))
		.with(Arc::new(QueryParamComponent::<i64>::new()))
		.with(Arc::new(QueryParamComponent::<f64>::new()))
		.with(Arc::new(QueryParamComponent::<bool>::new()))
		.with(Arc::new(HeaderComponent))
		.with(Arc::new(RequestBodyComponent))
		.with(Arc::new(JsonDataComponent))
		.with(Arc::new(ValidatedDataComponent))
		.with(Arc::new(WebSocketDataComponent))
}
