//! Data schemas used to validate request payloads and serialize handler results

use larkspur_exception::FieldError;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::LazyLock;

static FIELD_IN_MESSAGE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"field `([^`]+)`").ok());

/// Validates a JSON value and returns its normalized form.
pub trait Schema: Send + Sync {
	/// Schema name, as exposed to documentation generators
	fn name(&self) -> &str;

	fn validate(&self, value: &serde_json::Value) -> Result<serde_json::Value, Vec<FieldError>>;
}

/// [`Schema`] backed by a serde type: a value is valid when it deserializes into `T`.
///
/// # Examples
///
/// ```
/// use larkspur_http::{Schema, SerdeSchema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Puppy {
///     name: String,
/// }
///
/// let schema = SerdeSchema::<Puppy>::new("Puppy");
/// assert!(schema.validate(&serde_json::json!({"name": "Canna"})).is_ok());
///
/// let errors = schema.validate(&serde_json::json!({})).unwrap_err();
/// assert_eq!(errors[0].field, "name");
/// ```
pub struct SerdeSchema<T> {
	name: String,
	_marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			_marker: PhantomData,
		}
	}
}

impl<T> Schema for SerdeSchema<T>
where
	T: Serialize + DeserializeOwned + 'static,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn validate(&self, value: &serde_json::Value) -> Result<serde_json::Value, Vec<FieldError>> {
		let typed: T = serde_json::from_value(value.clone()).map_err(|e| vec![field_error(&e)])?;
		serde_json::to_value(&typed).map_err(|e| vec![field_error(&e)])
	}
}

/// Maps a serde error to a field error, naming the field when serde reports one.
fn field_error(error: &serde_json::Error) -> FieldError {
	let message = error.to_string();
	let field = FIELD_IN_MESSAGE
		.as_ref()
		.and_then(|re| re.captures(&message))
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str().to_string())
		.unwrap_or_else(|| "__root__".to_string());
	FieldError::new(field, message)
}
