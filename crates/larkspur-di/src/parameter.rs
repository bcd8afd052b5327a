//! Declared parameters and resolved arguments

use crate::value::{TypeKey, Value};
use larkspur_exception::{Error, Result};
use std::any::Any;
use std::sync::Arc;

/// A declared input of a callable: name, type identity and optional default.
#[derive(Debug, Clone)]
pub struct Parameter {
	pub name: String,
	pub type_key: TypeKey,
	pub default: Option<Value>,
}

impl Parameter {
	/// # Examples
	///
	/// ```
	/// use larkspur_di::{Parameter, TypeKey, Value};
	///
	/// let param = Parameter::of::<u32>("page").with_default(Value::new(1_u32));
	/// assert_eq!(param.name, "page");
	/// assert_eq!(param.type_key, TypeKey::of::<u32>());
	/// assert!(param.has_default());
	/// ```
	pub fn of<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			type_key: TypeKey::of::<T>(),
			default: None,
		}
	}

	pub fn with_default(mut self, default: Value) -> Self {
		self.default = Some(default);
		self
	}

	/// Marks the parameter optional: it resolves to an empty value when nothing provides it.
	pub fn optional(self) -> Self {
		self.with_default(Value::none())
	}

	pub fn has_default(&self) -> bool {
		self.default.is_some()
	}
}

/// Arguments resolved for one invocation, keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
	values: Vec<(String, Value)>,
}

impl Arguments {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<String>, value: Value) {
		self.values.push((name.into(), value));
	}

	pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
		self.insert(name, value);
		self
	}

	pub fn value(&self, name: &str) -> Option<&Value> {
		self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}

	/// Required argument of type `T`.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_di::{Arguments, Value};
	///
	/// let args = Arguments::new().with("name", Value::new(String::from("Canna")));
	/// assert_eq!(args.get::<String>("name").unwrap().as_str(), "Canna");
	/// assert!(args.get::<u32>("name").is_err());
	/// assert!(args.get::<String>("other").is_err());
	/// ```
	pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
		let value = self
			.value(name)
			.filter(|v| !v.is_none())
			.ok_or_else(|| Error::Internal(format!("Argument \"{}\" was not resolved", name)))?;
		value.downcast::<T>().ok_or_else(|| {
			Error::Internal(format!(
				"Argument \"{}\" is not a {}",
				name,
				std::any::type_name::<T>()
			))
		})
	}

	/// Optional argument: `None` when absent, empty or of another type.
	pub fn optional<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
		self.value(name).and_then(Value::downcast::<T>)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.values.iter().map(|(n, _)| n.as_str())
	}
}
