//! Type-erased values and type identity keys

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type identity used to match parameters against component outputs and context types.
#[derive(Clone, Copy)]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
}

impl TypeKey {
	/// # Examples
	///
	/// ```
	/// use larkspur_di::TypeKey;
	///
	/// assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
	/// assert_ne!(TypeKey::of::<String>(), TypeKey::of::<u32>());
	/// assert_eq!(TypeKey::of::<Vec<u8>>().short_name(), "Vec<u8>");
	/// ```
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	/// Fully qualified type name
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Type name without module paths
	pub fn short_name(&self) -> String {
		let mut out = String::with_capacity(self.name.len());
		let mut segment = String::new();
		for ch in self.name.chars() {
			match ch {
				':' => segment.clear(),
				'<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
					out.push_str(&segment);
					segment.clear();
					out.push(ch);
				}
				_ => segment.push(ch),
			}
		}
		out.push_str(&segment);
		out
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({})", self.name)
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.short_name())
	}
}

/// A shared, type-erased value flowing through request state and resolution.
///
/// A value may be empty: optional components produce an empty value when they have
/// nothing to offer, and the injector then falls back to the parameter's default.
#[derive(Clone, Default)]
pub struct Value(Option<Arc<dyn Any + Send + Sync>>);

impl Value {
	/// # Examples
	///
	/// ```
	/// use larkspur_di::Value;
	///
	/// let value = Value::new(42_u32);
	/// assert_eq!(*value.downcast::<u32>().unwrap(), 42);
	/// assert!(value.downcast::<String>().is_none());
	/// ```
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self(Some(Arc::new(value)))
	}

	pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self(Some(value))
	}

	pub fn none() -> Self {
		Self(None)
	}

	pub fn is_none(&self) -> bool {
		self.0.is_none()
	}

	pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		self.0.clone().and_then(|inner| inner.downcast::<T>().ok())
	}

	/// True when both values hold the same allocation.
	pub fn ptr_eq(&self, other: &Value) -> bool {
		match (&self.0, &other.0) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0 {
			Some(_) => f.write_str("Value(..)"),
			None => f.write_str("Value(None)"),
		}
	}
}
