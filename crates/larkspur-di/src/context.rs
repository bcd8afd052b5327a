//! Built-in context types and per-request state

use crate::component::Identity;
use crate::value::{TypeKey, Value};
use std::collections::HashMap;

/// Table mapping built-in types to the request-state key that holds them.
///
/// Parameters of these types are leaves of the resolution plan: they are read
/// straight from request state and never go through a component.
#[derive(Debug, Clone, Default)]
pub struct ContextTypes(HashMap<TypeKey, String>);

impl ContextTypes {
	pub fn new() -> Self {
		Self::default()
	}

	/// # Examples
	///
	/// ```
	/// use larkspur_di::{ContextTypes, TypeKey};
	///
	/// struct Scope;
	///
	/// let types = ContextTypes::new().with::<Scope>("scope");
	/// assert_eq!(types.get(&TypeKey::of::<Scope>()), Some("scope"));
	/// assert_eq!(types.get(&TypeKey::of::<u8>()), None);
	/// ```
	pub fn with<T: ?Sized + 'static>(mut self, key: impl Into<String>) -> Self {
		self.insert::<T>(key);
		self
	}

	pub fn insert<T: ?Sized + 'static>(&mut self, key: impl Into<String>) {
		self.0.insert(TypeKey::of::<T>(), key.into());
	}

	pub fn get(&self, type_key: &TypeKey) -> Option<&str> {
		self.0.get(type_key).map(String::as_str)
	}
}

/// Mutable state of one request: seeded values plus the resolution cache.
///
/// Owned by a single request and passed by `&mut` through resolution.
#[derive(Debug, Default)]
pub struct RequestState {
	values: HashMap<String, Value>,
	cache: HashMap<Identity, Value>,
}

impl RequestState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds a value. Replacing a seed invalidates every cached component value.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_di::{Identity, RequestState, TypeKey, Value};
	///
	/// let mut state = RequestState::new();
	/// let identity = Identity { type_key: TypeKey::of::<u8>(), parameter: None };
	/// state.cache(identity.clone(), Value::new(1_u8));
	/// assert!(state.cached(&identity).is_some());
	///
	/// state.set("websocket_message", Value::new("next"));
	/// assert!(state.cached(&identity).is_none());
	/// ```
	pub fn set(&mut self, key: impl Into<String>, value: Value) {
		self.values.insert(key.into(), value);
		self.cache.clear();
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.values.get(key)
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		let removed = self.values.remove(key);
		if removed.is_some() {
			self.cache.clear();
		}
		removed
	}

	pub fn contains(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	pub fn cached(&self, identity: &Identity) -> Option<&Value> {
		self.cache.get(identity)
	}

	pub fn cache(&mut self, identity: Identity, value: Value) {
		self.cache.insert(identity, value);
	}

	pub fn cache_len(&self) -> usize {
		self.cache.len()
	}
}
