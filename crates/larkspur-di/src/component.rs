//! Components and the ordered component registry

use crate::callable::{Callable, Execution};
use crate::parameter::{Arguments, Parameter};
use crate::value::{TypeKey, Value};
use async_trait::async_trait;
use larkspur_exception::{Error, Result};
use std::any::Any;
use std::sync::Arc;

/// Cache identity of a resolved component value within one request.
///
/// Built from the produced type; parameter-aware components also include the
/// lowercase name of the parameter they were resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
	pub type_key: TypeKey,
	pub parameter: Option<String>,
}

impl std::fmt::Display for Identity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.parameter {
			Some(name) => write!(f, "{}:{}", self.type_key, name),
			None => write!(f, "{}", self.type_key),
		}
	}
}

/// A resolver producing a value for parameters of a given type.
///
/// Components are callables themselves: their own parameters are resolved the same
/// way as a handler's. A component that declares an input of type [`Parameter`]
/// receives the parameter it is being resolved for.
pub trait Component: Callable<Output = Value> {
	/// Declared output type. `None` requires overriding [`Component::can_handle`].
	fn output(&self) -> Option<TypeKey>;

	/// Whether this component can satisfy `parameter`.
	fn can_handle(&self, parameter: &Parameter) -> Result<bool> {
		match self.output() {
			Some(output) => Ok(output == parameter.type_key),
			None => Err(Error::Configuration(format!(
				"Component \"{}\" must declare an output type",
				self.name()
			))),
		}
	}

	fn identity(&self, parameter: &Parameter) -> Identity {
		let parameter_aware = self
			.parameters()
			.iter()
			.any(|p| p.type_key == TypeKey::of::<Parameter>());
		Identity {
			type_key: parameter.type_key,
			parameter: parameter_aware.then(|| parameter.name.to_lowercase()),
		}
	}
}

/// Adapts a callable into a component producing its output type.
///
/// # Examples
///
/// ```
/// use larkspur_di::{Arguments, AsyncFn, Component, Parameter, Provide, TypeKey};
///
/// struct Database;
///
/// let component = Provide::new(AsyncFn::new("database", Vec::new(), |_: Arguments| async {
///     Ok(Database)
/// }));
/// assert_eq!(component.output(), Some(TypeKey::of::<Database>()));
/// assert!(component.can_handle(&Parameter::of::<Database>("db")).unwrap());
/// ```
pub struct Provide<C>(C);

impl<C> Provide<C> {
	pub fn new(callable: C) -> Self {
		Self(callable)
	}
}

#[async_trait]
impl<C> Callable for Provide<C>
where
	C: Callable,
	C::Output: Any + Send + Sync,
{
	type Output = Value;

	fn name(&self) -> &str {
		self.0.name()
	}

	fn parameters(&self) -> Vec<Parameter> {
		self.0.parameters()
	}

	fn execution(&self) -> Execution {
		self.0.execution()
	}

	async fn call(&self, args: Arguments) -> Result<Value> {
		self.0.call(args).await.map(Value::new)
	}

	fn call_blocking(&self, args: Arguments) -> Result<Value> {
		self.0.call_blocking(args).map(Value::new)
	}
}

impl<C> Component for Provide<C>
where
	C: Callable,
	C::Output: Any + Send + Sync,
{
	fn output(&self) -> Option<TypeKey> {
		Some(TypeKey::of::<C::Output>())
	}
}

/// Ordered component registry. Matching is first-registered-wins.
#[derive(Clone, Default)]
pub struct Components(Vec<Arc<dyn Component>>);

impl Components {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, component: Arc<dyn Component>) {
		self.0.push(component);
	}

	pub fn with(mut self, component: Arc<dyn Component>) -> Self {
		self.push(component);
		self
	}

	pub fn contains(&self, component: &Arc<dyn Component>) -> bool {
		self.0.iter().any(|c| Arc::ptr_eq(c, component))
	}

	/// Ordered union: `self` first, then the components of `other` not already present.
	pub fn union(&self, other: &Components) -> Components {
		let mut merged = self.clone();
		for component in other.iter() {
			if !merged.contains(component) {
				merged.push(component.clone());
			}
		}
		merged
	}

	/// First registered component able to handle `parameter`.
	///
	/// # Errors
	///
	/// Propagates the configuration error of a component that declares no output.
	pub fn find(&self, parameter: &Parameter) -> Result<Option<Arc<dyn Component>>> {
		for component in &self.0 {
			if component.can_handle(parameter)? {
				tracing::trace!(
					parameter = %parameter.name,
					component = component.name(),
					"Component matched"
				);
				return Ok(Some(component.clone()));
			}
		}
		Ok(None)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Component>> {
		self.0.iter()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl std::fmt::Debug for Components {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list()
			.entries(self.0.iter().map(|c| c.name().to_string()))
			.finish()
	}
}

impl FromIterator<Arc<dyn Component>> for Components {
	fn from_iter<I: IntoIterator<Item = Arc<dyn Component>>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::callable::AsyncFn;
	use rstest::rstest;

	struct Puppy(&'static str);

	fn puppy_component(label: &'static str) -> Arc<dyn Component> {
		Arc::new(Provide::new(AsyncFn::new(
			label,
			Vec::new(),
			move |_: Arguments| async move { Ok(Puppy(label)) },
		)))
	}

	struct Untyped;

	#[async_trait]
	impl Callable for Untyped {
		type Output = Value;

		fn name(&self) -> &str {
			"Untyped"
		}

		fn parameters(&self) -> Vec<Parameter> {
			Vec::new()
		}

		async fn call(&self, _args: Arguments) -> Result<Value> {
			Ok(Value::none())
		}
	}

	impl Component for Untyped {
		fn output(&self) -> Option<TypeKey> {
			None
		}
	}

	#[rstest]
	fn test_find_first_registered_wins() {
		// Arrange
		let first = puppy_component("first");
		let second = puppy_component("second");
		let components = Components::new().with(first.clone()).with(second);

		// Act
		let found = components
			.find(&Parameter::of::<Puppy>("puppy"))
			.unwrap()
			.unwrap();

		// Assert
		assert!(Arc::ptr_eq(&found, &first));
	}

	#[rstest]
	fn test_find_without_match_is_none() {
		let components = Components::new().with(puppy_component("puppy"));

		let found = components.find(&Parameter::of::<String>("name")).unwrap();

		assert!(found.is_none());
	}

	#[rstest]
	fn test_component_without_output_is_configuration_error() {
		let components = Components::new().with(Arc::new(Untyped));

		let err = components
			.find(&Parameter::of::<Puppy>("puppy"))
			.err()
			.unwrap();

		assert!(err.is_configuration());
	}

	#[rstest]
	fn test_union_keeps_parent_order_and_dedupes() {
		// Arrange
		let shared = puppy_component("shared");
		let parent = Components::new().with(shared.clone());
		let child = Components::new()
			.with(puppy_component("child"))
			.with(shared);

		// Act
		let merged = parent.union(&child);

		// Assert
		let names: Vec<_> = merged.iter().map(|c| c.name().to_string()).collect();
		assert_eq!(names, vec!["shared", "child"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_provide_wraps_output() {
		let component = puppy_component("canna");

		let value = component.call(Arguments::new()).await.unwrap();

		assert_eq!(value.downcast::<Puppy>().unwrap().0, "canna");
	}
}
