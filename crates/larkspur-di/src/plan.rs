//! Resolution plans
//!
//! A plan is built once per callable from its declared parameters and the visible
//! component registry. It lists component steps in dependency order (dependencies before
//! dependents) and, for every root parameter, where its value comes from.
//!
//! ## Cycle detection
//!
//! While a component's inputs are being planned, the identity of the value it produces
//! stays on an in-progress stack. Requiring an identity that is still on the stack is a
//! cycle and fails with [`Error::CircularDependency`] carrying the path (format:
//! `A -> B -> A`). A parameter-aware component may ask for its own type under another
//! parameter name.

use crate::callable::Callable;
use crate::component::{Component, Components, Identity};
use crate::context::ContextTypes;
use crate::parameter::Parameter;
use crate::value::{TypeKey, Value};
use larkspur_exception::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum nesting of component resolution
pub const MAX_RESOLUTION_DEPTH: usize = 100;

/// Where a parameter's value comes from at request time
#[derive(Debug, Clone)]
pub enum Source {
	/// Read from request state under this key
	State(String),
	/// Fixed value known at plan time
	Constant(Value),
	/// Output of the step with this identity
	Step(Identity),
	/// Nothing provides it; use the parameter default
	Default(Value),
}

/// A parameter together with its source
#[derive(Debug, Clone)]
pub struct Binding {
	pub parameter: Parameter,
	pub source: Source,
}

/// Invocation of one component
#[derive(Clone)]
pub struct Step {
	pub identity: Identity,
	pub component: Arc<dyn Component>,
	pub bindings: Vec<Binding>,
}

impl std::fmt::Debug for Step {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Step")
			.field("identity", &self.identity)
			.field("component", &self.component.name())
			.field("bindings", &self.bindings)
			.finish()
	}
}

/// Resolution plan of one callable
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
	pub function: String,
	pub steps: Vec<Step>,
	pub root: Vec<Binding>,
}

impl ResolutionPlan {
	/// Builds the plan of `callable` against the visible registry.
	///
	/// # Errors
	///
	/// - [`Error::ComponentNotFound`] when a parameter without default cannot be provided
	/// - [`Error::CircularDependency`] when a component transitively requires its own output
	/// - [`Error::Configuration`] when a component declares no output or nesting is too deep
	pub fn build<C: Callable + ?Sized>(
		callable: &C,
		components: &Components,
		context_types: &ContextTypes,
	) -> Result<Self> {
		let mut builder = PlanBuilder {
			components,
			context_types,
			function: callable.name().to_string(),
			steps: Vec::new(),
			done: HashSet::new(),
			stack: Vec::new(),
		};
		let mut root = Vec::new();
		for parameter in callable.parameters() {
			let source = builder.resolve(&parameter, None)?;
			root.push(Binding { parameter, source });
		}
		tracing::debug!(
			function = %builder.function,
			steps = builder.steps.len(),
			"Built resolution plan"
		);
		Ok(Self {
			function: builder.function,
			steps: builder.steps,
			root,
		})
	}

	/// Names of the components invoked by this plan, in execution order.
	pub fn component_names(&self) -> Vec<&str> {
		self.steps.iter().map(|s| s.component.name()).collect()
	}
}

struct InProgress {
	identity: Identity,
	component: String,
}

struct PlanBuilder<'a> {
	components: &'a Components,
	context_types: &'a ContextTypes,
	function: String,
	steps: Vec<Step>,
	done: HashSet<Identity>,
	stack: Vec<InProgress>,
}

impl PlanBuilder<'_> {
	fn resolve(&mut self, parameter: &Parameter, requester: Option<&Parameter>) -> Result<Source> {
		if parameter.type_key == TypeKey::of::<Parameter>() {
			if let Some(requester) = requester {
				return Ok(Source::Constant(Value::new(requester.clone())));
			}
		}

		if let Some(key) = self.context_types.get(&parameter.type_key) {
			return Ok(Source::State(key.to_string()));
		}

		match self.components.find(parameter)? {
			Some(component) => self.expand(component, parameter).map(Source::Step),
			None => match &parameter.default {
				Some(default) => Ok(Source::Default(default.clone())),
				None => Err(self.not_found(parameter)),
			},
		}
	}

	fn expand(&mut self, component: Arc<dyn Component>, parameter: &Parameter) -> Result<Identity> {
		let identity = component.identity(parameter);
		if self.done.contains(&identity) {
			return Ok(identity);
		}

		if let Some(start) = self
			.stack
			.iter()
			.position(|frame| frame.identity == identity)
		{
			let mut path: Vec<&str> = self.stack[start..]
				.iter()
				.map(|frame| frame.component.as_str())
				.collect();
			path.push(component.name());
			return Err(Error::CircularDependency {
				path: path.join(" -> "),
			});
		}

		if self.stack.len() >= MAX_RESOLUTION_DEPTH {
			return Err(Error::Configuration(format!(
				"Maximum resolution depth ({}) exceeded while resolving \"{}\"",
				MAX_RESOLUTION_DEPTH, parameter.name
			)));
		}

		self.stack.push(InProgress {
			identity: identity.clone(),
			component: component.name().to_string(),
		});
		let mut bindings = Vec::new();
		for input in component.parameters() {
			let source = self.resolve(&input, Some(parameter))?;
			bindings.push(Binding {
				parameter: input,
				source,
			});
		}
		self.stack.pop();

		self.done.insert(identity.clone());
		self.steps.push(Step {
			identity: identity.clone(),
			component,
			bindings,
		});
		Ok(identity)
	}

	fn not_found(&self, parameter: &Parameter) -> Error {
		let mut chain = vec![self.function.clone()];
		chain.extend(self.stack.iter().map(|frame| frame.component.clone()));
		Error::ComponentNotFound {
			parameter: parameter.name.clone(),
			component: self.stack.last().map(|frame| frame.component.clone()),
			function: Some(self.function.clone()),
			chain,
		}
	}
}
