//! Request-time injection
//!
//! An [`Injector`] owns one visible component registry and the plans built against it.
//! Plans are cached per callable allocation; each cache entry keeps a weak reference to
//! its callable, so the allocation (and its address) cannot be reused while the entry
//! exists. Entries of dropped callables are evicted on the next insertion.

use crate::callable::{Callable, Execution};
use crate::component::Components;
use crate::context::{ContextTypes, RequestState};
use crate::parameter::Arguments;
use crate::plan::{Binding, ResolutionPlan, Source};
use crate::pool::WorkerPool;
use larkspur_exception::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Liveness of the callable a cached plan was built for
trait Owner: Send + Sync {
	fn is_alive(&self) -> bool;
}

impl<C: ?Sized + Send + Sync> Owner for Weak<C> {
	fn is_alive(&self) -> bool {
		self.strong_count() > 0
	}
}

struct CachedPlan {
	owner: Box<dyn Owner>,
	plan: Arc<ResolutionPlan>,
}

/// Resolves the arguments of callables against one visible component registry.
///
/// Plans are cached per callable; the registry and context types are read-only once
/// the injector exists.
pub struct Injector {
	components: Components,
	context_types: ContextTypes,
	pool: WorkerPool,
	plans: RwLock<HashMap<usize, CachedPlan>>,
}

impl Injector {
	pub fn new(components: Components, context_types: ContextTypes, pool: WorkerPool) -> Self {
		Self {
			components,
			context_types,
			pool,
			plans: RwLock::new(HashMap::new()),
		}
	}

	pub fn components(&self) -> &Components {
		&self.components
	}

	pub fn pool(&self) -> &WorkerPool {
		&self.pool
	}

	fn plan_key<C: ?Sized>(callable: &Arc<C>) -> usize {
		Arc::as_ptr(callable) as *const () as usize
	}

	/// Number of cached plans whose callable is still alive.
	pub fn cached_plans(&self) -> usize {
		self.plans
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.values()
			.filter(|cached| cached.owner.is_alive())
			.count()
	}

	/// Builds (or returns the cached) plan of `callable`.
	pub fn prepare<C: Callable + ?Sized>(&self, callable: &Arc<C>) -> Result<Arc<ResolutionPlan>> {
		let key = Self::plan_key(callable);
		if let Some(plan) = self
			.plans
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&key)
			.filter(|cached| cached.owner.is_alive())
		{
			return Ok(plan.plan.clone());
		}
		let plan = Arc::new(ResolutionPlan::build(
			callable.as_ref(),
			&self.components,
			&self.context_types,
		)?);
		let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
		plans.retain(|_, cached| cached.owner.is_alive());
		plans.insert(
			key,
			CachedPlan {
				owner: Box::new(Arc::downgrade(callable)),
				plan: plan.clone(),
			},
		);
		Ok(plan)
	}

	/// Resolves every argument of `callable`, running component steps that are not
	/// cached in `state` yet, and returns the callable bound to its arguments.
	///
	/// Each step's output is cached under its identity, so a component runs at most
	/// once per request however many parameters depend on it.
	pub async fn inject<C: Callable + ?Sized>(
		&self,
		callable: &Arc<C>,
		state: &mut RequestState,
	) -> Result<Bound<C>> {
		let plan = self.prepare(callable)?;
		for step in &plan.steps {
			if state.cached(&step.identity).is_some() {
				continue;
			}
			let arguments = bind(&step.bindings, state, &plan.function, Some(step.component.name()))?;
			tracing::trace!(
				component = step.component.name(),
				identity = %step.identity,
				"Resolving component"
			);
			let value = Bound {
				callable: step.component.clone(),
				arguments,
				pool: self.pool.clone(),
			}
			.invoke()
			.await?;
			state.cache(step.identity.clone(), value);
		}
		Ok(Bound {
			callable: callable.clone(),
			arguments: bind(&plan.root, state, &plan.function, None)?,
			pool: self.pool.clone(),
		})
	}
}

impl std::fmt::Debug for Injector {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Injector")
			.field("components", &self.components)
			.field("pool", &self.pool)
			.finish()
	}
}

/// Collects the arguments described by `bindings`.
///
/// An empty value falls back to the parameter default; a required parameter left empty
/// is an [`Error::ComponentNotFound`] naming it.
fn bind(
	bindings: &[Binding],
	state: &RequestState,
	function: &str,
	component: Option<&str>,
) -> Result<Arguments> {
	let mut arguments = Arguments::new();
	for binding in bindings {
		let resolved = match &binding.source {
			Source::State(key) => state.get(key).cloned(),
			Source::Constant(value) => Some(value.clone()),
			Source::Step(identity) => state.cached(identity).cloned(),
			Source::Default(value) => Some(value.clone()),
		};
		let value = match (resolved, &binding.parameter.default) {
			(Some(value), _) if !value.is_none() => value,
			(_, Some(default)) => default.clone(),
			(_, None) => {
				tracing::warn!(
					function,
					parameter = %binding.parameter.name,
					"Required parameter resolved to no value"
				);
				let mut chain = vec![function.to_string()];
				chain.extend(component.map(str::to_string));
				return Err(Error::ComponentNotFound {
					parameter: binding.parameter.name.clone(),
					component: component.map(str::to_string),
					function: Some(function.to_string()),
					chain,
				});
			}
		};
		arguments.insert(binding.parameter.name.clone(), value);
	}
	Ok(arguments)
}

/// A callable with every argument resolved.
pub struct Bound<C: ?Sized> {
	callable: Arc<C>,
	arguments: Arguments,
	pool: WorkerPool,
}

impl<C: Callable + ?Sized> Bound<C> {
	pub fn arguments(&self) -> &Arguments {
		&self.arguments
	}

	/// Runs the callable inline or on the worker pool, per its execution mode.
	pub async fn invoke(self) -> Result<C::Output> {
		match self.callable.execution() {
			Execution::Inline => self.callable.call(self.arguments).await,
			Execution::Blocking => {
				let callable = self.callable;
				let arguments = self.arguments;
				self.pool
					.run(move || callable.call_blocking(arguments))
					.await
			}
		}
	}
}
