//! Callables: anything the injector can bind arguments to and invoke

use crate::parameter::{Arguments, Parameter};
use async_trait::async_trait;
use larkspur_exception::{Error, Result};
use std::future::Future;
use std::marker::PhantomData;

/// Where a callable runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Execution {
	/// Awaited in place on the request task
	#[default]
	Inline,
	/// Off-loaded to the bounded worker pool through [`Callable::call_blocking`]
	Blocking,
}

/// A handler, hook or component resolve operation.
///
/// Callables declare their parameters up front so resolution plans can be built before
/// the first request.
#[async_trait]
pub trait Callable: Send + Sync + 'static {
	type Output: Send + 'static;

	fn name(&self) -> &str;

	fn parameters(&self) -> Vec<Parameter>;

	fn execution(&self) -> Execution {
		Execution::Inline
	}

	async fn call(&self, args: Arguments) -> Result<Self::Output>;

	/// Synchronous body used when [`Callable::execution`] is [`Execution::Blocking`].
	fn call_blocking(&self, _args: Arguments) -> Result<Self::Output> {
		Err(Error::Configuration(format!(
			"\"{}\" is declared blocking but has no blocking body",
			self.name()
		)))
	}
}

/// Callable backed by an async closure.
///
/// # Examples
///
/// ```
/// use larkspur_di::{Arguments, AsyncFn, Callable, Parameter, Value};
///
/// # tokio_test::block_on(async {
/// let greet = AsyncFn::new("greet", vec![Parameter::of::<String>("name")], |args: Arguments| async move {
///     let name = args.get::<String>("name")?;
///     Ok(format!("hello {}", name))
/// });
///
/// let args = Arguments::new().with("name", Value::new(String::from("Canna")));
/// assert_eq!(greet.call(args).await.unwrap(), "hello Canna");
/// # });
/// ```
pub struct AsyncFn<F, O> {
	name: String,
	parameters: Vec<Parameter>,
	f: F,
	_output: PhantomData<fn() -> O>,
}

impl<F, Fut, O> AsyncFn<F, O>
where
	F: Fn(Arguments) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<O>> + Send + 'static,
	O: Send + 'static,
{
	pub fn new(name: impl Into<String>, parameters: Vec<Parameter>, f: F) -> Self {
		Self {
			name: name.into(),
			parameters,
			f,
			_output: PhantomData,
		}
	}
}

#[async_trait]
impl<F, Fut, O> Callable for AsyncFn<F, O>
where
	F: Fn(Arguments) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<O>> + Send + 'static,
	O: Send + 'static,
{
	type Output = O;

	fn name(&self) -> &str {
		&self.name
	}

	fn parameters(&self) -> Vec<Parameter> {
		self.parameters.clone()
	}

	async fn call(&self, args: Arguments) -> Result<O> {
		(self.f)(args).await
	}
}

/// Callable backed by a synchronous closure, run on the worker pool.
pub struct BlockingFn<F, O> {
	name: String,
	parameters: Vec<Parameter>,
	f: F,
	_output: PhantomData<fn() -> O>,
}

impl<F, O> BlockingFn<F, O>
where
	F: Fn(Arguments) -> Result<O> + Send + Sync + 'static,
	O: Send + 'static,
{
	pub fn new(name: impl Into<String>, parameters: Vec<Parameter>, f: F) -> Self {
		Self {
			name: name.into(),
			parameters,
			f,
			_output: PhantomData,
		}
	}
}

#[async_trait]
impl<F, O> Callable for BlockingFn<F, O>
where
	F: Fn(Arguments) -> Result<O> + Send + Sync + 'static,
	O: Send + 'static,
{
	type Output = O;

	fn name(&self) -> &str {
		&self.name
	}

	fn parameters(&self) -> Vec<Parameter> {
		self.parameters.clone()
	}

	fn execution(&self) -> Execution {
		Execution::Blocking
	}

	async fn call(&self, args: Arguments) -> Result<O> {
		(self.f)(args)
	}

	fn call_blocking(&self, args: Arguments) -> Result<O> {
		(self.f)(args)
	}
}
