//! # Larkspur DI
//!
//! Component-based dependency injection for handlers.
//!
//! Handlers, hooks and components are [`Callable`]s that declare their
//! [`Parameter`]s. For each callable the [`Injector`] builds a [`ResolutionPlan`]
//! once, then resolves arguments per request:
//!
//! 1. parameters whose type is a built-in context type are read from [`RequestState`]
//! 2. otherwise the first registered [`Component`] whose output matches provides the value,
//!    with its own parameters resolved the same way
//! 3. otherwise the parameter default is used, or planning fails with
//!    `ComponentNotFound`
//!
//! Component outputs are cached per request, so each component runs at most once per
//! request however many parameters depend on it.
//!
//! ## Example
//!
//! ```
//! use larkspur_di::*;
//! use std::sync::Arc;
//!
//! struct Database(&'static str);
//!
//! # tokio_test::block_on(async {
//! let components = Components::new().with(Arc::new(Provide::new(AsyncFn::new(
//!     "database",
//!     Vec::new(),
//!     |_: Arguments| async { Ok(Database("sqlite")) },
//! ))));
//! let injector = Injector::new(components, ContextTypes::new(), WorkerPool::default());
//!
//! let handler = Arc::new(AsyncFn::new(
//!     "backend",
//!     vec![Parameter::of::<Database>("db")],
//!     |args: Arguments| async move { Ok(args.get::<Database>("db")?.0) },
//! ));
//!
//! let mut state = RequestState::new();
//! let bound = injector.inject(&handler, &mut state).await.unwrap();
//! assert_eq!(bound.invoke().await.unwrap(), "sqlite");
//! # });
//! ```

pub mod callable;
pub mod component;
pub mod context;
pub mod injector;
pub mod parameter;
pub mod plan;
pub mod pool;
pub mod value;

pub use callable::{AsyncFn, BlockingFn, Callable, Execution};
pub use component::{Component, Components, Identity, Provide};
pub use context::{ContextTypes, RequestState};
pub use injector::{Bound, Injector};
pub use parameter::{Arguments, Parameter};
pub use plan::{Binding, MAX_RESOLUTION_DEPTH, ResolutionPlan, Source, Step};
pub use pool::{DEFAULT_WORKER_THREADS, WorkerPool};
pub use value::{TypeKey, Value};

pub use larkspur_exception::{Error, Result};
