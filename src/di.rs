//! Dependency injection: callables, components and the injector.

pub use larkspur_di::*;
