//! Application context, built-in components and endpoint dispatch.

pub use larkspur_dispatch::*;
