//! Routers, path patterns and the frozen route tree.

pub use larkspur_urls::*;
