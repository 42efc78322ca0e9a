//! Core abstractions of pagecore
//!
//! The error taxonomy, the per-request context, the adapter contract and the
//! registry that resolves named adapters through the startup catalog.

pub mod catalog;
pub mod context;
pub mod error;
pub mod registry;
pub mod traits;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use catalog::{AdapterFactory, Catalog, ControllerFactory, HandlerFactory, Implementation};
pub use context::RequestContext;
pub use error::{CoreError, CoreResult, ErrorContext};
pub use registry::AdapterRegistry;
pub use traits::*;
