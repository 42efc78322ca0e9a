//! Core traits for pagecore components
//!
//! Adapters are the pluggable services held by the registry. Page controllers
//! and API handlers have their own contracts in `web` and `api`.

use std::{any::Any, sync::Arc};

/// Type-erasure helper so registered adapters can be handed back as their
/// concrete type.
pub trait AsAny: Any + Send + Sync {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Capability every registrable service must provide.
///
/// Construction goes through an [`AdapterFactory`](super::catalog::AdapterFactory)
/// taking the registration parameters and the registry itself; beyond that the
/// contract only asks an adapter to name its implementation.
pub trait Adapter: AsAny {
    /// Catalog name of the implementation that built this instance
    fn implementation(&self) -> &'static str;
}

/// Downcasts a registered adapter to its concrete type.
pub fn downcast_adapter<T: Adapter>(adapter: Arc<dyn Adapter>) -> Option<Arc<T>> {
    <dyn Adapter as AsAny>::as_any_arc(adapter).downcast::<T>().ok()
}
