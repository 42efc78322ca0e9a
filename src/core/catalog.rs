//! Startup registration table
//!
//! Maps implementation names to factories. Adapters, page controllers and API
//! handlers share one namespace, so a name can resolve to an implementation of
//! the wrong kind; callers report that as a contract violation.

use std::{collections::HashMap, fmt, sync::Arc};

use log::{debug, warn};
use serde_json::Value as JsonValue;

use super::{registry::AdapterRegistry, traits::Adapter, CoreResult};
use crate::{
    api::{ApiRequest, Handler},
    web::{Controller, PageState},
};

/// Builds an adapter from its registration parameters
pub type AdapterFactory = fn(&JsonValue, &AdapterRegistry) -> CoreResult<Arc<dyn Adapter>>;

/// Builds a page controller around an already prepared page state
pub type ControllerFactory = fn(PageState, &AdapterRegistry) -> CoreResult<Box<dyn Controller>>;

/// Builds an API handler for one parsed request
pub type HandlerFactory = fn(ApiRequest) -> Box<dyn Handler>;

/// A registered implementation and the capability it provides
#[derive(Clone, Copy)]
pub enum Implementation {
    Adapter(AdapterFactory),
    Controller(ControllerFactory),
    Handler(HandlerFactory),
}

impl Implementation {
    /// Capability name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Implementation::Adapter(_) => "adapter",
            Implementation::Controller(_) => "controller",
            Implementation::Handler(_) => "handler",
        }
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Implementation({})", self.kind())
    }
}

/// Name to implementation table, built once at startup and shared read-only
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: HashMap<String, Implementation>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding the built-in adapters
    pub fn with_builtin_adapters() -> Self {
        let mut catalog = Self::new();
        for (name, factory) in crate::adapters::builtin_adapters() {
            catalog.insert(name, Implementation::Adapter(factory));
        }
        catalog
    }

    pub fn register_adapter(mut self, name: &str, factory: AdapterFactory) -> Self {
        self.insert(name, Implementation::Adapter(factory));
        self
    }

    pub fn register_controller(mut self, name: &str, factory: ControllerFactory) -> Self {
        self.insert(name, Implementation::Controller(factory));
        self
    }

    pub fn register_handler(mut self, name: &str, factory: HandlerFactory) -> Self {
        self.insert(name, Implementation::Handler(factory));
        self
    }

    /// Look up an implementation by name
    pub fn resolve(&self, name: &str) -> Option<Implementation> {
        let found = self.entries.get(name).copied();
        debug!(
            "Catalog lookup '{name}': {}",
            found.map_or("missing", |imp| imp.kind())
        );
        found
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: &str, implementation: Implementation) {
        if let Some(previous) = self.entries.insert(name.to_string(), implementation) {
            warn!(
                "Catalog entry '{name}' ({}) replaced by a {}",
                previous.kind(),
                implementation.kind()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_adapters_are_present() {
        let catalog = Catalog::with_builtin_adapters();
        assert!(matches!(
            catalog.resolve("ConfigAdapter"),
            Some(Implementation::Adapter(_))
        ));
        assert!(matches!(
            catalog.resolve("StorageAdapter"),
            Some(Implementation::Adapter(_))
        ));
        assert!(catalog.resolve("MissingAdapter").is_none());
    }

    #[test]
    fn test_later_registration_replaces_earlier() {
        let catalog = Catalog::new()
            .register_adapter("apiEcho", crate::adapters::storage::create_storage_adapter)
            .register_handler("apiEcho", crate::demo::create_echo_handler);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve("apiEcho").map(|imp| imp.kind()), Some("handler"));
    }
}
