//! Adapter registry
//!
//! One registry exists per request. It maps adapter names to constructed
//! instances; lookups never construct anything, so every construction and
//! every failure happens at an explicit `register` call.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use serde_json::Value as JsonValue;

use super::{
    catalog::{AdapterFactory, Catalog, Implementation},
    traits::{downcast_adapter, Adapter},
    CoreError, CoreResult,
};
use crate::{config::AdapterSpec, storage::StorageTransport};

struct AdapterEntry {
    implementation: String,
    instance: Arc<dyn Adapter>,
}

/// Named adapter instances for one request
pub struct AdapterRegistry {
    catalog: Arc<Catalog>,
    transport: StorageTransport,
    adapters: HashMap<String, AdapterEntry>,
}

impl AdapterRegistry {
    /// Create an empty registry resolving implementations from `catalog`
    pub fn new(catalog: Arc<Catalog>, transport: StorageTransport) -> Self {
        Self {
            catalog,
            transport,
            adapters: HashMap::new(),
        }
    }

    /// Construct `implementation` with `params` and store it under `name`.
    ///
    /// A duplicate name fails before anything is resolved, leaving the
    /// existing entry untouched.
    pub fn register(
        &mut self,
        name: &str,
        implementation: &str,
        params: &JsonValue,
    ) -> CoreResult<Arc<dyn Adapter>> {
        if self.adapters.contains_key(name) {
            return Err(CoreError::DuplicateName(name.to_string()));
        }

        let factory = self.adapter_factory(implementation)?;
        let instance = factory(params, self)?;
        info!("Registered adapter '{name}' ({implementation})");

        self.adapters.insert(
            name.to_string(),
            AdapterEntry {
                implementation: implementation.to_string(),
                instance: instance.clone(),
            },
        );
        Ok(instance)
    }

    /// Register a batch in order, stopping at the first failure.
    ///
    /// Adapters registered before the failing entry stay registered.
    pub fn register_all(&mut self, specs: &[AdapterSpec]) -> CoreResult<()> {
        for spec in specs {
            self.register(&spec.name, &spec.implementation, &spec.params)?;
        }
        Ok(())
    }

    /// Store an already constructed adapter under `name`
    pub fn register_instance(&mut self, name: &str, instance: Arc<dyn Adapter>) -> CoreResult<()> {
        if self.adapters.contains_key(name) {
            return Err(CoreError::DuplicateName(name.to_string()));
        }
        let implementation = instance.implementation();
        info!("Registered adapter instance '{name}' ({implementation})");
        self.adapters.insert(
            name.to_string(),
            AdapterEntry {
                implementation: implementation.to_string(),
                instance,
            },
        );
        Ok(())
    }

    /// Look up a registered adapter
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).map(|entry| entry.instance.clone())
    }

    /// Look up a registered adapter as its concrete type
    pub fn get_as<T: Adapter>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(downcast_adapter::<T>)
    }

    /// Build a new, unregistered instance of the implementation registered
    /// under `name`. `Ok(None)` when `name` was never registered.
    pub fn create_transient(
        &self,
        name: &str,
        params: &JsonValue,
    ) -> CoreResult<Option<Arc<dyn Adapter>>> {
        let Some(entry) = self.adapters.get(name) else {
            debug!("No adapter '{name}' to create a transient instance from");
            return Ok(None);
        };
        let factory = self.adapter_factory(&entry.implementation)?;
        debug!("Creating transient '{}' instance for '{name}'", entry.implementation);
        factory(params, self).map(Some)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Names of every registered adapter
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Session and cookie transport of the current request
    pub fn storage_transport(&self) -> &StorageTransport {
        &self.transport
    }

    fn adapter_factory(&self, implementation: &str) -> CoreResult<AdapterFactory> {
        match self.catalog.resolve(implementation) {
            Some(Implementation::Adapter(factory)) => Ok(factory),
            Some(other) => Err(CoreError::ContractViolation(format!(
                "'{implementation}' is a {}, not an adapter",
                other.kind()
            ))),
            None => Err(CoreError::AdapterNotFound(implementation.to_string())),
        }
    }
}
