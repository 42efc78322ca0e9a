use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use super::config::ConfigAdapter;
use crate::{
    core::{Adapter, AdapterRegistry, CoreError, CoreResult},
    storage::{CookieStorage, SessionStorage, StorageTransport},
};

pub const IMPLEMENTATION: &str = "StorageAdapter";

pub fn create_storage_adapter(
    params: &JsonValue,
    registry: &AdapterRegistry,
) -> CoreResult<Arc<dyn Adapter>> {
    let params = StorageParams::try_from(params.clone())?;
    let config = ConfigAdapter::from_registry(registry)?;
    let settings = StorageSettings::from_config(&config)?;
    let name = params.name.unwrap_or_default();

    Ok(Arc::new(StorageAdapter::new(
        registry.storage_transport(),
        &settings,
        &name,
    )))
}

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
struct StorageParams {
    #[validate(required, length(min = 1))]
    name: Option<String>,
}

impl TryFrom<JsonValue> for StorageParams {
    type Error = CoreError;
    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        let params: StorageParams = if value.is_null() {
            Self::default()
        } else {
            serde_json::from_value(value)
                .map_err(|e| CoreError::serialization_error("Invalid StorageAdapter params", e))?
        };
        params.validate()?;
        Ok(params)
    }
}

/// Configuration keys the storage namespaces are built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub session_index: String,
    pub session_name: String,
    pub cookie_prefix: String,
}

impl StorageSettings {
    /// Read the settings from the current configuration values, reporting
    /// every missing key at once.
    pub fn from_config(config: &ConfigAdapter) -> CoreResult<Self> {
        let session_index = config.get_str("session_index");
        let session_name = config.get_str("session_name");
        let cookie_prefix = config.get_str("cookie_prefix");

        match (session_index, session_name, cookie_prefix) {
            (Some(session_index), Some(session_name), Some(cookie_prefix)) => Ok(Self {
                session_index,
                session_name,
                cookie_prefix,
            }),
            (session_index, session_name, cookie_prefix) => {
                let missing: Vec<&str> = [
                    ("session_index", session_index.is_none()),
                    ("session_name", session_name.is_none()),
                    ("cookie_prefix", cookie_prefix.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, absent)| absent.then_some(key))
                .collect();
                Err(CoreError::ConfigurationMissing(missing.join(", ")))
            }
        }
    }
}

/// A session namespace and a cookie namespace sharing one owner name
pub struct StorageAdapter {
    name: String,
    session: SessionStorage,
    cookies: CookieStorage,
}

impl StorageAdapter {
    pub fn new(transport: &StorageTransport, settings: &StorageSettings, name: &str) -> Self {
        Self {
            name: name.to_string(),
            session: SessionStorage::open(
                transport.session.clone(),
                &settings.session_index,
                &settings.session_name,
                name,
            ),
            cookies: CookieStorage::new(transport.cookies.clone(), &settings.cookie_prefix, name),
        }
    }

    /// The storage adapter registered under `adapter_name`
    pub fn from_registry(registry: &AdapterRegistry, adapter_name: &str) -> CoreResult<Arc<StorageAdapter>> {
        let adapter = registry
            .get(adapter_name)
            .ok_or_else(|| CoreError::AdapterNotFound(adapter_name.to_string()))?;
        let implementation = adapter.implementation();
        crate::core::downcast_adapter::<StorageAdapter>(adapter).ok_or_else(|| {
            CoreError::ContractViolation(format!(
                "adapter '{adapter_name}' is a {implementation}, not a {IMPLEMENTATION}"
            ))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &SessionStorage {
        &self.session
    }

    pub fn cookies(&self) -> &CookieStorage {
        &self.cookies
    }
}

impl Adapter for StorageAdapter {
    fn implementation(&self) -> &'static str {
        IMPLEMENTATION
    }
}
