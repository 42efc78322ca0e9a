use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::Validate;

use crate::{
    config::{Config, ConfigFile},
    config_error,
    core::{Adapter, AdapterRegistry, CoreError, CoreResult},
};

pub const IMPLEMENTATION: &str = "ConfigAdapter";

/// Name the process configuration is registered under
pub const CONFIG_ADAPTER_NAME: &str = "config";

pub fn create_config_adapter(
    params: &JsonValue,
    _registry: &AdapterRegistry,
) -> CoreResult<Arc<dyn Adapter>> {
    let params = ConfigAdapterParams::try_from(params.clone())?;
    let path = params.config_file.unwrap_or_default();
    Ok(Arc::new(ConfigAdapter::load(path)?))
}

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
struct ConfigAdapterParams {
    #[validate(required, length(min = 1))]
    config_file: Option<String>,
}

impl TryFrom<JsonValue> for ConfigAdapterParams {
    type Error = CoreError;
    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        let params: ConfigAdapterParams = if value.is_null() {
            Self::default()
        } else {
            serde_json::from_value(value)
                .map_err(|e| CoreError::serialization_error("Invalid ConfigAdapter params", e))?
        };
        params.validate()?;
        Ok(params)
    }
}

/// Key/value view over the loaded configuration.
///
/// `config()` stays as loaded at startup; `get`/`set` work on a mutable copy of
/// the values which `commit` validates and writes back to the file.
pub struct ConfigAdapter {
    config: Arc<Config>,
    values: Mutex<Map<String, JsonValue>>,
    path: Option<PathBuf>,
}

impl ConfigAdapter {
    pub fn new(config: Arc<Config>) -> CoreResult<Self> {
        let values = match serde_json::to_value(config.as_ref())
            .map_err(|e| CoreError::serialization_error("Unable to encode config", e))?
        {
            JsonValue::Object(map) => map,
            _ => return Err(config_error!("configuration is not a map")),
        };
        Ok(Self {
            config,
            values: Mutex::new(values),
            path: None,
        })
    }

    /// Load the configuration file at `path`; `commit` writes back to it
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let config = Config::load_from_yaml(path)?;
        Ok(Self::new(Arc::new(config))?.with_path(path))
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The configured `config` adapter of `registry`
    pub fn from_registry(registry: &AdapterRegistry) -> CoreResult<Arc<ConfigAdapter>> {
        registry
            .get_as::<ConfigAdapter>(CONFIG_ADAPTER_NAME)
            .ok_or_else(|| CoreError::ConfigurationMissing(CONFIG_ADAPTER_NAME.to_string()))
    }

    /// Typed configuration as loaded
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.lock().get(key).cloned()
    }

    /// String value of `key`, `None` if absent or not a string
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.lock().get(key).and_then(JsonValue::as_str).map(str::to_string)
    }

    pub fn set(&self, key: &str, value: JsonValue) {
        self.lock().insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().get(key).is_some_and(|value| !value.is_null())
    }

    /// Snapshot of all current values
    pub fn values(&self) -> Map<String, JsonValue> {
        self.lock().clone()
    }

    /// Validate the current values and write them to the configuration file
    pub fn commit(&self) -> CoreResult<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| config_error!("no configuration file to commit to"))?;

        let file: ConfigFile = serde_json::from_value(JsonValue::Object(self.values()))
            .map_err(|e| CoreError::serialization_error("Invalid configuration values", e))?;
        let yaml = Config::try_from(file)?.to_yaml()?;
        fs::write(path, yaml)?;
        info!("Configuration committed to {}", path.display());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, JsonValue>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Adapter for ConfigAdapter {
    fn implementation(&self) -> &'static str {
        IMPLEMENTATION
    }
}
