use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use validator::Validate;

use crate::core::{CoreError, CoreResult};

static TIMEZONE_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]\d{2}:\d{2}$").expect("timezone pattern is valid"));

/// Configuration as written in the YAML file.
///
/// Every key is optional at the serde level so that validation can report all
/// missing required keys at once instead of stopping at the first one.
#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct ConfigFile {
    #[validate(required, length(min = 1))]
    pub default_skin_style: Option<String>,
    #[validate(required, length(min = 1))]
    pub default_template_style: Option<String>,
    #[validate(required, regex(path = *TIMEZONE_OFFSET))]
    pub default_timezone_offset: Option<String>,
    #[validate(required)]
    pub display_errors: Option<bool>,
    #[validate(required)]
    pub log_errors: Option<bool>,
    #[validate(required, length(min = 1))]
    pub skin_cookie: Option<String>,
    #[validate(required, length(min = 1))]
    pub template_cookie: Option<String>,
    #[validate(required)]
    pub use_api: Option<bool>,
    #[validate(required)]
    pub use_web: Option<bool>,
    #[validate(required, length(min = 1))]
    pub session_index: Option<String>,
    #[validate(required, length(min = 1))]
    pub session_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub cookie_prefix: Option<String>,

    #[validate(length(min = 1))]
    pub default_page: Option<String>,
    pub api_prefix: Option<String>,
    pub template_root: Option<PathBuf>,
    #[validate(range(min = 8, max = 256))]
    pub token_length: Option<usize>,
    pub log_level: Option<String>,
    pub log_path: Option<PathBuf>,
    pub session_dir: Option<PathBuf>,
    #[validate(range(min = 1))]
    pub session_lifetime: Option<u64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub session_gc_probability: Option<f64>,
    pub adapters: Option<Vec<AdapterSpec>>,
}

/// One adapter to register at startup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdapterSpec {
    /// Name the adapter is registered under
    pub name: String,
    /// Catalog name of the implementation
    pub implementation: String,
    #[serde(default = "AdapterSpec::default_params")]
    pub params: JsonValue,
}

impl AdapterSpec {
    fn default_params() -> JsonValue {
        json!({})
    }
}

/// Validated configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub default_skin_style: String,
    pub default_template_style: String,
    pub default_timezone_offset: String,
    pub display_errors: bool,
    pub log_errors: bool,
    pub skin_cookie: String,
    pub template_cookie: String,
    pub use_api: bool,
    pub use_web: bool,
    pub session_index: String,
    pub session_name: String,
    pub cookie_prefix: String,
    pub default_page: String,
    pub api_prefix: String,
    pub template_root: PathBuf,
    pub token_length: usize,
    pub log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_dir: Option<PathBuf>,
    /// Seconds a session may stay idle before it is discarded
    pub session_lifetime: u64,
    /// Chance that a request sweeps expired sessions
    pub session_gc_probability: f64,
    pub adapters: Vec<AdapterSpec>,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> CoreResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let conf_str = fs::read_to_string(path).map_err(|e| {
            CoreError::Configuration(format!("Unable to read conf file from {}: {e}", path.display()))
        })?;
        debug!("Conf file read from {}", path.display());
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> CoreResult<Self> {
        trace!("Read conf file: {conf_str}");
        let file: ConfigFile = serde_yaml::from_str(conf_str)
            .map_err(|e| CoreError::serialization_error("Unable to parse yaml conf", e))?;

        let conf = Config::try_from(file)?;
        trace!("Loaded conf: {conf:?}");
        Ok(conf)
    }

    pub fn to_yaml(&self) -> CoreResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| CoreError::serialization_error("Unable to encode yaml conf", e))
    }

    fn default_adapters() -> Vec<AdapterSpec> {
        vec![AdapterSpec {
            name: "storage".to_string(),
            implementation: "StorageAdapter".to_string(),
            params: json!({ "name": "system" }),
        }]
    }
}

fn require<T>(value: Option<T>, key: &str) -> CoreResult<T> {
    value.ok_or_else(|| CoreError::ConfigurationMissing(key.to_string()))
}

impl TryFrom<ConfigFile> for Config {
    type Error = CoreError;

    fn try_from(file: ConfigFile) -> CoreResult<Self> {
        // use validator to check the fixed schema
        file.validate()?;

        Ok(Config {
            default_skin_style: require(file.default_skin_style, "default_skin_style")?,
            default_template_style: require(file.default_template_style, "default_template_style")?,
            default_timezone_offset: require(file.default_timezone_offset, "default_timezone_offset")?,
            display_errors: require(file.display_errors, "display_errors")?,
            log_errors: require(file.log_errors, "log_errors")?,
            skin_cookie: require(file.skin_cookie, "skin_cookie")?,
            template_cookie: require(file.template_cookie, "template_cookie")?,
            use_api: require(file.use_api, "use_api")?,
            use_web: require(file.use_web, "use_web")?,
            session_index: require(file.session_index, "session_index")?,
            session_name: require(file.session_name, "session_name")?,
            cookie_prefix: require(file.cookie_prefix, "cookie_prefix")?,
            default_page: file.default_page.unwrap_or_else(|| "Home".to_string()),
            api_prefix: file.api_prefix.unwrap_or_else(|| "/api".to_string()),
            template_root: file.template_root.unwrap_or_else(|| PathBuf::from("templates")),
            token_length: file.token_length.unwrap_or(32),
            log_level: file.log_level.unwrap_or_else(|| "info".to_string()),
            log_path: file.log_path,
            session_dir: file.session_dir,
            session_lifetime: file.session_lifetime.unwrap_or(1440),
            session_gc_probability: file.session_gc_probability.unwrap_or(0.01),
            adapters: file.adapters.unwrap_or_else(Config::default_adapters),
        })
    }
}
