//! Unified error handling for pagecore
//!
//! Registry and page-loading failures surface as `CoreError` values. The API
//! layer converts its own failures into JSON envelopes instead of raising.

use std::fmt;

use validator::ValidationErrors;

/// Unified error types for the framework core
#[derive(Debug)]
pub enum CoreError {
    /// An adapter with the same name is already registered
    DuplicateName(String),

    /// No implementation is known under the requested adapter name
    AdapterNotFound(String),

    /// No controller implementation exists for the requested page
    ControllerNotFound(String),

    /// No template file matches the controller's template name and style
    TemplateNotFound(String),

    /// A resolved implementation does not provide the required capability
    ContractViolation(String),

    /// The `X-HTTP-Method` override header carried an unsupported value
    UnexpectedHeader(String),

    /// Required configuration keys are absent
    ConfigurationMissing(String),

    /// Configuration is present but malformed
    Configuration(String),

    /// (De)serialization failures
    Serialization(String),

    /// File system errors
    Io(std::io::Error),

    /// Internal errors
    Internal(String),
}

impl CoreError {
    /// Wraps a serde error together with a short description of what was being parsed.
    pub fn serialization_error(context: &str, err: impl fmt::Display) -> Self {
        CoreError::Serialization(format!("{context}: {err}"))
    }

    /// HTTP status used when the error ends up on a rendered failure page.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::ControllerNotFound(_) => 404,
            CoreError::UnexpectedHeader(_) => 405,
            _ => 500,
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::DuplicateName(name) => write!(f, "Adapter '{name}' is already registered"),
            CoreError::AdapterNotFound(name) => write!(f, "Adapter '{name}' not found"),
            CoreError::ControllerNotFound(name) => write!(f, "Controller '{name}' doesn't exist"),
            CoreError::TemplateNotFound(name) => write!(f, "Template of '{name}' not found"),
            CoreError::ContractViolation(msg) => write!(f, "Contract violation: {msg}"),
            CoreError::UnexpectedHeader(value) => write!(f, "Unexpected Header: {value}"),
            CoreError::ConfigurationMissing(keys) => {
                write!(f, "Missing required configuration: {keys}")
            }
            CoreError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            CoreError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            CoreError::Io(err) => write!(f, "I/O error: {err}"),
            CoreError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err)
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();
        for (field, field_errors) in errors.field_errors() {
            if field_errors.iter().any(|e| e.code == "required") {
                missing.push(field.to_string());
            } else {
                invalid.push(field.to_string());
            }
        }
        missing.sort();
        invalid.sort();

        if !missing.is_empty() {
            CoreError::ConfigurationMissing(missing.join(", "))
        } else {
            CoreError::Configuration(format!("invalid values for: {}", invalid.join(", ")))
        }
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> CoreResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> CoreResult<T> {
        self.map_err(|e| CoreError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macro for configuration errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::CoreError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::CoreError::Configuration(format!($fmt, $($arg)*))
    };
}
