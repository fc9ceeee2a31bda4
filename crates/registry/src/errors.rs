//! Error types for the capability registry and configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by registry lookups, instantiation and operation invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown API: {name}")]
    UnknownApi { name: String },

    #[error("API already registered: {name}")]
    DuplicateRegistration { name: String },

    #[error("API '{api}' has no operation '{operation}'")]
    UnknownOperation { api: String, operation: String },

    #[error("instance bound to '{api}' is not a {expected}")]
    InstanceTypeMismatch { api: String, expected: String },

    #[error("failed to instantiate '{api}': {reason}")]
    Instantiation { api: String, reason: String },

    #[error("operation '{operation}' on '{api}' failed: {reason}")]
    OperationFailed { api: String, operation: String, reason: String },
}

impl RegistryError {
    pub fn unknown_api(name: impl Into<String>) -> Self {
        Self::UnknownApi { name: name.into() }
    }

    pub fn duplicate_registration(name: impl Into<String>) -> Self {
        Self::DuplicateRegistration { name: name.into() }
    }

    pub fn unknown_operation(api: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            api: api.into(),
            operation: operation.into(),
        }
    }

    pub fn instantiation(api: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Instantiation {
            api: api.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while mapping a configured API name onto a registered implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("API '{api}' is not present in the configuration")]
    NotConfigured { api: String },

    #[error("API '{api}' has no module/class binding in the configuration")]
    MissingBinding { api: String },

    #[error("class '{class}' is registered under module '{registered}', but the configuration names '{configured}'")]
    ModuleMismatch {
        class: String,
        registered: String,
        configured: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ResolutionError {
    pub fn not_configured(api: impl Into<String>) -> Self {
        Self::NotConfigured { api: api.into() }
    }

    pub fn missing_binding(api: impl Into<String>) -> Self {
        Self::MissingBinding { api: api.into() }
    }
}

/// Failure reading or parsing the configuration document.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("cannot read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON configuration {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed YAML configuration {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_render_names() {
        let err = RegistryError::unknown_api("Ex");
        assert_eq!(err.to_string(), "unknown API: Ex");

        let err = RegistryError::unknown_operation("Ex", "call_missing");
        assert!(matches!(err, RegistryError::UnknownOperation { .. }));
        assert!(err.to_string().contains("call_missing"));
    }

    #[test]
    fn registry_errors_pass_through_resolution_errors() {
        let err: ResolutionError = RegistryError::unknown_api("C").into();
        assert_eq!(err.to_string(), "unknown API: C");
        assert!(matches!(ResolutionError::missing_binding("Ex"), ResolutionError::MissingBinding { .. }));
    }
}
