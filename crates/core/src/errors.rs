use thiserror::Error;

/// Error type shared by the container and the binding-completion layer.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("no binding found for {key}")]
    MissingBinding { key: String },

    #[error("duplicate binding for {key}")]
    DuplicateBinding { key: String },

    #[error("circular dependency detected: {path} (cycle at: {cycle_key})")]
    CircularDependency { path: String, cycle_key: String },

    #[error("no type metadata registered for {type_name}")]
    UnknownType { type_name: &'static str },

    #[error("type {type_name} is not instantiable")]
    NotInstantiable { type_name: &'static str },

    #[error("cannot resolve key for {key} required by {site}")]
    UnresolvableKey { key: String, site: String },

    #[error("no mock source registered for {type_name}")]
    MissingMockSource { type_name: &'static str },

    #[error("unresolved need: {key} stayed concrete but unbound after completion")]
    UnresolvedNeed { key: String },

    #[error("resolved value for {key} has an unexpected type")]
    TypeMismatch { key: String },

    #[error("invalid lifetime: {lifetime}")]
    InvalidLifetime { lifetime: String },

    #[error("lock error on resource: {resource}")]
    LockError { resource: String },
}

impl ContainerError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a missing-binding error for a key rendered with its qualifier
    pub fn missing_binding(key: impl ToString) -> Self {
        Self::MissingBinding {
            key: key.to_string(),
        }
    }

    /// Create a duplicate-binding error
    pub fn duplicate_binding(key: impl ToString) -> Self {
        Self::DuplicateBinding {
            key: key.to_string(),
        }
    }

    /// Check if the error is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::UnresolvableKey { .. } | Self::DuplicateBinding { .. }
        )
    }

    /// Check if the error reports a dependency cycle
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}
