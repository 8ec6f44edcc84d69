//! Registry and loader errors

use thiserror::Error;

/// Errors raised while building a [`CapabilityRegistry`](super::CapabilityRegistry)
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Capability {0} is registered more than once")]
    DuplicateCapability(String),

    #[error("Tag {0} is registered for more than one capability")]
    DuplicateTag(String),

    #[error("Type {type_name} appears more than once in artifact {artifact}")]
    DuplicateType { artifact: String, type_name: String },

    #[error("Type {type_name} in artifact {artifact} has no constructor matching the signature of {capability}")]
    MissingConstructor {
        artifact: String,
        type_name: String,
        capability: String,
    },

    #[error("Artifact of module {0} is unavailable (build failed)")]
    ArtifactUnavailable(String),

    #[error("Failed to load artifact {artifact}: {reason}")]
    ArtifactLoad { artifact: String, reason: String },
}

/// Errors raised by [`ExtensionLoader`](super::ExtensionLoader) queries
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Capability {0} is not registered")]
    UnknownCapability(String),

    #[error("No extension of {capability} registered under key '{key}'")]
    NotFound { capability: String, key: String },

    #[error("Arguments for {capability} have types ({found}), expected ({expected})")]
    ArgumentType {
        capability: String,
        expected: String,
        found: String,
    },

    /// Error raised by an extension's own constructor, passed through as is
    #[error(transparent)]
    Construction(#[from] anyhow::Error),
}
