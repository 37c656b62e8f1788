//! Error types for vxflow-config

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the resolution pipeline.
///
/// All of these abort the current resolution run; none are retried and
/// no partial tree is handed to downstream consumers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration source not found: {path}")]
    MissingSource { path: PathBuf },

    #[error("Could not load configuration layer {path}: {message}")]
    InvalidLayer { path: PathBuf, message: String },

    #[error(
        "Invalid key(s) specified in {path}:\n  {}\nCheck the default configuration for allowed keys",
        .entries.join("\n  ")
    )]
    StructuralViolation { path: PathBuf, entries: Vec<String> },

    #[error("Mandatory variable \"{path}\" not found in user configuration")]
    MissingMandatoryField { path: String },

    #[error("Unresolved reference \"{name}\" in value at {path}")]
    UnresolvedReference { path: String, name: String },

    #[error("Reference cycle between configuration keys: {}", .keys.join(" -> "))]
    ReferenceCycle { keys: Vec<String> },

    #[error(
        "The variable {key} = {value} has an invalid value. Possible values are: {}",
        .allowed.join(", ")
    )]
    InvalidEnumValue {
        key: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Expected a mapping at {path}")]
    NotAMapping { path: String },

    #[error("YAML serialization failed: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
