//! Configuration layer sources and YAML loading
//!
//! A layer is one named configuration source loaded from a YAML file.
//! Layers are immutable after load; the resolver combines them into a
//! single tree in ascending precedence order.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::tree::{ConfigMap, ConfigValue};

/// Which source a layer was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Built-in defaults, the reference template for user input.
    Defaults,
    /// Workflow-block fragments (the default task set).
    WorkflowBlock,
    /// Machine profile selected by the user configuration.
    Machine,
    /// User overrides, highest precedence.
    User,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Defaults => write!(f, "defaults"),
            LayerKind::WorkflowBlock => write!(f, "workflow"),
            LayerKind::Machine => write!(f, "machine"),
            LayerKind::User => write!(f, "user"),
        }
    }
}

/// One loaded configuration layer.
#[derive(Debug, Clone)]
pub struct Layer {
    pub kind: LayerKind,
    pub path: PathBuf,
    pub tree: ConfigMap,
}

impl Layer {
    /// Load a layer from a YAML file.
    ///
    /// A missing file is a hard error carrying the path, so the operator
    /// sees which source to fix.
    pub fn load(kind: LayerKind, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingSource {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(?path, %kind, "Loading configuration layer");
        let content = fs::read_to_string(path)?;
        let tree = parse_yaml_map(&content, path)?;
        Ok(Self {
            kind,
            path: path.to_path_buf(),
            tree,
        })
    }
}

/// Parse YAML text into a configuration mapping.
///
/// Anchors, aliases, and `<<` merge keys are resolved here, before the
/// tree reaches the engine. An empty document yields an empty mapping.
pub fn parse_yaml_map(content: &str, path: &Path) -> Result<ConfigMap> {
    let mut value: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| Error::InvalidLayer {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    value.apply_merge().map_err(|e| Error::InvalidLayer {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match ConfigValue::from_yaml(&value) {
        ConfigValue::Map(map) => Ok(map),
        ConfigValue::Null => Ok(ConfigMap::new()),
        _ => Err(Error::InvalidLayer {
            path: path.to_path_buf(),
            message: "top level must be a mapping".to_string(),
        }),
    }
}

/// Path of the machine profile for a machine name.
pub fn machine_profile_path(machine_dir: &Path, machine: &str) -> PathBuf {
    machine_dir.join(format!("{}.yaml", machine.to_lowercase()))
}
