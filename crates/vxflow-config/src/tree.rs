//! Typed configuration tree
//!
//! Layer sources arrive as YAML mappings and are converted into a tagged
//! variant tree so the merge, validation, and dereference passes get
//! compile-time exhaustiveness over node kinds instead of runtime
//! type inspection.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// Insertion-ordered mapping from key to value.
///
/// Section and task order from the YAML sources is significant for the
/// generated output files, so the plain hash map is not enough here.
pub type ConfigMap = IndexMap<String, ConfigValue>;

/// One node of a configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Str(String),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

impl ConfigValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert a loaded YAML value into a configuration tree.
    ///
    /// Anchors and aliases have already been resolved by the YAML loader;
    /// tagged values collapse to their inner value. Mapping keys are
    /// stringified, matching the identifier-keyed data model.
    pub fn from_yaml(value: &YamlValue) -> Self {
        match value {
            YamlValue::Null => ConfigValue::Null,
            YamlValue::Bool(b) => ConfigValue::Bool(*b),
            YamlValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    ConfigValue::Float(f)
                } else {
                    ConfigValue::Null
                }
            }
            YamlValue::String(s) => ConfigValue::Str(s.clone()),
            YamlValue::Sequence(items) => {
                ConfigValue::List(items.iter().map(ConfigValue::from_yaml).collect())
            }
            YamlValue::Mapping(map) => {
                let mut out = ConfigMap::new();
                for (key, val) in map {
                    if let Some(key) = yaml_key_to_string(key) {
                        out.insert(key, ConfigValue::from_yaml(val));
                    }
                }
                ConfigValue::Map(out)
            }
            YamlValue::Tagged(tagged) => ConfigValue::from_yaml(&tagged.value),
        }
    }

    /// Convert back to a YAML value for serialization.
    ///
    /// Timestamps render in their canonical `YYYYMMDDHHMM` string form so
    /// a dumped tree decodes to the same values when reloaded.
    pub fn to_yaml(&self) -> YamlValue {
        match self {
            ConfigValue::Null => YamlValue::Null,
            ConfigValue::Bool(b) => YamlValue::Bool(*b),
            ConfigValue::Int(i) => YamlValue::Number((*i).into()),
            ConfigValue::Float(f) => YamlValue::Number((*f).into()),
            ConfigValue::Timestamp(t) => {
                YamlValue::String(t.format(crate::codec::TIMESTAMP_FORMAT).to_string())
            }
            ConfigValue::Str(s) => YamlValue::String(s.clone()),
            ConfigValue::List(items) => {
                YamlValue::Sequence(items.iter().map(ConfigValue::to_yaml).collect())
            }
            ConfigValue::Map(map) => {
                let mut out = serde_yaml::Mapping::new();
                for (key, val) in map {
                    out.insert(YamlValue::String(key.clone()), val.to_yaml());
                }
                YamlValue::Mapping(out)
            }
        }
    }
}

fn yaml_key_to_string(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Look up a value by dotted path (`section.KEY`, arbitrary depth).
pub fn get_path<'a>(map: &'a ConfigMap, path: &str) -> Option<&'a ConfigValue> {
    match path.split_once('.') {
        None => map.get(path),
        Some((head, rest)) => get_path(map.get(head)?.as_map()?, rest),
    }
}

/// Mutable counterpart of [`get_path`].
pub fn get_path_mut<'a>(map: &'a mut ConfigMap, path: &str) -> Option<&'a mut ConfigValue> {
    match path.split_once('.') {
        None => map.get_mut(path),
        Some((head, rest)) => get_path_mut(map.get_mut(head)?.as_map_mut()?, rest),
    }
}

/// Set a value at a dotted path, creating intermediate mappings as needed.
///
/// Fails if an intermediate segment already holds a non-mapping value.
pub fn set_path(map: &mut ConfigMap, path: &str, value: ConfigValue) -> Result<()> {
    set_path_inner(map, path, path, value)
}

fn set_path_inner(
    map: &mut ConfigMap,
    full_path: &str,
    remainder: &str,
    value: ConfigValue,
) -> Result<()> {
    match remainder.split_once('.') {
        None => {
            map.insert(remainder.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| ConfigValue::Map(ConfigMap::new()));
            match entry {
                ConfigValue::Map(child) => set_path_inner(child, full_path, rest, value),
                _ => Err(Error::NotAMapping {
                    path: full_path.to_string(),
                }),
            }
        }
    }
}
