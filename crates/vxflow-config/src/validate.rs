//! Structural and value validation for configuration layers

use indexmap::IndexMap;

use crate::codec;
use crate::error::{Error, Result};
use crate::tree::{ConfigMap, ConfigValue, get_path};

/// Check that every key in `candidate` exists in the corresponding
/// position of `template`.
///
/// Where both sides hold a mapping the check recurses; otherwise a key
/// present in the template is accepted wholesale. Offending entries are
/// collected keyed by dotted path; an empty result means the
/// candidate's structure is fully covered by the template.
pub fn check_structure(
    candidate: &ConfigMap,
    template: &ConfigMap,
) -> IndexMap<String, ConfigValue> {
    let mut invalid = IndexMap::new();
    collect_invalid(candidate, template, "", &mut invalid);
    invalid
}

fn collect_invalid(
    candidate: &ConfigMap,
    template: &ConfigMap,
    prefix: &str,
    invalid: &mut IndexMap<String, ConfigValue>,
) {
    for (key, value) in candidate {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match (template.get(key), value) {
            (Some(ConfigValue::Map(t_child)), ConfigValue::Map(c_child)) => {
                collect_invalid(c_child, t_child, &path, invalid);
            }
            (Some(_), _) => {}
            (None, _) => {
                invalid.insert(path, value.clone());
            }
        }
    }
}

/// Drop entries for the open-ended task namespace from an invalid set.
///
/// Task and metatask identifiers cannot be enumerated in the template,
/// so any entry whose final path segment starts with a `task` or
/// `metatask` underscore-delimited prefix is allowed post hoc.
pub fn allow_task_keys(
    invalid: IndexMap<String, ConfigValue>,
) -> IndexMap<String, ConfigValue> {
    invalid
        .into_iter()
        .filter(|(path, _)| {
            let leaf = path.rsplit('.').next().unwrap_or(path);
            let prefix = leaf.split('_').next().unwrap_or("");
            if prefix == "task" || prefix == "metatask" {
                tracing::info!("Found and allowing key {path}");
                false
            } else {
                true
            }
        })
        .collect()
}

/// Require each dotted path to be present and non-null in `tree`.
pub fn check_mandatory(tree: &ConfigMap, paths: &[String]) -> Result<()> {
    for path in paths {
        match get_path(tree, path) {
            Some(value) if !value.is_null() => {}
            _ => {
                return Err(Error::MissingMandatoryField { path: path.clone() });
            }
        }
    }
    Ok(())
}

/// Flatten a tree to a leaf-key indexed view.
///
/// Nested mappings are walked; only leaf entries appear in the result,
/// keyed by their bare key name (the form the valid-values reference
/// mapping uses).
pub fn flatten(tree: &ConfigMap) -> IndexMap<String, &ConfigValue> {
    let mut out = IndexMap::new();
    flatten_into(tree, &mut out);
    out
}

fn flatten_into<'a>(map: &'a ConfigMap, out: &mut IndexMap<String, &'a ConfigValue>) {
    for (key, value) in map {
        match value {
            ConfigValue::Map(child) => flatten_into(child, out),
            leaf => {
                out.insert(key.clone(), leaf);
            }
        }
    }
}

/// Check resolved values against a reference mapping of allowed values.
///
/// For each leaf key `K` the reference mapping is consulted for a
/// `valid_vals_K` list; when present, the value (or each element of a
/// list value) must be within the allowed set. Null and empty-string
/// leaves are exempt.
pub fn check_valid_values(tree: &ConfigMap, valid: &ConfigMap) -> Result<()> {
    for (key, value) in flatten(tree) {
        if value.is_null() || value.as_str().is_some_and(str::is_empty) {
            continue;
        }
        let Some(ConfigValue::List(allowed)) = valid.get(&format!("valid_vals_{key}")) else {
            continue;
        };
        match value {
            ConfigValue::List(items) => {
                for item in items {
                    ensure_allowed(&key, item, allowed)?;
                }
            }
            scalar => ensure_allowed(&key, scalar, allowed)?,
        }
    }
    Ok(())
}

fn ensure_allowed(key: &str, value: &ConfigValue, allowed: &[ConfigValue]) -> Result<()> {
    if allowed.contains(value) {
        Ok(())
    } else {
        Err(Error::InvalidEnumValue {
            key: key.to_string(),
            value: codec::encode(value, true),
            allowed: allowed.iter().map(|v| codec::encode(v, true)).collect(),
        })
    }
}
