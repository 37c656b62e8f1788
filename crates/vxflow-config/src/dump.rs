//! Serialization of resolved configuration
//!
//! Two output forms: an alias-free YAML dump for the workflow generator
//! and the experiment record, and a flat shell rendering for
//! shell-sourced variable-definition files.

use crate::codec;
use crate::error::Result;
use crate::tree::{ConfigMap, ConfigValue};

/// Dump a tree as YAML.
///
/// The tree carries no shared references, so the output never contains
/// anchors or aliases regardless of how the source layers were written.
pub fn to_yaml_string(tree: &ConfigMap) -> Result<String> {
    Ok(serde_yaml::to_string(
        &ConfigValue::Map(tree.clone()).to_yaml(),
    )?)
}

/// Render a tree as shell variable assignments.
///
/// Each top-level section becomes a commented block of `KEY=value`
/// lines. Scalars are single-quoted; lists use the parenthesized array
/// encoding. Nested mappings below a section are not shell-expressible
/// and are skipped.
pub fn to_shell_string(tree: &ConfigMap) -> String {
    let mut out = String::new();
    for (section, value) in tree {
        match value {
            ConfigValue::Map(settings) => {
                out.push_str(&format!("# [{section}]\n"));
                for (key, v) in settings {
                    if matches!(v, ConfigValue::Map(_)) {
                        continue;
                    }
                    out.push_str(&format!("{key}={}\n", shell_value(v)));
                }
                out.push('\n');
            }
            _ => {
                out.push_str(&format!("{section}={}\n", shell_value(value)));
            }
        }
    }
    out
}

fn shell_value(v: &ConfigValue) -> String {
    match v {
        ConfigValue::List(_) => codec::encode(v, false),
        _ => format!("'{}'", codec::encode_scalar(v).replace('\'', r"'\''")),
    }
}
