//! Precedence merge of configuration layers
//!
//! Layers are combined lowest-precedence first by repeated calls to
//! [`merge_into`], so a later call's source always wins ties. A null in
//! the source unsets an existing key in the target and is otherwise not
//! introduced; this is how a higher-precedence layer turns a default
//! setting off.

use crate::tree::{ConfigMap, ConfigValue};

/// Merge `source` into `target` in place.
///
/// For every key present in `source` the resulting value is taken from
/// `source`, except that a null source value removes the key when the
/// target has it and is skipped when it does not. When both sides hold
/// a mapping at the same key the merge recurses; on any other type
/// disagreement the source's sub-tree replaces the target's.
pub fn merge_into(target: &mut ConfigMap, source: &ConfigMap) {
    for (key, value) in source {
        match value {
            ConfigValue::Map(src_child) => {
                if let Some(ConfigValue::Map(dst_child)) = target.get_mut(key) {
                    merge_into(dst_child, src_child);
                } else {
                    target.insert(key.clone(), ConfigValue::Map(src_child.clone()));
                }
            }
            ConfigValue::Null => {
                target.shift_remove(key);
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

/// Merge a tree with a copy of itself.
///
/// An idempotent pass that drops null entries left behind by anchored
/// YAML defaults, including nulls nested in sub-mappings.
pub fn normalize(tree: &mut ConfigMap) {
    let copy = tree.clone();
    merge_into(tree, &copy);
}
