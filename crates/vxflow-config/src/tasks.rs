//! Jobname derivation over the task tree
//!
//! The execution-graph section holds `task_*` entries (leaf settings
//! mappings) and `metatask_*` entries (nested task trees of arbitrary
//! depth). Each task gets a canonical `jobname`: an explicit
//! `attrs.name` override when one is set, else the key's remainder
//! after the first underscore.

use crate::tree::{ConfigMap, ConfigValue};

/// Walk a task tree in place, setting `jobname` on every task entry.
///
/// Only `metatask_*` mappings are recursed into; non-mapping values end
/// the walk without effect.
pub fn expand(tasks: &mut ConfigMap) {
    for (key, value) in tasks.iter_mut() {
        let Some(settings) = value.as_map_mut() else {
            continue;
        };
        match key.split_once('_') {
            Some(("task", name)) => {
                let jobname = attrs_name(settings).unwrap_or_else(|| name.to_string());
                settings.insert("jobname".to_string(), ConfigValue::Str(jobname));
            }
            Some(("metatask", _)) => expand(settings),
            _ => {}
        }
    }
}

fn attrs_name(settings: &ConfigMap) -> Option<String> {
    let attrs = settings.get("attrs")?.as_map()?;
    match attrs.get("name") {
        Some(ConfigValue::Str(name)) if !name.is_empty() => Some(name.clone()),
        _ => None,
    }
}
