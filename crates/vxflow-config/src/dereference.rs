//! Fixed-point expansion of configuration references
//!
//! String values may embed `{{ name }}` placeholders naming another key
//! in the same tree. Expansion substitutes referenced values and
//! repeats until a full pass changes nothing. A placeholder that spans
//! the whole string substitutes the referenced value natively, so a
//! reference to an integer stays an integer; a placeholder inside
//! surrounding text interpolates through the codec's string encoding.
//!
//! A placeholder naming an unknown key aborts immediately. When passes
//! stop making progress while placeholders remain, the residual
//! references are modeled as a directed graph and the cycle is named in
//! the error instead of silently truncating.

use std::sync::LazyLock;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use regex::{Captures, Regex};

use crate::codec;
use crate::error::{Error, Result};
use crate::tree::{ConfigMap, ConfigValue, get_path};

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").unwrap());

/// Substitution passes before the residue is treated as cyclic.
const MAX_PASSES: usize = 10;

/// Resolve every reference in `tree` to a fixed point, in place.
///
/// Running this on an already-resolved tree is the identity.
pub fn dereference(tree: &mut ConfigMap) -> Result<()> {
    // catch value-level cycles up front so the error names every
    // participant rather than whatever state the iteration got stuck in
    let mut edges = Vec::new();
    collect_refs(tree, &mut edges);
    if let Some(err) = find_cycle(&edges) {
        return Err(err);
    }

    for _ in 0..MAX_PASSES {
        let snapshot = tree.clone();
        let mut changed = false;
        expand_map(tree, &snapshot, "", "", &mut changed)?;
        if !changed {
            break;
        }
    }

    let mut edges = Vec::new();
    collect_refs(tree, &mut edges);
    if edges.is_empty() {
        Ok(())
    } else {
        Err(residue_error(edges))
    }
}

fn expand_map(
    map: &mut ConfigMap,
    root: &ConfigMap,
    section: &str,
    prefix: &str,
    changed: &mut bool,
) -> Result<()> {
    for (key, value) in map.iter_mut() {
        let path = join_path(prefix, key);
        // bare references resolve against the top-level ancestor section
        let section = if prefix.is_empty() { key.as_str() } else { section };
        expand_value(value, root, section, &path, changed)?;
    }
    Ok(())
}

fn expand_value(
    value: &mut ConfigValue,
    root: &ConfigMap,
    section: &str,
    path: &str,
    changed: &mut bool,
) -> Result<()> {
    match value {
        ConfigValue::Map(child) => expand_map(child, root, section, path, changed),
        ConfigValue::List(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                expand_value(item, root, section, &format!("{path}[{i}]"), changed)?;
            }
            Ok(())
        }
        ConfigValue::Str(s) => {
            if let Some(new_value) = expand_str(s, root, section, path)? {
                if new_value != *value {
                    *value = new_value;
                    *changed = true;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Expand one string value. `None` means it holds no references.
fn expand_str(
    s: &str,
    root: &ConfigMap,
    section: &str,
    path: &str,
) -> Result<Option<ConfigValue>> {
    let trimmed = s.trim();
    if let Some(caps) = REFERENCE.captures(trimmed) {
        let whole = caps
            .get(0)
            .is_some_and(|m| m.start() == 0 && m.end() == trimmed.len());
        if whole {
            let name = &caps[1];
            let value = resolve(root, section, name).ok_or_else(|| Error::UnresolvedReference {
                path: path.to_string(),
                name: name.to_string(),
            })?;
            return Ok(Some(value.clone()));
        }
    } else {
        return Ok(None);
    }

    // references embedded in surrounding text interpolate as strings
    let mut missing: Option<String> = None;
    let interpolated = REFERENCE.replace_all(s, |caps: &Captures<'_>| {
        let name = &caps[1];
        match resolve(root, section, name) {
            Some(value) => codec::encode(value, true),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                caps[0].to_string()
            }
        }
    });
    if let Some(name) = missing {
        return Err(Error::UnresolvedReference {
            path: path.to_string(),
            name,
        });
    }
    Ok(Some(ConfigValue::Str(interpolated.into_owned())))
}

/// Look up a referenced name.
///
/// A dotted name resolves from the tree root. A bare name is tried in
/// the enclosing section first, then as a top-level key.
fn resolve<'a>(root: &'a ConfigMap, section: &str, name: &str) -> Option<&'a ConfigValue> {
    if name.contains('.') {
        return get_path(root, name);
    }
    if !section.is_empty() {
        if let Some(value) = get_path(root, &format!("{section}.{name}")) {
            return Some(value);
        }
    }
    root.get(name)
}

/// Canonical dotted path a reference points at, if it resolves at all.
fn canonical(root: &ConfigMap, section: &str, name: &str) -> Option<String> {
    if name.contains('.') {
        return get_path(root, name).map(|_| name.to_string());
    }
    if !section.is_empty() {
        let qualified = format!("{section}.{name}");
        if get_path(root, &qualified).is_some() {
            return Some(qualified);
        }
    }
    root.contains_key(name).then(|| name.to_string())
}

/// Find a cycle in the reference graph, if one exists.
fn find_cycle(edges: &[(String, String)]) -> Option<Error> {
    for (from, to) in edges {
        if from == to {
            return Some(Error::ReferenceCycle {
                keys: vec![from.clone()],
            });
        }
    }

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (from, to) in edges {
        graph.add_edge(from.as_str(), to.as_str(), ());
    }
    tarjan_scc(&graph)
        .into_iter()
        .find(|component| component.len() > 1)
        .map(|component| Error::ReferenceCycle {
            keys: component.iter().map(|k| k.to_string()).collect(),
        })
}

/// Name the cycle (or the stuck key) once passes stop converging.
fn residue_error(edges: Vec<(String, String)>) -> Error {
    if let Some(err) = find_cycle(&edges) {
        return err;
    }
    // no cycle: report the first stuck reference instead
    match edges.into_iter().next() {
        Some((from, to)) => Error::UnresolvedReference {
            path: from,
            name: to,
        },
        None => Error::ReferenceCycle { keys: Vec::new() },
    }
}

/// Collect (key path, canonical referenced path) pairs for every
/// reference still present in the tree.
fn collect_refs(root: &ConfigMap, edges: &mut Vec<(String, String)>) {
    for (key, value) in root {
        collect_refs_value(value, key, key, root, edges);
    }
}

fn collect_refs_value(
    value: &ConfigValue,
    section: &str,
    path: &str,
    root: &ConfigMap,
    edges: &mut Vec<(String, String)>,
) {
    match value {
        ConfigValue::Map(child) => {
            for (key, val) in child {
                collect_refs_value(val, section, &join_path(path, key), root, edges);
            }
        }
        ConfigValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_refs_value(item, section, &format!("{path}[{i}]"), root, edges);
            }
        }
        ConfigValue::Str(s) => {
            for caps in REFERENCE.captures_iter(s) {
                let name = &caps[1];
                let target =
                    canonical(root, section, name).unwrap_or_else(|| name.to_string());
                edges.push((path.to_string(), target));
            }
        }
        _ => {}
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
