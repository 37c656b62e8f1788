//! Configuration resolution with hierarchical merge
//!
//! The `WorkflowResolver` loads the configuration layers, validates the
//! user layer against the defaults template, merges everything in
//! ascending precedence order, resolves references, and normalizes leaf
//! values. The run either produces a fully resolved tree or aborts with
//! a descriptive error; no partial result is handed downstream.

use std::path::{Path, PathBuf};

use crate::codec::{self, DecodeMode};
use crate::dereference;
use crate::error::{Error, Result};
use crate::layers::{self, Layer, LayerKind};
use crate::merge;
use crate::tasks;
use crate::tree::{ConfigMap, ConfigValue, get_path, get_path_mut, set_path};
use crate::validate;

/// The final resolved configuration after merging all layers.
///
/// This is the output of the resolution pipeline; it is not mutated
/// after the pipeline completes.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    tree: ConfigMap,
}

impl ResolvedConfig {
    /// The full resolved tree.
    pub fn tree(&self) -> &ConfigMap {
        &self.tree
    }

    pub fn into_tree(self) -> ConfigMap {
        self.tree
    }

    /// Look up a value by dotted path.
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        get_path(&self.tree, path)
    }

    /// String value at a dotted path, if it is a string.
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(ConfigValue::as_str)
    }

    /// The workflow-graph section consumed by the workflow generator.
    pub fn rocoto(&self) -> Option<&ConfigMap> {
        self.tree.get("rocoto").and_then(ConfigValue::as_map)
    }

    /// The expanded task sub-tree under the workflow-graph section.
    pub fn tasks(&self) -> Option<&ConfigMap> {
        get_path(&self.tree, "rocoto.tasks").and_then(ConfigValue::as_map)
    }

    /// A copy of the tree without the workflow-graph section, the shape
    /// recorded in the experiment's variable-definitions file.
    pub fn var_defns_tree(&self) -> ConfigMap {
        let mut tree = self.tree.clone();
        tree.shift_remove("rocoto");
        tree
    }
}

/// Resolves configuration by merging layered sources.
///
/// Layers are applied lowest precedence first:
/// 1. Built-in defaults (also the structural template for user input)
/// 2. Workflow-block fragments (the default task set)
/// 3. Machine profile (selected via `user.MACHINE`)
/// 4. User overrides
pub struct WorkflowResolver {
    default_config: PathBuf,
    user_config: PathBuf,
    workflow_config: PathBuf,
    machine_dir: PathBuf,
    machine_config: Option<PathBuf>,
    mandatory: Vec<String>,
    valid_values: Option<ConfigMap>,
}

impl WorkflowResolver {
    /// Create a resolver over the four layer sources.
    ///
    /// `machine_dir` holds per-machine profiles named `<machine>.yaml`;
    /// an explicit profile path set with [`with_machine_config`] takes
    /// precedence over the directory lookup.
    ///
    /// [`with_machine_config`]: WorkflowResolver::with_machine_config
    pub fn new(
        default_config: impl Into<PathBuf>,
        user_config: impl Into<PathBuf>,
        workflow_config: impl Into<PathBuf>,
        machine_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            default_config: default_config.into(),
            user_config: user_config.into(),
            workflow_config: workflow_config.into(),
            machine_dir: machine_dir.into(),
            machine_config: None,
            mandatory: Vec::new(),
            valid_values: None,
        }
    }

    /// Use an explicit machine profile instead of the directory lookup.
    pub fn with_machine_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.machine_config = Some(path.into());
        self
    }

    /// Dotted paths that must be present and non-null in the user layer.
    pub fn with_mandatory<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mandatory = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Reference mapping of allowed values, enabling the enum check.
    pub fn with_valid_values(mut self, valid: ConfigMap) -> Self {
        self.valid_values = Some(valid);
        self
    }

    /// Run the resolution pipeline.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let defaults = Layer::load(LayerKind::Defaults, &self.default_config)?;
        let user = Layer::load(LayerKind::User, &self.user_config)?;

        // User keys must be a subset of the defaults template; the task
        // namespace is open-ended and allowed through afterwards.
        let invalid =
            validate::allow_task_keys(validate::check_structure(&user.tree, &defaults.tree));
        if !invalid.is_empty() {
            return Err(Error::StructuralViolation {
                path: user.path.clone(),
                entries: invalid
                    .iter()
                    .map(|(key, value)| format!("{key} = {}", codec::encode(value, true)))
                    .collect(),
            });
        }
        validate::check_mandatory(&user.tree, &self.mandatory)?;

        // The machine name selects the machine profile and is recorded
        // uppercased, winning the final merge.
        let machine = match get_path(&user.tree, "user.MACHINE") {
            Some(ConfigValue::Str(name)) if !name.is_empty() => name.to_uppercase(),
            _ => {
                return Err(Error::MissingMandatoryField {
                    path: "user.MACHINE".to_string(),
                });
            }
        };
        let mut user_tree = user.tree.clone();
        set_path(
            &mut user_tree,
            "user.MACHINE",
            ConfigValue::Str(machine.clone()),
        )?;

        let machine_path = self
            .machine_config
            .clone()
            .unwrap_or_else(|| layers::machine_profile_path(&self.machine_dir, &machine));
        let machine_layer = Layer::load(LayerKind::Machine, &machine_path)?;

        let workflow = Layer::load(LayerKind::WorkflowBlock, &self.workflow_config)?;
        let mut workflow_tree = workflow.tree.clone();
        // anchored task defaults leave null entries behind; a self-merge
        // clears them before the task set is assembled
        merge::normalize(&mut workflow_tree);

        // a user-specified taskgroups selection replaces the default set
        if let Some(taskgroups) = get_path(&user_tree, "rocoto.tasks.taskgroups") {
            set_path(
                &mut workflow_tree,
                "rocoto.tasks.taskgroups",
                taskgroups.clone(),
            )?;
        }

        dereference::dereference(&mut workflow_tree)?;
        install_taskgroups(&mut workflow_tree, &workflow.path)?;

        // user workflow-graph settings switch tasks on and off before
        // jobnames are derived
        if let Some(ConfigValue::Map(user_rocoto)) = user_tree.get("rocoto") {
            if let Some(ConfigValue::Map(workflow_rocoto)) = workflow_tree.get_mut("rocoto") {
                merge::merge_into(workflow_rocoto, user_rocoto);
            }
        }
        if let Some(task_tree) =
            get_path_mut(&mut workflow_tree, "rocoto.tasks").and_then(ConfigValue::as_map_mut)
        {
            tasks::expand(task_tree);
        }

        // ascending precedence into the defaults tree
        let mut tree = defaults.tree.clone();
        merge::merge_into(&mut tree, &workflow_tree);
        merge::merge_into(&mut tree, &machine_layer.tree);
        merge::merge_into(&mut tree, &user_tree);
        merge::normalize(&mut tree);

        dereference::dereference(&mut tree)?;
        normalize_values(&mut tree);

        if let Some(valid) = &self.valid_values {
            validate::check_valid_values(&tree, valid)?;
        }

        tracing::debug!(sections = tree.len(), "Configuration resolved");
        Ok(ResolvedConfig { tree })
    }
}

/// Install the dereferenced `taskgroups` YAML text as the task set.
///
/// After dereferencing, the workflow-block's `rocoto.tasks.taskgroups`
/// entry holds concrete YAML text describing the selected task groups;
/// it is parsed and replaces the `tasks` mapping wholesale.
fn install_taskgroups(workflow_tree: &mut ConfigMap, source: &Path) -> Result<()> {
    let Some(rocoto) = workflow_tree.get_mut("rocoto").and_then(ConfigValue::as_map_mut) else {
        return Ok(());
    };
    let Some(tasks) = rocoto.get_mut("tasks").and_then(ConfigValue::as_map_mut) else {
        return Ok(());
    };
    if let Some(ConfigValue::Str(text)) = tasks.shift_remove("taskgroups") {
        let parsed = layers::parse_yaml_map(&text, source)?;
        rocoto.insert("tasks".to_string(), ConfigValue::Map(parsed));
    }
    Ok(())
}

/// Decode section-level string leaves into native values.
///
/// Mirrors the final typing pass over the resolved tree: every
/// non-empty string directly under a section is run through the codec
/// so shell-style list and scalar encodings become native values.
/// Deeper structures (the workflow-graph sub-tree) keep their string
/// leaves verbatim for the generator.
fn normalize_values(tree: &mut ConfigMap) {
    for section in tree.values_mut() {
        let Some(settings) = section.as_map_mut() else {
            continue;
        };
        for value in settings.values_mut() {
            if let ConfigValue::Str(s) = value {
                if s.is_empty() {
                    continue;
                }
                *value = codec::decode(s, DecodeMode::Typed);
            }
        }
    }
}
