//! End-to-end integration tests for the resolution pipeline
//!
//! These exercise the complete flow over on-disk layer files: load ->
//! validate -> merge -> dereference -> codec normalization -> task
//! expansion -> output serialization.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vxflow_config::tree::get_path;
use vxflow_config::{ConfigValue, WorkflowResolver, dump};

/// Set up an experiment directory with the four layer files.
fn setup_experiment() -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    fs::write(
        dir.join("config_defaults.yaml"),
        r#"
user:
  MACHINE: ""
  ACCOUNT: ""
  PARMdir: /parm
workflow:
  EXPTDIR: "/exp/{{ user.ACCOUNT }}"
  VX_XML_FN: vx_workflow.xml
  RETRIES: 3
  CYCLE_FIRST: "20240601"
  OBS_SOURCES: '( "mrms" "ndas" )'
rocoto:
  attrs:
    realtime: false
  tasks:
    taskgroups: null
"#,
    )
    .unwrap();

    fs::write(
        dir.join("default_workflow.yaml"),
        r#"
rocoto:
  attrs:
    realtime: false
  tasks:
    taskgroups: |
      task_get_obs:
        attrs: {}
        walltime: "00:30:00"
      metatask_verify:
        task_stats:
          attrs:
            name: point_stats
        task_plots:
          attrs: {}
"#,
    )
    .unwrap();

    let machine_dir = dir.join("machine");
    fs::create_dir(&machine_dir).unwrap();
    fs::write(
        machine_dir.join("hera.yaml"),
        "workflow:\n  RETRIES: 5\nuser:\n  PARMdir: /scratch/parm\n",
    )
    .unwrap();

    fs::write(
        dir.join("config_vx.yaml"),
        r#"
user:
  MACHINE: hera
  ACCOUNT: fv3lam
workflow:
  RETRIES: null
rocoto:
  tasks:
    task_plots: null
"#,
    )
    .unwrap();

    temp
}

fn resolver_for(dir: &Path) -> WorkflowResolver {
    WorkflowResolver::new(
        dir.join("config_defaults.yaml"),
        dir.join("config_vx.yaml"),
        dir.join("default_workflow.yaml"),
        dir.join("machine"),
    )
    .with_mandatory(["user.MACHINE", "user.ACCOUNT"])
}

#[test]
fn full_pipeline_resolves_the_experiment() {
    let temp = setup_experiment();
    let resolved = resolver_for(temp.path()).resolve().unwrap();

    // user null unsets the default even though the machine layer raised it
    assert_eq!(resolved.get("workflow.RETRIES"), None);

    // machine layer overrides the default parm location
    assert_eq!(resolved.str_at("user.PARMdir"), Some("/scratch/parm"));

    // the machine name is recorded uppercased
    assert_eq!(resolved.str_at("user.MACHINE"), Some("HERA"));

    // references resolve across sections
    assert_eq!(resolved.str_at("workflow.EXPTDIR"), Some("/exp/fv3lam"));

    // codec normalization types section-level leaves
    assert!(matches!(
        resolved.get("workflow.CYCLE_FIRST"),
        Some(ConfigValue::Timestamp(_))
    ));
    assert_eq!(
        resolved.get("workflow.OBS_SOURCES"),
        Some(&ConfigValue::List(vec![
            ConfigValue::Str("mrms".into()),
            ConfigValue::Str("ndas".into()),
        ]))
    );
}

#[test]
fn task_tree_reflects_user_selections_and_overrides() {
    let temp = setup_experiment();
    let resolved = resolver_for(temp.path()).resolve().unwrap();
    let tasks = resolved.tasks().unwrap();

    // jobname from the key remainder
    assert_eq!(
        get_path(tasks, "task_get_obs.jobname"),
        Some(&ConfigValue::Str("get_obs".into()))
    );
    // jobname from the attrs.name override
    assert_eq!(
        get_path(tasks, "metatask_verify.task_stats.jobname"),
        Some(&ConfigValue::Str("point_stats".into()))
    );
    // user null switched this task off
    assert!(get_path(tasks, "metatask_verify.task_plots").is_none());
}

#[test]
fn resolved_tree_dumps_without_aliases_and_reloads() {
    let temp = setup_experiment();
    let resolved = resolver_for(temp.path()).resolve().unwrap();

    let dumped = dump::to_yaml_string(resolved.tree()).unwrap();
    assert!(!dumped.contains('&'));
    assert!(!dumped.contains("{{"));

    let reloaded: serde_yaml::Value = serde_yaml::from_str(&dumped).unwrap();
    assert!(reloaded.get("workflow").is_some());
}

#[test]
fn var_defns_shell_rendering_is_sourceable_shape() {
    let temp = setup_experiment();
    let resolved = resolver_for(temp.path()).resolve().unwrap();

    let shell = dump::to_shell_string(&resolved.var_defns_tree());
    assert!(shell.contains("# [user]"));
    assert!(shell.contains("MACHINE='HERA'"));
    assert!(shell.contains("OBS_SOURCES=( \"mrms\" \"ndas\" )"));
    assert!(!shell.contains("rocoto"));
}

#[test]
fn resolution_is_deterministic() {
    let temp = setup_experiment();
    let first = resolver_for(temp.path()).resolve().unwrap();
    let second = resolver_for(temp.path()).resolve().unwrap();
    assert_eq!(first.tree(), second.tree());
}
