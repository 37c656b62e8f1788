//! Resolve the configuration and write the generator input files

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use vxflow_config::{ConfigMap, ResolvedConfig, WorkflowResolver, dump, layers};

use crate::cli::Cli;
use crate::error::Result;

/// Mandatory user settings when the caller does not say otherwise.
const MANDATORY: [&str; 2] = ["user.MACHINE", "user.ACCOUNT"];

pub fn run_generate(cli: &Cli) -> Result<()> {
    let mut resolver = WorkflowResolver::new(
        &cli.default_config,
        &cli.user_config,
        &cli.workflow_config,
        &cli.machine_dir,
    )
    .with_mandatory(MANDATORY);

    if let Some(machine_config) = &cli.machine_config {
        resolver = resolver.with_machine_config(machine_config);
    }
    if let Some(valid_path) = &cli.validate_values {
        resolver = resolver.with_valid_values(load_reference_map(valid_path)?);
    }

    let resolved = resolver.resolve()?;
    write_outputs(cli, &resolved)?;
    print_launch_hints(&resolved);
    Ok(())
}

/// Write the workflow-graph section and the variable-definitions record.
///
/// Output locations come from the resolved tree itself
/// (`workflow.ROCOTO_YAML_FP`, `workflow.VAR_DEFNS_FP`); the experiment
/// directory, or `--output-dir`, provides fallbacks.
fn write_outputs(cli: &Cli, resolved: &ResolvedConfig) -> Result<()> {
    let exptdir = resolved
        .str_at("workflow.EXPTDIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| cli.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&exptdir)?;

    if let Some(rocoto) = resolved.rocoto() {
        let rocoto_path =
            output_path(resolved, "workflow.ROCOTO_YAML_FP", &exptdir, "rocoto_defns.yaml");
        tracing::debug!(?rocoto_path, "Writing workflow-graph section");
        fs::write(&rocoto_path, dump::to_yaml_string(rocoto)?)?;
        println!("Wrote workflow definitions to {}", rocoto_path.display());
    }

    let var_defns_path = output_path(resolved, "workflow.VAR_DEFNS_FP", &exptdir, "var_defns.yaml");
    let var_defns = resolved.var_defns_tree();
    fs::write(&var_defns_path, dump::to_yaml_string(&var_defns)?)?;
    println!("Wrote variable definitions to {}", var_defns_path.display());

    if let Some(shell_path) = &cli.shell_defns {
        fs::write(shell_path, dump::to_shell_string(&var_defns))?;
        println!("Wrote shell definitions to {}", shell_path.display());
    }

    Ok(())
}

/// Load the reference mapping of allowed values.
fn load_reference_map(path: &Path) -> Result<ConfigMap> {
    if !path.is_file() {
        return Err(vxflow_config::Error::MissingSource {
            path: path.to_path_buf(),
        }
        .into());
    }
    let content = fs::read_to_string(path)?;
    Ok(layers::parse_yaml_map(&content, path)?)
}

fn output_path(resolved: &ResolvedConfig, key: &str, exptdir: &Path, fallback: &str) -> PathBuf {
    match resolved.str_at(key) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => exptdir.join(fallback),
    }
}

/// Print the commands that launch the workflow and check its status.
fn print_launch_hints(resolved: &ResolvedConfig) {
    let Some(xml_name) = resolved.str_at("workflow.VX_XML_FN") else {
        return;
    };
    let db_name = match xml_name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.db"),
        None => format!("{xml_name}.db"),
    };
    println!();
    println!("To launch the workflow, issue the rocotorun command:");
    println!("  {}", format!("rocotorun -w {xml_name} -d {db_name} -v 10").cyan());
    println!("To check on the status of the workflow, issue the rocotostat command:");
    println!("  {}", format!("rocotostat -w {xml_name} -d {db_name} -v 10").cyan());
}
