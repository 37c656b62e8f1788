//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;

/// Resolve layered workflow configuration and write generator inputs
#[derive(Parser, Debug)]
#[command(name = "vxflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// File name for default configuration file
    #[arg(short = 'd', long, default_value = "config_defaults.yaml")]
    pub default_config: PathBuf,

    /// File name for user configuration file
    #[arg(short = 'u', long, default_value = "config_vx.yaml")]
    pub user_config: PathBuf,

    /// File name for machine configuration file (overrides --machine-dir lookup)
    #[arg(short = 'm', long)]
    pub machine_config: Option<PathBuf>,

    /// Directory holding per-machine profile files
    #[arg(long, default_value = "machine")]
    pub machine_dir: PathBuf,

    /// File name for the workflow default configuration file
    #[arg(short = 'w', long, default_value = "default_workflow.yaml")]
    pub workflow_config: PathBuf,

    /// Reference file of allowed values; enables value validation
    #[arg(long)]
    pub validate_values: Option<PathBuf>,

    /// Directory for generated files when the configuration does not name one
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Also write a shell-sourceable variable-definitions file here
    #[arg(long)]
    pub shell_defns: Option<PathBuf>,
}
