//! Command-line arguments and config path helpers.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(version, about = "Daily spreadsheet archive, error report and reset")]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "sheetsweep.yaml")]
    pub config: PathBuf,

    /// Optional dotenv file loaded before the config is interpolated
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Run the sweep once immediately and exit instead of waiting for the schedule
    #[arg(long)]
    pub once: bool,
}
