//! Common configuration types and YAML loading.

mod path;
mod vars;

pub use path::{CliArgs, is_yaml_file};
pub use vars::{InterpolationResult, interpolate};

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::error::{
    ConfigError, EnvInterpolationSnafu, ReadFileSnafu, UnsupportedFormatSnafu, YamlParseSnafu,
};

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    crate::metrics::DEFAULT_METRICS_ADDR.to_string()
}

/// Interpolate environment variables in `contents` and deserialize the result.
pub fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T, ConfigError> {
    let result = interpolate(contents);
    ensure!(
        result.is_ok(),
        EnvInterpolationSnafu {
            message: result.errors.join("\n"),
        }
    );

    serde_yaml::from_str(&result.text).context(YamlParseSnafu)
}

/// Read a YAML config file, interpolate it and deserialize it.
pub fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    ensure!(is_yaml_file(path), UnsupportedFormatSnafu { path });

    let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    parse_yaml(&contents)
}
