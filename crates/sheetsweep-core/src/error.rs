//! Common error types for the sheetsweep runtime.
//!
//! Configuration, metrics and process setup errors live here; the
//! per-step errors of a sweep run are defined in the `sheetsweep` crate.

use snafu::prelude::*;

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Spreadsheet identifier is empty.
    #[snafu(display("Spreadsheet id cannot be empty"))]
    EmptySpreadsheetId,

    /// Range expression is empty.
    #[snafu(display("Source range cannot be empty"))]
    EmptyRange,

    /// Credential file path is empty.
    #[snafu(display("Credentials path cannot be empty"))]
    EmptyCredentialsPath,

    /// Archive directory or prefix is empty.
    #[snafu(display("Archive {field} cannot be empty"))]
    EmptyArchiveField { field: &'static str },

    /// SMTP username is empty.
    #[snafu(display("SMTP username cannot be empty"))]
    EmptyUsername,

    /// No recipients configured.
    #[snafu(display("At least one recipient is required"))]
    NoRecipients,

    /// A configured mail address could not be parsed.
    #[snafu(display("Invalid email address '{address}': {message}"))]
    InvalidAddress { address: String, message: String },

    /// Schedule time is not a valid `HH:MM:SS` value.
    #[snafu(display("Invalid schedule time '{value}' (expected HH:MM:SS)"))]
    InvalidScheduleTime { value: String },

    /// A timeout was configured as zero.
    #[snafu(display("{field} must be greater than zero"))]
    ZeroTimeout { field: &'static str },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: std::path::PathBuf },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Metrics server already initialized (double-init attempted).
    #[snafu(display("Metrics server already initialized"))]
    AlreadyInitialized,

    /// Metrics server not initialized (controller accessed before init).
    #[snafu(display("Metrics server not initialized"))]
    NotInitialized,
}

// ============ Setup Errors ============

/// Errors that can occur while starting the service (before the first run).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SetupError {
    /// Failed to parse metrics address.
    #[snafu(display("Failed to parse metrics address: {source}"))]
    AddressParse { source: std::net::AddrParseError },

    /// Failed to initialize metrics.
    #[snafu(display("Failed to initialize metrics: {source}"))]
    Metrics { source: MetricsError },
}
