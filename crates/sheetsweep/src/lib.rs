//! sheetsweep: daily archive, error report and reset of a Google Sheet.
//!
//! This crate handles:
//! - Reading a fixed range from a Google Sheet with a service account
//! - Writing the rows to a dated xlsx archive
//! - Scanning for `Error` cells and emailing a summary with the archive attached
//! - Clearing the range so the next day starts empty

pub mod archive;
pub mod config;
pub mod error;
pub mod grid;
pub mod notify;
pub mod pipeline;
pub mod source;

// Re-export commonly used items
pub use config::Config;
pub use error::{InitError, RunError};
pub use grid::{ErrorLocation, Grid, RunSummary};
pub use pipeline::{RunOutcome, RunReport, SweepPipeline};

// Re-export from sheetsweep-core
pub use sheetsweep_core::{
    CliArgs, init_tracing, run_daily_loop, spawn_shutdown_handler, start_metrics,
};
