//! sheetsweep-core: runtime pieces shared by the sheetsweep service.
//!
//! - `config/` - YAML loading with environment variable interpolation, CLI arguments
//! - `metrics/` - Prometheus metrics infrastructure
//! - `schedule` - Daily trigger and the scheduled job trait
//! - `signal` - Signal handling for graceful shutdown
//! - `tracing` - Log subscriber setup
//! - `error` - Config, metrics and setup error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod schedule;
pub mod signal;
pub mod tracing;

// Re-export commonly used items
pub use config::{CliArgs, MetricsConfig, interpolate, load_yaml_file, parse_yaml};
pub use error::{ConfigError, MetricsError, SetupError};
pub use metrics::{
    DEFAULT_METRICS_ADDR, MetricsController, init_global as init_metrics,
    init_test as init_metrics_test, start as start_metrics,
};
pub use schedule::{DailySchedule, ScheduledJob, run_daily_loop};
pub use signal::{shutdown_signal, spawn_shutdown_handler};
pub use crate::tracing::init_tracing;
