//! sheetsweep CLI: archive, report and clear a Google Sheet every day.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sheetsweep::{
    CliArgs, Config, RunOutcome, SweepPipeline, init_tracing, run_daily_loop,
    spawn_shutdown_handler, start_metrics,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Loaded before the subscriber so RUST_LOG can come from the env file.
    let env_loaded = dotenvy::from_path(&args.env_file);
    init_tracing();

    match env_loaded {
        Ok(()) => info!("Loaded environment from {}", args.env_file.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring env file {}: {e}", args.env_file.display()),
    }

    info!("Loading config from {}", args.config.display());
    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let schedule = match config.schedule.daily() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid schedule: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match SweepPipeline::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.once {
        info!("Running a single sweep");
        return match pipeline.run_once().await {
            Ok(RunOutcome::Completed(report)) if report.notified && report.cleared => {
                ExitCode::SUCCESS
            }
            Ok(RunOutcome::Completed(report)) => {
                error!(
                    notified = report.notified,
                    cleared = report.cleared,
                    "Sweep finished with failures"
                );
                ExitCode::FAILURE
            }
            Ok(RunOutcome::NoData) | Ok(RunOutcome::Skipped) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Sweep failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if let Err(e) = start_metrics(&config.metrics.address) {
        eprintln!("Failed to start metrics server: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        "Starting sheetsweep for spreadsheet {} ({}), {}",
        config.source.spreadsheet_id, config.source.range, schedule
    );

    let shutdown = CancellationToken::new();
    spawn_shutdown_handler(shutdown.clone());

    run_daily_loop(&pipeline, &schedule, shutdown, "sweep").await;

    info!("sheetsweep stopped");
    ExitCode::SUCCESS
}
