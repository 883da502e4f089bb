//! Daily trigger.
//!
//! A [`DailySchedule`] names one local wall-clock time. [`run_daily_loop`]
//! sleeps until the next occurrence of that time, runs a [`ScheduledJob`],
//! and repeats until shutdown. Days on which the process is not running are
//! simply skipped; nothing is replayed.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike};
use snafu::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{ConfigError, InvalidScheduleTimeSnafu};

/// Format accepted for the configured time of day.
const TIME_FORMAT: &str = "%H:%M:%S";

/// Longest clock jump searched when the configured time falls in a gap.
const MAX_GAP_MINUTES: i64 = 180;

/// A once-per-day firing time, interpreted in the local time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// Parse an `HH:MM:SS` time of day.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let at = NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
            .ok()
            .context(InvalidScheduleTimeSnafu { value })?;
        Ok(Self { at })
    }

    pub fn time(&self) -> NaiveTime {
        self.at
    }

    /// The first firing instant strictly after `after`.
    ///
    /// When the configured time does not exist on a day (DST gap) the first
    /// valid instant after the gap is used; when it exists twice the earlier
    /// one wins.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = after.timezone();
        let mut date = after.date_naive();

        loop {
            match resolve(&tz, date.and_time(self.at)) {
                Some(candidate) if candidate > *after => return candidate,
                _ => {}
            }
            date = date + Days::new(1);
        }
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daily at {}", self.at.format(TIME_FORMAT))
    }
}

fn resolve<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
        return Some(instant);
    }

    // Clocks jump on whole minutes, so the first valid minute is the end of the gap.
    let minute = naive.with_second(0)?;
    (1..=MAX_GAP_MINUTES)
        .map(|m| minute + TimeDelta::minutes(m))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
}

/// Work fired by the daily loop.
///
/// Errors are logged by the loop and never stop it: tomorrow's run must
/// still happen.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    type Error: std::error::Error + Send;

    async fn run(&self) -> Result<(), Self::Error>;
}

/// Run `job` once per day according to `schedule` until `shutdown` is cancelled.
///
/// Shutdown is honoured both while waiting and while the job is running;
/// an interrupted run is abandoned at its current await point.
pub async fn run_daily_loop<J: ScheduledJob>(
    job: &J,
    schedule: &DailySchedule,
    shutdown: CancellationToken,
    name: &str,
) {
    let mut last_fire: Option<DateTime<Local>> = None;

    loop {
        let now = Local::now();
        // Never fire the same scheduled instant twice, even if the wall clock
        // lags behind the timer that woke us.
        let from = match last_fire {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        let next = schedule.next_after(&from);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

        info!(
            job = name,
            next_run = %next,
            wait_secs = wait.as_secs(),
            "Waiting for next scheduled run"
        );

        if shutdown
            .run_until_cancelled(tokio::time::sleep(wait))
            .await
            .is_none()
        {
            info!(job = name, "Shutdown requested while waiting");
            break;
        }
        last_fire = Some(next);

        info!(job = name, "Starting scheduled run");
        let result = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(job = name, "Shutdown requested during run");
                break;
            }

            result = job.run() => result,
        };

        if let Err(e) = result {
            error!(job = name, error = %e, "Scheduled run failed");
        }
    }
}
