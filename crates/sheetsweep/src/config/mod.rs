//! Configuration for the sheetsweep service.
//!
//! Loaded once at start-up from a YAML file (with environment variable
//! interpolation) and treated as immutable afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lettre::Address;
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use sheetsweep_core::config::{load_yaml_file, parse_yaml};
use sheetsweep_core::error::{
    EmptyArchiveFieldSnafu, EmptyCredentialsPathSnafu, EmptyRangeSnafu, EmptySpreadsheetIdSnafu,
    EmptyUsernameSnafu, InvalidAddressSnafu, NoRecipientsSnafu, ZeroTimeoutSnafu,
};
use sheetsweep_core::{DailySchedule, MetricsConfig};

use crate::error::ConfigError;

/// Remote spreadsheet to sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Spreadsheet document identifier.
    pub spreadsheet_id: String,
    /// A1 range to read and clear (e.g. "Sheet1!A:Z").
    #[serde(default = "default_range")]
    pub range: String,
    /// Service account JSON key file.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Base URL of the Sheets API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Upper bound for each remote call, authentication included.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_range() -> String {
    "Sheet1!A:Z".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("service-account.json")
}

fn default_api_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Where and how archives are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Archive directory, relative to the working directory unless absolute.
    #[serde(default = "default_archive_directory")]
    pub directory: PathBuf,
    /// File name prefix; files are named `<prefix>-<YYYY-MM-DD>.xlsx`.
    #[serde(default = "default_archive_prefix")]
    pub prefix: String,
    /// Name of the single worksheet in each archive.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            directory: default_archive_directory(),
            prefix: default_archive_prefix(),
            sheet_name: default_sheet_name(),
        }
    }
}

fn default_archive_directory() -> PathBuf {
    PathBuf::from("DATA RC")
}

fn default_archive_prefix() -> String {
    "RC".to_string()
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

/// SMTP delivery of the daily report.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// 465 connects with implicit TLS, any other port upgrades via STARTTLS.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Display name used when `from` is not set.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Full sender mailbox; defaults to `sender_name <username>`.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Every address receives the same single message.
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the sender mailbox.
    pub fn sender(&self) -> Result<Mailbox, ConfigError> {
        match &self.from {
            Some(from) => from.parse::<Mailbox>().map_err(|e| {
                InvalidAddressSnafu {
                    address: from,
                    message: e.to_string(),
                }
                .build()
            }),
            None => {
                let address = parse_address(&self.username)?;
                Ok(Mailbox::new(Some(self.sender_name.clone()), address))
            }
        }
    }

    /// Parse the recipient list, keeping its order.
    pub fn recipient_mailboxes(&self) -> Result<Vec<Mailbox>, ConfigError> {
        ensure!(!self.recipients.is_empty(), NoRecipientsSnafu);

        self.recipients
            .iter()
            .map(|r| parse_address(r).map(|address| Mailbox::new(None, address)))
            .collect()
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender_name", &self.sender_name)
            .field("from", &self.from)
            .field("subject", &self.subject)
            .field("recipients", &self.recipients)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn parse_address(value: &str) -> Result<Address, ConfigError> {
    value.trim().parse::<Address>().map_err(|e| {
        InvalidAddressSnafu {
            address: value,
            message: e.to_string(),
        }
        .build()
    })
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_sender_name() -> String {
    "Sheet Report".to_string()
}

fn default_subject() -> String {
    "Daily Google Sheet Report".to_string()
}

/// When the daily sweep fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Local time of day, `HH:MM:SS`.
    #[serde(default = "default_schedule_at")]
    pub at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            at: default_schedule_at(),
        }
    }
}

impl ScheduleConfig {
    pub fn daily(&self) -> Result<DailySchedule, ConfigError> {
        DailySchedule::parse(&self.at)
    }
}

fn default_schedule_at() -> String {
    "23:59:59".to_string()
}

/// Main configuration for sheetsweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    pub notify: NotifyConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = load_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            !self.source.spreadsheet_id.trim().is_empty(),
            EmptySpreadsheetIdSnafu
        );
        ensure!(!self.source.range.trim().is_empty(), EmptyRangeSnafu);
        ensure!(
            !self.source.credentials_path.as_os_str().is_empty(),
            EmptyCredentialsPathSnafu
        );
        ensure!(
            self.source.request_timeout_secs > 0,
            ZeroTimeoutSnafu {
                field: "source.request_timeout_secs"
            }
        );

        ensure!(
            !self.archive.directory.as_os_str().is_empty(),
            EmptyArchiveFieldSnafu { field: "directory" }
        );
        ensure!(
            !self.archive.prefix.trim().is_empty(),
            EmptyArchiveFieldSnafu { field: "prefix" }
        );
        ensure!(
            !self.archive.sheet_name.trim().is_empty(),
            EmptyArchiveFieldSnafu {
                field: "sheet_name"
            }
        );

        ensure!(!self.notify.username.trim().is_empty(), EmptyUsernameSnafu);
        ensure!(
            self.notify.timeout_secs > 0,
            ZeroTimeoutSnafu {
                field: "notify.timeout_secs"
            }
        );
        self.notify.sender()?;
        self.notify.recipient_mailboxes()?;

        self.schedule.daily()?;
        Ok(())
    }
}
