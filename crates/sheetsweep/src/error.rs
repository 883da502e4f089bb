//! Error types for the sheetsweep service.

use std::path::PathBuf;

use snafu::prelude::*;

// Re-export common errors
pub use sheetsweep_core::error::{ConfigError, MetricsError, SetupError};

/// Errors talking to the remote spreadsheet.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Service account key could not be loaded.
    #[snafu(display("Failed to load service account credentials from {}: {source}", path.display()))]
    Credentials {
        path: PathBuf,
        source: gcp_auth::Error,
    },

    /// HTTP client could not be constructed.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    HttpClient { source: reqwest::Error },

    /// API base URL is malformed.
    #[snafu(display("Invalid API URL '{url}': {source}"))]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// API base URL cannot carry path segments (e.g. `mailto:`).
    #[snafu(display("API URL '{url}' cannot be used as a base"))]
    CannotBeABase { url: String },

    /// OAuth token could not be obtained.
    #[snafu(display("Failed to obtain access token: {source}"))]
    Token { source: gcp_auth::Error },

    /// Request failed before a response was received.
    #[snafu(display("{operation} request failed: {source}"))]
    Request {
        operation: &'static str,
        source: reqwest::Error,
    },

    /// Service answered with a non-success status.
    #[snafu(display("{operation} returned HTTP {status}: {body}"))]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Response body was not the expected JSON.
    #[snafu(display("Failed to decode {operation} response: {source}"))]
    Decode {
        operation: &'static str,
        source: reqwest::Error,
    },

    /// The whole call, including authentication, took too long.
    #[snafu(display("{operation} timed out after {timeout_secs}s"))]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
        source: tokio::time::error::Elapsed,
    },
}

/// Errors writing or reading an archive workbook.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ArchiveError {
    /// Archive directory could not be created.
    #[snafu(display("Failed to create archive directory {}: {source}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Worksheet name was rejected.
    #[snafu(display("Invalid worksheet name '{name}': {source}"))]
    SheetName {
        name: String,
        source: rust_xlsxwriter::XlsxError,
    },

    /// Cell position does not fit in a worksheet.
    #[snafu(display("Cell at row {row}, column {column} is outside the worksheet limits"))]
    CellOutOfRange { row: usize, column: usize },

    /// Writing a cell failed.
    #[snafu(display("Failed to write cell at row {row}, column {column}: {source}"))]
    WriteCell {
        row: usize,
        column: usize,
        source: rust_xlsxwriter::XlsxError,
    },

    /// Saving the workbook failed.
    #[snafu(display("Failed to save archive {}: {source}", path.display()))]
    Save {
        path: PathBuf,
        source: rust_xlsxwriter::XlsxError,
    },

    /// An archive could not be opened for reading.
    #[snafu(display("Failed to open archive {}: {source}", path.display()))]
    Open {
        path: PathBuf,
        source: calamine::XlsxError,
    },

    /// The expected worksheet could not be read.
    #[snafu(display("Failed to read worksheet '{sheet}': {source}"))]
    ReadSheet {
        sheet: String,
        source: calamine::XlsxError,
    },
}

/// Errors composing or delivering the report email.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum NotifyError {
    /// Sender or recipient addresses are invalid.
    #[snafu(display("Invalid mail settings: {source}"))]
    Sender { source: ConfigError },

    /// SMTP relay could not be configured.
    #[snafu(display("Failed to configure SMTP relay {host}: {source}"))]
    Relay {
        host: String,
        source: lettre::transport::smtp::Error,
    },

    /// Attachment content type was rejected.
    #[snafu(display("Invalid attachment content type: {source}"))]
    AttachmentType {
        source: lettre::message::header::ContentTypeErr,
    },

    /// Message could not be assembled.
    #[snafu(display("Failed to build email: {source}"))]
    BuildMessage { source: lettre::error::Error },

    /// Archive could not be read for attaching.
    #[snafu(display("Failed to read attachment {}: {source}", path.display()))]
    ReadAttachment {
        path: PathBuf,
        source: std::io::Error,
    },

    /// SMTP server rejected or failed the delivery.
    #[snafu(display("Failed to send email: {source}"))]
    Transport {
        source: lettre::transport::smtp::Error,
    },
}

/// Errors that end a sweep run before notification.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    /// Reading the remote sheet failed.
    #[snafu(display("Failed to fetch sheet: {source}"))]
    Fetch { source: SourceError },

    /// Writing the archive failed.
    #[snafu(display("Failed to archive sheet: {source}"))]
    Archive { source: ArchiveError },

    /// The blocking archive task panicked or was cancelled.
    #[snafu(display("Archive task failed: {source}"))]
    ArchiveTask { source: tokio::task::JoinError },
}

/// Errors building the service from its configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InitError {
    /// Spreadsheet client could not be created.
    #[snafu(display("Failed to create spreadsheet client: {source}"))]
    SourceInit { source: SourceError },

    /// Mail transport could not be created.
    #[snafu(display("Failed to create mail transport: {source}"))]
    NotifierInit { source: NotifyError },
}
