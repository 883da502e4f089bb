//! Remote spreadsheet access.
//!
//! The sweep needs exactly two operations on one fixed document and range:
//! read everything, then clear it.

mod sheets;

pub use sheets::{GoogleSheetsClient, SPREADSHEETS_SCOPE};

use async_trait::async_trait;

use crate::error::SourceError;
use crate::grid::Grid;

/// A remote tabular source bound to one document and range.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Read every row in the range. An empty range yields an empty grid.
    async fn read(&self) -> Result<Grid, SourceError>;

    /// Clear every value in the range.
    async fn clear(&self) -> Result<(), SourceError>;
}
