//! Report delivery.

mod smtp;

pub use smtp::{SmtpNotifier, XLSX_CONTENT_TYPE};

use async_trait::async_trait;

use crate::archive::ArchiveFile;
use crate::error::NotifyError;
use crate::grid::RunSummary;

/// Server acknowledgement for a delivered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub code: String,
    pub message: String,
}

/// Sends the daily report with the archive attached.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to every recipient.
    async fn send(
        &self,
        summary: &RunSummary,
        archive: &ArchiveFile,
    ) -> Result<Delivery, NotifyError>;
}

/// HTML body of the report.
pub fn render_html(summary: &RunSummary) -> String {
    format!(
        "<h1>Google Sheet Report</h1>\n\
         <p>Sheet Size: {}</p>\n\
         <p>Error Count: {}</p>\n\
         <p>Error Details: {}</p>\n\
         <p>Attached is the latest Google Sheet data.</p>\n",
        summary.sheet_size(),
        summary.error_count(),
        summary.error_details(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn test_render_reference_grid() {
        let grid: Grid = vec![vec!["A", "B"], vec!["Error", "C"], vec!["D", "Error"]]
            .into_iter()
            .collect();
        let html = render_html(&RunSummary::from_grid(&grid));

        assert!(html.starts_with("<h1>Google Sheet Report</h1>"));
        assert!(html.contains("<p>Sheet Size: 3 rows x 2 columns</p>"));
        assert!(html.contains("<p>Error Count: 2</p>"));
        assert!(html.contains("<p>Error Details: Row 2, Column 1; Row 3, Column 2</p>"));
        assert!(html.contains("<p>Attached is the latest Google Sheet data.</p>"));
    }

    #[test]
    fn test_render_without_errors() {
        let grid: Grid = vec![vec!["ok"]].into_iter().collect();
        let html = render_html(&RunSummary::from_grid(&grid));

        assert!(html.contains("<p>Error Count: 0</p>"));
        assert!(html.contains("<p>Error Details: </p>"));
    }
}
