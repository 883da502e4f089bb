//! Sheet contents and the error-cell scan.
//!
//! A [`Grid`] is the raw row-major cell text fetched for one run. Scanning it
//! yields a [`RunSummary`]: the sheet size as reported in the email and every
//! cell whose value is exactly [`ERROR_MARKER`].

use std::fmt;

/// Cell value that marks a row as failed.
pub const ERROR_MARKER: &str = "Error";

/// Row-major cell values. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Reported width: the length of the first row.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positions of every error cell, top-to-bottom then left-to-right.
    pub fn error_cells(&self) -> Vec<ErrorLocation> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, cell)| cell.as_str() == ERROR_MARKER)
                    .map(move |(c, _)| ErrorLocation::from_zero_based(r, c))
            })
            .collect()
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for Grid {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// A flagged cell, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorLocation {
    pub row: usize,
    pub column: usize,
}

impl ErrorLocation {
    pub fn from_zero_based(row: usize, column: usize) -> Self {
        Self {
            row: row + 1,
            column: column + 1,
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}, Column {}", self.row, self.column)
    }
}

/// What the daily report says about one grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub columns: usize,
    pub error_cells: Vec<ErrorLocation>,
}

impl RunSummary {
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            rows: grid.row_count(),
            columns: grid.width(),
            error_cells: grid.error_cells(),
        }
    }

    /// e.g. `"3 rows x 2 columns"`
    pub fn sheet_size(&self) -> String {
        format!("{} rows x {} columns", self.rows, self.columns)
    }

    pub fn error_count(&self) -> usize {
        self.error_cells.len()
    }

    /// e.g. `"Row 2, Column 1; Row 3, Column 2"`, empty when nothing was flagged.
    pub fn error_details(&self) -> String {
        self.error_cells
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
