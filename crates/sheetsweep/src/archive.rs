//! Dated xlsx archives of the fetched sheet.
//!
//! ## Layout
//!
//! ```text
//! DATA RC/
//! ├── RC-2024-03-09.xlsx
//! ├── RC-2024-03-10.xlsx
//! └── ...
//! ```
//!
//! One file per calendar day; a second run on the same day overwrites it.
//! Each workbook holds a single worksheet with the grid verbatim.

use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::ArchiveConfig;
use crate::error::{
    ArchiveError, CellOutOfRangeSnafu, CreateDirSnafu, OpenSnafu, ReadSheetSnafu, SaveSnafu,
    SheetNameSnafu, WriteCellSnafu,
};
use crate::grid::Grid;

/// Archive file extension.
pub const ARCHIVE_EXTENSION: &str = "xlsx";

/// `<prefix>-<YYYY-MM-DD>.xlsx`
pub fn archive_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}.{ARCHIVE_EXTENSION}", date.format("%Y-%m-%d"))
}

/// A written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub bytes: u64,
}

impl ArchiveFile {
    /// Bare file name, used as the attachment name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Writes grids into the archive directory.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    directory: PathBuf,
    prefix: String,
    sheet_name: String,
}

impl ArchiveWriter {
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            sheet_name: sheet_name.into(),
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(&config.directory, &config.prefix, &config.sheet_name)
    }

    /// Path of the archive for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(archive_file_name(&self.prefix, date))
    }

    /// Write `grid` as the archive for `date`, creating the directory if needed.
    ///
    /// Blocking; run it on the blocking pool from async code.
    pub fn write(&self, grid: &Grid, date: NaiveDate) -> Result<ArchiveFile, ArchiveError> {
        std::fs::create_dir_all(&self.directory).context(CreateDirSnafu {
            path: &self.directory,
        })?;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&self.sheet_name)
            .context(SheetNameSnafu {
                name: &self.sheet_name,
            })?;

        for (r, row) in grid.rows().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                // Blank cells stay blank rather than holding an empty string.
                if cell.is_empty() {
                    continue;
                }
                let (Ok(row_num), Ok(col_num)) = (u32::try_from(r), u16::try_from(c)) else {
                    return CellOutOfRangeSnafu { row: r, column: c }.fail();
                };
                worksheet
                    .write_string(row_num, col_num, cell)
                    .context(WriteCellSnafu { row: r, column: c })?;
            }
        }

        let path = self.path_for(date);
        workbook.save(&path).context(SaveSnafu { path: &path })?;

        let bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or_default();
        info!(path = %path.display(), bytes, rows = grid.row_count(), "Data saved to archive");

        Ok(ArchiveFile { path, bytes })
    }
}

/// Read an archive back into a grid.
///
/// Blank cells read as empty strings and trailing blanks are dropped from
/// each row, so a grid whose rows do not end in empty cells reads back
/// unchanged.
pub fn read_archive(path: &Path, sheet_name: &str) -> Result<Grid, ArchiveError> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpenSnafu { path })?;
    let range = workbook
        .worksheet_range(sheet_name)
        .context(ReadSheetSnafu { sheet: sheet_name })?;

    let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
    debug!(path = %path.display(), row_offset, col_offset, "Reading archive");

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_offset as usize];
    for cells in range.rows() {
        let mut row = vec![String::new(); col_offset as usize];
        row.extend(cells.iter().map(cell_text));
        while row.last().is_some_and(String::is_empty) {
            row.pop();
        }
        rows.push(row);
    }

    Ok(Grid::new(rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
