//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which reads a file into an in-memory
//! [`crate::types::InputTable`].
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - Any extension other than the CSV and spreadsheet ones is rejected.

use std::fmt;
use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::InputTable;

use super::csv;
use super::infer::default_na_values;

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated (or otherwise delimited) values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

impl fmt::Display for IngestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Excel => f.write_str("spreadsheet"),
        }
    }
}

/// How to choose the sheet when ingesting a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcelSheetSelection {
    /// Ingest the first sheet (default).
    #[default]
    First,
    /// Ingest a single named sheet.
    Sheet(String),
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// Spreadsheet-specific options.
    pub excel_sheet_selection: ExcelSheetSelection,
    /// CSV field delimiter.
    pub delimiter: u8,
    /// Cell texts treated as missing values (compared after trimming).
    pub na_values: Vec<String>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            excel_sheet_selection: ExcelSheetSelection::default(),
            delimiter: b',',
            na_values: default_na_values(),
        }
    }
}

/// Unified ingestion entry point for path-based sources.
///
/// # Examples
///
/// ```no_run
/// use csvxl_pg_loader::ingestion::{ingest_from_path, IngestionOptions};
///
/// # fn main() -> Result<(), csvxl_pg_loader::IngestionError> {
/// // Uses `.csv` to select CSV ingestion.
/// let table = ingest_from_path("people.csv", &IngestionOptions::default())?;
/// println!("rows={} columns={}", table.row_count(), table.column_count());
/// # Ok(())
/// # }
/// ```
///
/// Forcing a format for a file without a usable extension:
///
/// ```no_run
/// use csvxl_pg_loader::ingestion::{ingest_from_path, IngestionFormat, IngestionOptions};
///
/// # fn main() -> Result<(), csvxl_pg_loader::IngestionError> {
/// let opts = IngestionOptions {
///     format: Some(IngestionFormat::Csv),
///     delimiter: b';',
///     ..Default::default()
/// };
/// let table = ingest_from_path("export.txt", &opts)?;
/// # let _ = table;
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(path: impl AsRef<Path>, options: &IngestionOptions) -> IngestionResult<InputTable> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    match fmt {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, options.delimiter, &options.na_values),
        IngestionFormat::Excel => ingest_excel_dispatch(path, options),
    }
}

/// Detect the ingestion format from the path's extension.
pub fn infer_format_from_path(path: &Path) -> IngestionResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IngestionError::UnsupportedFormat {
            message: format!("path has no extension ({})", path.display()),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| IngestionError::UnsupportedFormat {
        message: format!("unsupported extension '{ext}' for path ({})", path.display()),
    })
}

fn ingest_excel_dispatch(path: &Path, options: &IngestionOptions) -> IngestionResult<InputTable> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, options);

    #[cfg(feature = "excel")]
    {
        use super::excel;

        let sheet = match &options.excel_sheet_selection {
            ExcelSheetSelection::First => None,
            ExcelSheetSelection::Sheet(name) => Some(name.as_str()),
        };
        excel::ingest_excel_from_path(path, sheet, &options.na_values)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(IngestionError::UnsupportedFormat {
            message: "spreadsheet ingestion not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}
