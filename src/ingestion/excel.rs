#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{IngestionError, IngestionResult};
use crate::types::InputTable;

use super::infer::{build_table, classify_string_cell, header_names, parse_date, Cell, CellKind};

/// Ingest one sheet of a spreadsheet (`.xlsx`, `.xls`, `.ods`, etc.) into an [`InputTable`].
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Skips rows that are entirely empty
/// - Infers column types from the typed cells (date cells become dates, integral floats ints)
pub fn ingest_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    na_values: &[String],
) -> IngestionResult<InputTable> {
    let mut workbook = open_workbook_auto(path)?;

    let sheets = workbook.sheet_names().to_vec();
    let sheet = match sheet_name {
        Some(name) => sheets
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("sheet '{name}' not found. sheets={sheets:?}"),
            })?,
        None => sheets.first().cloned().ok_or_else(|| IngestionError::SchemaMismatch {
            message: "workbook has no sheets".to_string(),
        })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    ingest_sheet_range(&sheet, &range, na_values)
}

fn ingest_sheet_range(
    sheet: &str,
    range: &calamine::Range<Data>,
    na_values: &[String],
) -> IngestionResult<InputTable> {
    let mut data_rows = range
        .rows()
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)));

    let headers = data_rows
        .next()
        .map(|row| header_names(row.iter().map(cell_to_header_string)))
        .ok_or_else(|| IngestionError::SchemaMismatch {
            message: format!("sheet '{sheet}' has no non-empty rows (no header row found)"),
        })?;

    let rows: Vec<Vec<Cell>> = data_rows
        .map(|row| row.iter().map(|c| classify_cell(c, na_values)).collect())
        .collect();

    build_table(headers, rows)
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Empty => "".to_string(),
        other => other.to_string(),
    }
}

fn classify_cell(c: &Data, na_values: &[String]) -> Cell {
    match c {
        Data::Empty | Data::Error(_) => Cell::missing(),
        Data::String(s) => classify_string_cell(s, na_values),
        Data::Int(i) => Cell::new(CellKind::Int(*i), i.to_string()),
        Data::Float(f) => {
            // Whole numbers inside the i64 range read as integers.
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                let i = *f as i64;
                Cell::new(CellKind::Int(i), i.to_string())
            } else {
                Cell::new(CellKind::Float(*f), f.to_string())
            }
        }
        Data::Bool(b) => Cell::new(CellKind::Bool(*b), b.to_string()),
        Data::DateTime(dt) if dt.is_duration() => Cell::new(CellKind::Text, c.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => {
                let d = ndt.date();
                Cell::new(CellKind::Date(d), d.format("%Y-%m-%d").to_string())
            }
            None => Cell::new(CellKind::Text, c.to_string()),
        },
        Data::DateTimeIso(s) => match parse_date(s) {
            Some(d) => Cell::new(CellKind::Date(d), s.clone()),
            None => Cell::new(CellKind::Text, s.clone()),
        },
        Data::DurationIso(s) => Cell::new(CellKind::Text, s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_classify_as_ints() {
        let cell = classify_cell(&Data::Float(30.0), &[]);
        assert_eq!(cell.kind, CellKind::Int(30));
        let cell = classify_cell(&Data::Float(30.5), &[]);
        assert_eq!(cell.kind, CellKind::Float(30.5));
    }

    #[test]
    fn string_cells_are_not_parsed_as_numbers() {
        let na = vec!["NA".to_string()];
        assert_eq!(classify_cell(&Data::String("42".to_string()), &na).kind, CellKind::Text);
        assert_eq!(classify_cell(&Data::String("NA".to_string()), &na).kind, CellKind::Missing);
    }

    #[test]
    fn iso_datetime_cells_become_dates() {
        let cell = classify_cell(&Data::DateTimeIso("2020-01-01T10:00:00".to_string()), &[]);
        assert_eq!(
            cell.kind,
            CellKind::Date(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
    }
}
