//! Column type inference shared by the CSV and spreadsheet readers.
//!
//! Readers classify each cell into a [`Cell`]; [`build_table`] then folds every column's cell
//! kinds into one [`InferredType`] and converts the cells into typed [`Value`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Field, InferredType, InputTable, Schema, Value};

/// Missing-value markers recognized by default, compared against the trimmed cell text.
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Kind of a single classified cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellKind {
    Missing,
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Text,
}

/// A classified cell: its kind plus the text used if the column resolves to text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cell {
    pub(crate) kind: CellKind,
    pub(crate) text: String,
}

impl Cell {
    pub(crate) fn missing() -> Self {
        Self {
            kind: CellKind::Missing,
            text: String::new(),
        }
    }

    pub(crate) fn new(kind: CellKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Returns `true` if `raw` (trimmed) is one of the missing-value markers.
pub(crate) fn is_missing(raw: &str, na_values: &[String]) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || na_values.iter().any(|na| na == trimmed)
}

/// Classify a CSV field by trying integer, float, bool and date parses in that order.
pub(crate) fn classify_text(raw: &str, na_values: &[String]) -> Cell {
    if is_missing(raw, na_values) {
        return Cell::missing();
    }
    let trimmed = raw.trim();

    let kind = if let Ok(i) = trimmed.parse::<i64>() {
        CellKind::Int(i)
    } else if let Some(f) = parse_float(trimmed) {
        CellKind::Float(f)
    } else if trimmed.eq_ignore_ascii_case("true") {
        CellKind::Bool(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        CellKind::Bool(false)
    } else if let Some(d) = parse_date(trimmed) {
        CellKind::Date(d)
    } else {
        CellKind::Text
    };
    Cell::new(kind, raw)
}

/// Classify a string-typed spreadsheet cell: strings stay strings unless they are a missing
/// marker.
pub(crate) fn classify_string_cell(raw: &str, na_values: &[String]) -> Cell {
    if is_missing(raw, na_values) {
        Cell::missing()
    } else {
        Cell::new(CellKind::Text, raw)
    }
}

// `f64::from_str` also accepts "inf"/"infinity"; require a digit so words stay text.
fn parse_float(s: &str) -> Option<f64> {
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Parse a date or date-time string; times of day are dropped.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Fold the kinds seen in one column into its inferred type.
pub(crate) fn resolve_column_type<'a>(cells: impl Iterator<Item = &'a Cell>) -> InferredType {
    let (mut ints, mut floats, mut bools, mut dates, mut texts) = (0usize, 0usize, 0usize, 0usize, 0usize);
    for cell in cells {
        match cell.kind {
            CellKind::Missing => {}
            CellKind::Int(_) => ints += 1,
            CellKind::Float(_) => floats += 1,
            CellKind::Bool(_) => bools += 1,
            CellKind::Date(_) => dates += 1,
            CellKind::Text => texts += 1,
        }
    }

    let numeric = ints + floats;
    let kinds_present = [numeric, bools, dates, texts].iter().filter(|&&n| n > 0).count();
    match kinds_present {
        // A column with no values at all reads as float (all-NaN).
        0 => InferredType::Float,
        1 if ints > 0 && floats == 0 => InferredType::Int,
        1 if numeric > 0 => InferredType::Float,
        1 if bools > 0 => InferredType::Bool,
        1 if dates > 0 => InferredType::Date,
        _ => InferredType::Text,
    }
}

fn convert_cell(cell: Cell, ty: InferredType) -> Value {
    match (ty, cell.kind) {
        (_, CellKind::Missing) => Value::Null,
        (InferredType::Int, CellKind::Int(i)) => Value::Int64(i),
        (InferredType::Float, CellKind::Int(i)) => Value::Float64(i as f64),
        (InferredType::Float, CellKind::Float(f)) => Value::Float64(f),
        (InferredType::Bool, CellKind::Bool(b)) => Value::Bool(b),
        (InferredType::Date, CellKind::Date(d)) => Value::Date(d),
        _ => Value::Utf8(cell.text),
    }
}

/// Name header cells, replacing blank ones with `Unnamed: <index>`.
pub(crate) fn header_names(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, h)| {
            if h.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                h
            }
        })
        .collect()
}

/// Infer column types and build the final [`InputTable`].
///
/// Short rows are padded with missing cells.
pub(crate) fn build_table(headers: Vec<String>, mut rows: Vec<Vec<Cell>>) -> IngestionResult<InputTable> {
    if headers.is_empty() {
        return Err(IngestionError::SchemaMismatch {
            message: "no columns to parse from file".to_string(),
        });
    }

    let width = headers.len();
    for row in &mut rows {
        row.resize_with(width, Cell::missing);
    }

    // Header-only input reads as text columns; all-missing columns of real rows stay float.
    let types: Vec<InferredType> = if rows.is_empty() {
        vec![InferredType::Text; width]
    } else {
        (0..width)
            .map(|idx| resolve_column_type(rows.iter().map(|row| &row[idx])))
            .collect()
    };

    let fields = headers
        .into_iter()
        .zip(types.iter())
        .map(|(name, ty)| Field::new(name, *ty))
        .collect();

    let values = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(types.iter())
                .map(|(cell, ty)| convert_cell(cell, *ty))
                .collect()
        })
        .collect();

    Ok(InputTable::new(Schema::new(fields), values))
}

/// Owned copy of [`DEFAULT_NA_VALUES`].
pub fn default_na_values() -> Vec<String> {
    DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_cells(values: &[&str]) -> Vec<Cell> {
        let na = default_na_values();
        values.iter().map(|v| classify_text(v, &na)).collect()
    }

    #[test]
    fn integers_with_missing_values_stay_int() {
        let cells = text_cells(&["30", "", "NA"]);
        assert_eq!(resolve_column_type(cells.iter()), InferredType::Int);
    }

    #[test]
    fn integers_mixed_with_floats_become_float() {
        let cells = text_cells(&["1", "2.5"]);
        assert_eq!(resolve_column_type(cells.iter()), InferredType::Float);
    }

    #[test]
    fn mixed_kinds_become_text() {
        let cells = text_cells(&["1", "2020-01-01"]);
        assert_eq!(resolve_column_type(cells.iter()), InferredType::Text);
        let cells = text_cells(&["true", "yes"]);
        assert_eq!(resolve_column_type(cells.iter()), InferredType::Text);
    }

    #[test]
    fn all_missing_column_reads_as_float() {
        let cells = text_cells(&["", "nan"]);
        assert_eq!(resolve_column_type(cells.iter()), InferredType::Float);
    }

    #[test]
    fn bool_and_date_columns_are_detected() {
        assert_eq!(
            resolve_column_type(text_cells(&["TRUE", "false"]).iter()),
            InferredType::Bool
        );
        assert_eq!(
            resolve_column_type(text_cells(&["2020-01-01", "2021/06/15", "07/04/2022 10:30"]).iter()),
            InferredType::Date
        );
    }

    #[test]
    fn words_that_parse_as_floats_stay_text() {
        let cells = text_cells(&["inf", "Infinity"]);
        assert_eq!(resolve_column_type(cells.iter()), InferredType::Text);
    }

    #[test]
    fn parse_date_truncates_times() {
        let expected = NaiveDate::from_ymd_opt(2021, 6, 15);
        assert_eq!(parse_date("2021-06-15T08:30:00"), expected);
        assert_eq!(parse_date("2021-06-15 08:30:00.250"), expected);
        assert_eq!(parse_date("2021-06-15T08:30:00+02:00"), expected);
        assert_eq!(parse_date("15 June"), None);
    }

    #[test]
    fn text_columns_keep_original_text() {
        let table = build_table(
            vec!["code".to_string()],
            vec![text_cells(&["007"]), text_cells(&["A-1"])],
        )
        .unwrap();
        assert_eq!(table.schema.fields[0].inferred_type, InferredType::Text);
        assert_eq!(table.rows[0][0], Value::Utf8("007".to_string()));
    }

    #[test]
    fn build_table_pads_short_rows() {
        let table = build_table(
            vec!["a".to_string(), "b".to_string()],
            vec![text_cells(&["1", "2"]), text_cells(&["3"])],
        )
        .unwrap();
        assert_eq!(table.rows[1], vec![Value::Int64(3), Value::Null]);
        assert_eq!(table.schema.fields[1].inferred_type, InferredType::Int);
    }

    #[test]
    fn blank_headers_are_named_by_position() {
        let names = header_names(vec!["id".to_string(), " ".to_string()]);
        assert_eq!(names, vec!["id".to_string(), "Unnamed: 1".to_string()]);
    }

    #[test]
    fn header_only_columns_are_text() {
        let table = build_table(vec!["a".to_string(), "b".to_string()], Vec::new()).unwrap();
        assert_eq!(table.row_count(), 0);
        assert!(table.schema.fields.iter().all(|f| f.inferred_type == InferredType::Text));

        let table = build_table(vec!["a".to_string()], vec![text_cells(&[""])]).unwrap();
        assert_eq!(table.schema.fields[0].inferred_type, InferredType::Float);
    }

    #[test]
    fn empty_header_is_rejected() {
        let err = build_table(Vec::new(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("no columns to parse from file"));
    }
}
