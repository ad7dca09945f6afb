//! CSV ingestion implementation.

use std::path::Path;

use crate::error::IngestionResult;
use crate::types::InputTable;

use super::infer::{build_table, classify_text, header_names, Cell};

/// Ingest a delimited text file into an in-memory [`InputTable`].
///
/// Rules:
///
/// - The file must start with a header row; its cells become the column names.
/// - Every record must have as many fields as the header (ragged rows are an error).
/// - Column types are inferred from the values (see [`crate::ingestion`]).
pub fn ingest_csv_from_path(
    path: impl AsRef<Path>,
    delimiter: u8,
    na_values: &[String],
) -> IngestionResult<InputTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, na_values)
}

/// Ingest CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    na_values: &[String],
) -> IngestionResult<InputTable> {
    let headers = rdr.headers()?.clone();
    // An empty file yields a single empty header field.
    let headers: Vec<String> = if headers.iter().all(|h| h.is_empty()) && headers.len() <= 1 {
        Vec::new()
    } else {
        header_names(headers.iter().map(str::to_owned))
    };

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|raw| classify_text(raw, na_values)).collect());
    }

    build_table(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::infer::default_na_values;
    use crate::types::{InferredType, Value};

    fn read(input: &str) -> IngestionResult<InputTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input.as_bytes());
        ingest_csv_from_reader(&mut rdr, &default_na_values())
    }

    #[test]
    fn empty_input_has_no_columns() {
        let err = read("").unwrap_err();
        assert!(err.to_string().contains("no columns to parse from file"));
    }

    #[test]
    fn header_only_input_yields_zero_rows() {
        let table = read("a,b\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.schema.fields[0].inferred_type, InferredType::Text);
    }

    #[test]
    fn quoted_fields_keep_embedded_delimiters_and_quotes() {
        let table = read("name,note\nAnn,\"O'Hara, \"\"Jr\"\"\"\n").unwrap();
        assert_eq!(table.rows[0][1], Value::Utf8("O'Hara, \"Jr\"".to_string()));
    }
}
