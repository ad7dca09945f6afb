use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "excel_test_writer")]
use csvxl_pg_loader::ingestion::ExcelSheetSelection;
use csvxl_pg_loader::ingestion::{infer_format_from_path, ingest_from_path, IngestionFormat, IngestionOptions};
use csvxl_pg_loader::types::{InferredType, Value};
use csvxl_pg_loader::IngestionError;

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("csvxl-pg-loader-unified-{nanos}.{ext}"))
}

#[test]
fn unified_csv_is_detected_by_extension() {
    let table = ingest_from_path("tests/fixtures/people.csv", &IngestionOptions::default()).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.schema.fields[1].inferred_type, InferredType::Int);
}

#[test]
fn unified_uppercase_extension_is_accepted() {
    let path = tmp_file("CSV");
    std::fs::write(&path, "a,b\n1,x\n").unwrap();

    let table = ingest_from_path(&path, &IngestionOptions::default()).unwrap();
    assert_eq!(table.rows[0], vec![Value::Int64(1), Value::Utf8("x".to_string())]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn unified_rejects_other_extensions() {
    let err = ingest_from_path("tests/fixtures/scores.txt", &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::UnsupportedFormat { .. }));
    assert!(err.to_string().contains("unsupported extension 'txt'"));

    assert_eq!(
        infer_format_from_path(Path::new("report.ods")).unwrap(),
        IngestionFormat::Excel
    );
}

#[test]
fn unified_forced_format_ignores_the_extension() {
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        ..Default::default()
    };
    let table = ingest_from_path("tests/fixtures/scores.txt", &opts).unwrap();
    assert_eq!(table.schema.fields[1].inferred_type, InferredType::Float);
    assert_eq!(table.rows[0], vec![Value::Int64(1), Value::Float64(9.5)]);
}

#[test]
fn unified_empty_csv_has_no_columns() {
    let path = tmp_file("csv");
    std::fs::write(&path, "").unwrap();

    let err = ingest_from_path(&path, &IngestionOptions::default()).unwrap_err();
    assert!(err.to_string().contains("no columns to parse from file"));

    let _ = std::fs::remove_file(&path);
}

#[cfg(feature = "excel_test_writer")]
#[test]
fn unified_excel_named_sheet() {
    use rust_xlsxwriter::Workbook;

    let path = tmp_file("xlsx");
    let mut wb = Workbook::new();
    let first = wb.add_worksheet();
    first.set_name("First").unwrap();
    first.write_string(0, 0, "ignored").unwrap();
    first.write_string(1, 0, "x").unwrap();
    let second = wb.add_worksheet();
    second.set_name("Wanted").unwrap();
    second.write_string(0, 0, "id").unwrap();
    second.write_number(1, 0, 7).unwrap();
    wb.save(&path).unwrap();

    let opts = IngestionOptions {
        excel_sheet_selection: ExcelSheetSelection::Sheet("Wanted".to_string()),
        ..Default::default()
    };
    let table = ingest_from_path(&path, &opts).unwrap();
    assert_eq!(table.schema.field_names().collect::<Vec<_>>(), vec!["id"]);
    assert_eq!(table.rows[0][0], Value::Int64(7));

    let _ = std::fs::remove_file(&path);
}
