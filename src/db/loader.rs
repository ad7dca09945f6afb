//! Row insertion.
//!
//! All rows of an [`InputTable`] go into the target table inside one transaction: either every
//! row is committed or the transaction is rolled back and the table gains nothing. Values are
//! always bound as parameters; [`CellParam`] adapts each [`Value`] to the server type of the
//! column it lands in.

use std::error::Error;

use bytes::BytesMut;
use serde::Serialize;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Transaction;
use tracing::{debug, warn};

use crate::error::{LoadError, LoadResult};
use crate::schema::quote_ident;
use crate::types::{InputTable, Value};

use super::connection::PgConnection;

pub const TABLE_COLUMNS_SQL: &str = "SELECT column_name::text \
     FROM information_schema.columns \
     WHERE table_schema = 'public' AND table_name::text = $1 \
     ORDER BY ordinal_position";

/// PostgreSQL limit on bind parameters per statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// How rows are grouped into `INSERT` statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum InsertMode {
    /// One `INSERT` per row.
    #[default]
    RowByRow,
    /// Multi-row `VALUES` lists of up to `rows_per_statement` rows.
    Batched { rows_per_statement: usize },
}

impl InsertMode {
    /// Rows per statement for a table `width` columns wide, within the bind-parameter limit.
    pub fn rows_per_statement(&self, width: usize) -> usize {
        match *self {
            InsertMode::RowByRow => 1,
            InsertMode::Batched { rows_per_statement } => {
                let cap = MAX_BIND_PARAMS / width.max(1);
                rows_per_statement.clamp(1, cap.max(1))
            }
        }
    }
}

/// Quoted column names of `table`, in table order.
pub async fn table_columns(conn: &PgConnection, table: &str) -> LoadResult<Vec<String>> {
    let rows = conn
        .client()
        .query(TABLE_COLUMNS_SQL, &[&table])
        .await
        .map_err(|e| LoadError::provisioning(format!("columns of table {table}"), TABLE_COLUMNS_SQL, e))?;
    Ok(rows.iter().map(|row| quote_ident(row.get::<_, &str>(0))).collect())
}

/// `INSERT INTO "<table>" (<columns>) VALUES ($1, ...), ...` for `rows` rows of `width` values.
pub fn insert_sql(table: &str, columns: &[String], rows: usize, width: usize) -> String {
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", quote_ident(table), columns.join(", "));
    let mut param = 1;
    for r in 0..rows {
        if r > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for c in 0..width {
            if c > 0 {
                sql.push_str(", ");
            }
            sql.push('$');
            sql.push_str(&param.to_string());
            param += 1;
        }
        sql.push(')');
    }
    sql
}

/// Insert every row of `input` into `table`, committing only if all of them succeed.
///
/// Returns the number of rows inserted. On failure the transaction is rolled back and the error
/// carries how many rows had been inserted before it.
pub async fn insert_rows(
    conn: &mut PgConnection,
    table: &str,
    columns: &[String],
    input: &InputTable,
    mode: InsertMode,
) -> LoadResult<usize> {
    let total = input.row_count();
    let tx = conn.transaction().await.map_err(|source| LoadError::Insertion {
        inserted: 0,
        total,
        row: None,
        source,
    })?;

    match insert_in_transaction(&tx, table, columns, input, mode).await {
        Ok(inserted) => {
            tx.commit().await.map_err(|source| LoadError::Insertion {
                inserted,
                total,
                row: None,
                source,
            })?;
            Ok(inserted)
        }
        Err(failure) => {
            if let Err(e) = tx.rollback().await {
                warn!("rollback after failed insert returned an error: {e}");
            }
            Err(LoadError::Insertion {
                inserted: failure.inserted,
                total,
                row: Some(failure.row),
                source: failure.source,
            })
        }
    }
}

struct RowFailure {
    inserted: usize,
    row: usize,
    source: tokio_postgres::Error,
}

async fn insert_in_transaction(
    tx: &Transaction<'_>,
    table: &str,
    columns: &[String],
    input: &InputTable,
    mode: InsertMode,
) -> Result<usize, RowFailure> {
    if input.rows.is_empty() {
        return Ok(0);
    }

    let width = input.column_count();
    let chunk_rows = mode.rows_per_statement(width).min(input.rows.len());

    let full_sql = insert_sql(table, columns, chunk_rows, width);
    debug!(sql = %full_sql, ?mode, "preparing insert");
    let full = tx.prepare(&full_sql).await.map_err(|source| RowFailure {
        inserted: 0,
        row: 1,
        source,
    })?;

    let mut inserted = 0;
    for chunk in input.rows.chunks(chunk_rows) {
        let params: Vec<CellParam<'_>> = chunk.iter().flatten().map(CellParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let result = if chunk.len() == chunk_rows {
            tx.execute(&full, &refs).await
        } else {
            // Trailing partial batch.
            let sql = insert_sql(table, columns, chunk.len(), width);
            tx.execute(sql.as_str(), &refs).await
        };

        result.map_err(|source| RowFailure {
            inserted,
            row: inserted + 1,
            source,
        })?;
        inserted += chunk.len();
    }

    Ok(inserted)
}

/// A [`Value`] bound as a statement parameter, converted to the column's server type.
#[derive(Debug)]
pub struct CellParam<'a>(pub &'a Value);

type BindResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN)
}

fn mismatch(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot store {value:?} in a column of type {ty}").into()
}

fn bind_int(value: &Value, v: i64, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        _ if is_text(ty) => v.to_string().as_str().to_sql(ty, out),
        _ => Err(mismatch(value, ty)),
    }
}

// The i64 range as f64 (upper bound exclusive); `as` saturates outside it.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn bind_float(value: &Value, v: f64, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::FLOAT4 => {
            let narrowed = v as f32;
            if v.is_finite() && !narrowed.is_finite() {
                return Err(mismatch(value, ty));
            }
            narrowed.to_sql(ty, out)
        }
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 if v.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&v) => {
            bind_int(value, v as i64, ty, out)
        }
        _ if is_text(ty) => v.to_string().as_str().to_sql(ty, out),
        _ => Err(mismatch(value, ty)),
    }
}

impl ToSql for CellParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> BindResult {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Int64(v) => bind_int(self.0, *v, ty, out),
            Value::Float64(v) => bind_float(self.0, *v, ty, out),
            Value::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                _ if is_text(ty) => v.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self.0, ty)),
            },
            Value::Utf8(s) if is_text(ty) => s.as_str().to_sql(ty, out),
            Value::Utf8(_) => Err(mismatch(self.0, ty)),
            Value::Date(d) => match *ty {
                Type::DATE => d.to_sql(ty, out),
                Type::TIMESTAMP => match d.and_hms_opt(0, 0, 0) {
                    Some(ts) => ts.to_sql(ty, out),
                    None => Err(mismatch(self.0, ty)),
                },
                _ if is_text(ty) => d.format("%Y-%m-%d").to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self.0, ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // (is_null, encoded bytes)
    fn bind(value: &Value, ty: &Type) -> Result<(bool, Vec<u8>), String> {
        let mut out = BytesMut::new();
        CellParam(value)
            .to_sql(ty, &mut out)
            .map(|is_null| (matches!(is_null, IsNull::Yes), out.to_vec()))
            .map_err(|e| e.to_string())
    }

    #[test]
    fn insert_sql_numbers_placeholders_across_rows() {
        let cols = vec!["\"a\"".to_string(), "\"b\"".to_string()];
        assert_eq!(
            insert_sql("t", &cols, 1, 2),
            r#"INSERT INTO "t" ("a", "b") VALUES ($1, $2)"#
        );
        assert_eq!(
            insert_sql("t", &cols, 2, 2),
            r#"INSERT INTO "t" ("a", "b") VALUES ($1, $2), ($3, $4)"#
        );
    }

    #[test]
    fn batch_size_respects_the_bind_parameter_limit() {
        assert_eq!(InsertMode::RowByRow.rows_per_statement(10), 1);
        let batched = InsertMode::Batched { rows_per_statement: 100_000 };
        assert_eq!(batched.rows_per_statement(3), MAX_BIND_PARAMS / 3);
        assert_eq!(InsertMode::Batched { rows_per_statement: 0 }.rows_per_statement(3), 1);
    }

    #[test]
    fn null_binds_as_sql_null_for_any_type() {
        let (is_null, bytes) = bind(&Value::Null, &Type::INT4).unwrap();
        assert!(is_null);
        assert!(bytes.is_empty());
    }

    #[test]
    fn ints_narrow_to_the_column_width() {
        let (_, bytes) = bind(&Value::Int64(30), &Type::INT4).unwrap();
        assert_eq!(bytes, 30_i32.to_be_bytes().to_vec());

        let err = bind(&Value::Int64(i64::from(i32::MAX) + 1), &Type::INT4).unwrap_err();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn text_does_not_bind_to_numeric_columns() {
        let err = bind(&Value::Utf8("abc".to_string()), &Type::INT4).unwrap_err();
        assert!(err.contains("cannot store"));
        assert!(bind(&Value::Utf8("O'Hara".to_string()), &Type::VARCHAR).is_ok());
    }

    #[test]
    fn dates_bind_to_date_timestamp_and_text() {
        let d = Value::Date(NaiveDate::from_ymd_opt(2021, 6, 15).unwrap());
        assert!(bind(&d, &Type::DATE).is_ok());
        assert!(bind(&d, &Type::TIMESTAMP).is_ok());
        let (_, bytes) = bind(&d, &Type::TEXT).unwrap();
        assert_eq!(bytes, b"2021-06-15".to_vec());
        assert!(bind(&d, &Type::INT4).is_err());
    }

    #[test]
    fn whole_floats_bind_to_integer_columns() {
        let (is_null, bytes) = bind(&Value::Float64(3.0), &Type::INT8).unwrap();
        assert!(!is_null);
        assert_eq!(bytes, 3_i64.to_be_bytes().to_vec());
        assert!(bind(&Value::Float64(3.5), &Type::INT8).is_err());
    }

    #[test]
    fn floats_outside_the_integer_range_are_rejected() {
        assert!(bind(&Value::Float64(1e20), &Type::INT8).is_err());
        assert!(bind(&Value::Float64(-1e20), &Type::INT8).is_err());
        assert!(bind(&Value::Float64(f64::NAN), &Type::INT8).is_err());
        assert!(bind(&Value::Float64(70_000.0), &Type::INT2).is_err());
        let (_, bytes) = bind(&Value::Float64(-9_223_372_036_854_775_808.0), &Type::INT8).unwrap();
        assert_eq!(bytes, i64::MIN.to_be_bytes().to_vec());
    }

    #[test]
    fn floats_too_large_for_real_columns_are_rejected() {
        assert!(bind(&Value::Float64(1e300), &Type::FLOAT4).unwrap_err().contains("cannot store"));
        let (_, bytes) = bind(&Value::Float64(1.5), &Type::FLOAT4).unwrap();
        assert_eq!(bytes, 1.5_f32.to_be_bytes().to_vec());
        assert!(bind(&Value::Float64(f64::INFINITY), &Type::FLOAT4).is_ok());
    }
}
