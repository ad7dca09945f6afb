//! Mapping from inferred column types to PostgreSQL column types.
//!
//! The mapping is closed: text, float, int and date have a target type, everything else makes
//! [`infer_column_schema`] fail for the whole table.

use std::fmt;

use serde::Serialize;

use crate::error::{LoadError, LoadResult};
use crate::types::{InferredType, InputTable};

/// Target database column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlType {
    Varchar200,
    Float,
    Int,
    Date,
}

impl SqlType {
    /// Look up the target type for an inferred type.
    pub fn from_inferred(ty: InferredType) -> Option<Self> {
        match ty {
            InferredType::Text => Some(Self::Varchar200),
            InferredType::Float => Some(Self::Float),
            InferredType::Int => Some(Self::Int),
            InferredType::Date => Some(Self::Date),
            InferredType::Bool => None,
        }
    }

    /// DDL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Varchar200 => "VARCHAR(200)",
            Self::Float => "FLOAT",
            Self::Int => "INT",
            Self::Date => "DATE",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One column of the table to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Identifier-normalized column name (unquoted).
    pub name: String,
    pub sql_type: SqlType,
}

/// Ordered column definitions derived from an [`InputTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub columns: Vec<ColumnDef>,
}

impl ColumnSchema {
    /// Render the column list of a `CREATE TABLE`: `"a" INT, "b" DATE`.
    pub fn column_definitions(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Derive the target column schema, failing if any column type has no mapping.
pub fn infer_column_schema(table: &InputTable) -> LoadResult<ColumnSchema> {
    let unmapped: Vec<(String, InferredType)> = table
        .schema
        .fields
        .iter()
        .filter(|f| SqlType::from_inferred(f.inferred_type).is_none())
        .map(|f| (f.name.clone(), f.inferred_type))
        .collect();
    if !unmapped.is_empty() {
        return Err(LoadError::TypeMapping { columns: unmapped });
    }

    let columns = table
        .schema
        .fields
        .iter()
        .filter_map(|f| {
            SqlType::from_inferred(f.inferred_type).map(|sql_type| ColumnDef {
                name: normalize_identifier(&f.name),
                sql_type,
            })
        })
        .collect();
    Ok(ColumnSchema { columns })
}

/// Replace spaces and hyphens with underscores.
pub fn normalize_identifier(name: &str) -> String {
    name.replace([' ', '-'], "_")
}

/// Quote a PostgreSQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE "<table>" (<columns>)`.
pub fn create_table_sql(table: &str, schema: &ColumnSchema) -> String {
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        schema.column_definitions()
    )
}
