//! Core data model types for ingestion.
//!
//! Ingestion reads a file into an in-memory [`InputTable`]: an ordered [`Schema`] of typed
//! [`Field`]s plus row-major [`Value`] storage. Field types are inferred from the file content.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Type inferred for a column from its non-missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InferredType {
    /// Text, or a mix of value kinds.
    Text,
    /// 64-bit floating point (also: integers mixed with floats, or an all-missing column).
    Float,
    /// 64-bit signed integer.
    Int,
    /// Calendar date.
    Date,
    /// Boolean. Has no database mapping.
    Bool,
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Float => "float",
            Self::Int => "int",
            Self::Date => "date",
            Self::Bool => "bool",
        };
        f.write_str(s)
    }
}

/// A single named, typed column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name exactly as it appears in the file header.
    pub name: String,
    /// Inferred column type.
    pub inferred_type: InferredType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, inferred_type: InferredType) -> Self {
        Self {
            name: name.into(),
            inferred_type,
        }
    }
}

/// Ordered list of fields describing the shape of an [`InputTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in an [`InputTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value. Inserted as SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(v) => f.write_str(v),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

/// In-memory table read from the input file.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. Every value in
/// a column matches the column's [`InferredType`] or is [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct InputTable {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl InputTable {
    /// Create a table from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the table.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Iterate the values of one column, top to bottom.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_values_walks_one_column() {
        let table = InputTable::new(
            Schema::new(vec![
                Field::new("id", InferredType::Int),
                Field::new("name", InferredType::Text),
            ]),
            vec![
                vec![Value::Int64(1), Value::Utf8("Ann".to_string())],
                vec![Value::Int64(2), Value::Null],
            ],
        );

        let names: Vec<&Value> = table.column_values(1).collect();
        assert_eq!(names, vec![&Value::Utf8("Ann".to_string()), &Value::Null]);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.schema.index_of("name"), Some(1));
    }

    #[test]
    fn date_values_display_iso() {
        let d = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2021-06-15");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
