//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which auto-detects the format
//! by file extension (or takes an override via [`IngestionOptions`]) and reads the file into an
//! in-memory [`crate::types::InputTable`].
//!
//! ## Type inference
//!
//! Column types are inferred from the non-missing values of each column:
//!
//! - all integers → [`crate::types::InferredType::Int`] (missing values do not promote to float)
//! - integers and floats → [`crate::types::InferredType::Float`]
//! - all `true`/`false` → [`crate::types::InferredType::Bool`]
//! - all dates (`2020-01-31`, `2020/01/31`, `01/31/2020`, optionally with a time) →
//!   [`crate::types::InferredType::Date`]
//! - no values at all → [`crate::types::InferredType::Float`] (a header-only file reads as
//!   [`crate::types::InferredType::Text`])
//! - anything else → [`crate::types::InferredType::Text`]
//!
//! Empty cells and the markers in [`DEFAULT_NA_VALUES`] become [`crate::types::Value::Null`].
//!
//! Format-specific functions are also available under [`csv`] and (feature `excel`) `excel`.

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
mod infer;
pub mod unified;

pub use infer::{default_na_values, DEFAULT_NA_VALUES};
pub use unified::{ingest_from_path, infer_format_from_path, ExcelSheetSelection, IngestionFormat, IngestionOptions};
