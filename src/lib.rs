//! `csvxl-pg-loader` loads a CSV file or a spreadsheet into a PostgreSQL table.
//!
//! A run reads the file into an in-memory [`types::InputTable`], infers a column type for every
//! column, maps those to PostgreSQL types, creates the target database and table when they do
//! not exist, and inserts every row inside one transaction. The table ends up with either all
//! of the rows or none of them.
//!
//! ## Stages
//!
//! 1. **Read** ([`ingestion`]): format auto-detected by extension.
//!    - **CSV**: `.csv`
//!    - **Spreadsheets** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`,
//!      `.ods`
//! 2. **Infer schema** ([`schema`]): a closed mapping
//!
//!    | Inferred type | Column type |
//!    |---|---|
//!    | text / mixed | `VARCHAR(200)` |
//!    | float | `FLOAT` |
//!    | int | `INT` |
//!    | date | `DATE` |
//!
//!    Any other type (booleans) fails the run before the database is touched.
//! 3. **Connect / provision** ([`db`]): a local host is reached through the `postgres` database
//!    first, the target database is created if missing, then the run reconnects to it.
//! 4. **Load** ([`db::loader`]): one bound-parameter `INSERT` per row (or batched, see
//!    [`db::InsertMode`]), committed only if every row succeeds.
//!
//! ## Quick example
//!
//! ```no_run
//! use csvxl_pg_loader::{LoadConfig, Loader};
//!
//! # async fn demo() -> Result<(), csvxl_pg_loader::LoadError> {
//! let config = LoadConfig::new("people.csv", "people", "localhost", "hr", "postgres", "secret");
//! let report = Loader::new(config).run().await?;
//! println!("inserted {} rows into {}", report.rows_inserted, report.table);
//! # Ok(())
//! # }
//! ```
//!
//! Reading a file without touching a database:
//!
//! ```no_run
//! use csvxl_pg_loader::ingestion::{ingest_from_path, IngestionOptions};
//! use csvxl_pg_loader::schema::infer_column_schema;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = ingest_from_path("people.csv", &IngestionOptions::default())?;
//! let columns = infer_column_schema(&table)?;
//! println!("{}", columns.column_definitions());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: format detection and CSV/spreadsheet readers with type inference
//! - [`types`]: in-memory table types
//! - [`schema`]: inferred type → column type mapping and DDL
//! - [`db`]: connections, provisioning and row loading
//! - [`pipeline`]: the orchestrating [`Loader`] and its status observers
//! - [`config`]: run configuration
//! - [`error`]: error types

pub mod config;
pub mod db;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod schema;
pub mod types;

pub use config::LoadConfig;
pub use error::{IngestionError, IngestionResult, LoadError, LoadResult};
pub use pipeline::{LoadReport, Loader};
