//! PostgreSQL side of the pipeline: connections, provisioning and row loading.

pub mod connection;
pub mod loader;
pub mod provision;

pub use connection::{ConnectParams, ConnectionMode, PgConnection, Session, ADMIN_DATABASE, DEFAULT_PORT};
pub use loader::{insert_rows, table_columns, InsertMode};
pub use provision::{ensure_database, ensure_table, Provisioned};
