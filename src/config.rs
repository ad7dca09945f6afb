//! Run configuration.

use std::path::PathBuf;

use crate::db::{ConnectParams, InsertMode, DEFAULT_PORT};
use crate::ingestion::IngestionOptions;
use crate::schema::normalize_identifier;

/// Everything a [`crate::pipeline::Loader`] needs for one run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Input file (`.csv` or a spreadsheet extension).
    pub file: PathBuf,
    /// Target table name as given; see [`LoadConfig::table_identifier`].
    pub table: String,
    /// Server, target database and credentials.
    pub connection: ConnectParams,
    pub insert_mode: InsertMode,
    pub ingestion: IngestionOptions,
}

impl LoadConfig {
    /// Configuration with the default port, row-by-row inserts and default ingestion options.
    pub fn new(
        file: impl Into<PathBuf>,
        table: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            table: table.into(),
            connection: ConnectParams {
                host: host.into(),
                port: DEFAULT_PORT,
                database: database.into(),
                username: username.into(),
                password: password.into(),
            },
            insert_mode: InsertMode::default(),
            ingestion: IngestionOptions::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.connection.port = port;
        self
    }

    pub fn with_insert_mode(mut self, mode: InsertMode) -> Self {
        self.insert_mode = mode;
        self
    }

    pub fn with_ingestion_options(mut self, options: IngestionOptions) -> Self {
        self.ingestion = options;
        self
    }

    /// Table name as used in SQL: spaces and hyphens become underscores.
    pub fn table_identifier(&self) -> String {
        normalize_identifier(&self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_port_5432_and_row_by_row() {
        let cfg = LoadConfig::new("people.csv", "new-hires 2024", "localhost", "hr", "u", "p");
        assert_eq!(cfg.connection.port, 5432);
        assert_eq!(cfg.insert_mode, InsertMode::RowByRow);
        assert_eq!(cfg.table_identifier(), "new_hires_2024");
        assert_eq!(cfg.with_port(6543).connection.port, 6543);
    }
}
