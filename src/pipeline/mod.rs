//! The load pipeline.
//!
//! [`Loader::run`] executes the stages in order and stops at the first failure:
//!
//! 1. read the input file into an [`InputTable`]
//! 2. map its column types to a [`ColumnSchema`]
//! 3. connect (to the administrative database when the host is local)
//! 4. reuse or create the target database, then reconnect to it
//! 5. reuse or create the target table
//! 6. insert all rows in one transaction
//!
//! Whatever happens, an open connection is closed exactly once before `run` returns. Progress
//! is reported to a [`LoadObserver`] (stdout status lines by default).

mod observability;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::LoadConfig;
use crate::db::{self, InsertMode, Provisioned, Session};
use crate::error::LoadResult;
use crate::ingestion::{self, IngestionFormat, IngestionOptions};
use crate::schema::{infer_column_schema, ColumnSchema};
use crate::types::InputTable;

pub use observability::{
    status_line, CompositeObserver, FileObserver, LoadEvent, LoadObserver, NoopObserver, StdOutObserver,
};

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub file: PathBuf,
    #[serde(serialize_with = "serialize_format")]
    pub format: IngestionFormat,
    pub database: String,
    pub database_status: Provisioned,
    pub table: String,
    pub table_status: Provisioned,
    pub columns: ColumnSchema,
    pub insert_mode: InsertMode,
    pub rows_read: usize,
    pub rows_inserted: usize,
}

fn serialize_format<S: serde::Serializer>(format: &IngestionFormat, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format.to_string())
}

/// Runs one file-to-table load.
pub struct Loader {
    config: LoadConfig,
    observer: Arc<dyn LoadObserver>,
}

impl Loader {
    /// Loader reporting to stdout.
    pub fn new(config: LoadConfig) -> Self {
        Self {
            config,
            observer: Arc::new(StdOutObserver),
        }
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Run the whole pipeline.
    pub async fn run(&self) -> LoadResult<LoadReport> {
        let mut session = Session::new();
        let result = self.run_stages(&mut session).await;

        if let Err(error) = &result {
            self.emit(LoadEvent::Failed { error });
        }
        if session.close().await {
            self.emit(LoadEvent::ConnectionClosed);
        }
        self.emit(LoadEvent::Finished {
            success: result.is_ok(),
        });

        match &result {
            Ok(report) => info!(
                table = %report.table,
                rows = report.rows_inserted,
                "load complete"
            ),
            Err(e) => debug!(stage = e.stage(), "load failed: {e}"),
        }
        result
    }

    async fn run_stages(&self, session: &mut Session) -> LoadResult<LoadReport> {
        let (format, input) = self.read_input()?;
        let columns = self.infer_schema(&input)?;

        let params = &self.config.connection;
        let admin = session.connect(params).await?;
        self.emit(LoadEvent::Connected {
            host: &params.host,
            port: params.port,
            database: admin.database(),
        });

        let database_status = db::ensure_database(admin, &params.database).await?;
        self.emit(LoadEvent::Database {
            name: &params.database,
            status: database_status,
        });

        let conn = session.reconnect_target(params).await?;
        let table = self.config.table_identifier();
        let table_status = db::ensure_table(conn, &table, &columns).await?;
        self.emit(LoadEvent::Table {
            name: &table,
            status: table_status,
        });

        let table_columns = db::table_columns(conn, &table).await?;
        self.emit(LoadEvent::InsertStarted {
            table: &table,
            total: input.row_count(),
        });
        let rows_inserted = db::insert_rows(conn, &table, &table_columns, &input, self.config.insert_mode).await?;
        self.emit(LoadEvent::InsertFinished {
            inserted: rows_inserted,
            total: input.row_count(),
        });

        Ok(LoadReport {
            file: self.config.file.clone(),
            format,
            database: params.database.clone(),
            database_status,
            table,
            table_status,
            columns,
            insert_mode: self.config.insert_mode,
            rows_read: input.row_count(),
            rows_inserted,
        })
    }

    fn read_input(&self) -> LoadResult<(IngestionFormat, InputTable)> {
        let path = self.config.file.as_path();
        let format = match self.config.ingestion.format {
            Some(f) => f,
            None => ingestion::infer_format_from_path(path)?,
        };
        let options = IngestionOptions {
            format: Some(format),
            ..self.config.ingestion.clone()
        };

        let input = ingestion::ingest_from_path(path, &options)?;
        self.emit(LoadEvent::InputRead {
            path,
            format,
            rows: input.row_count(),
            columns: input.column_count(),
        });
        Ok((format, input))
    }

    fn infer_schema(&self, input: &InputTable) -> LoadResult<ColumnSchema> {
        let columns = infer_column_schema(input)?;
        debug!(columns = %columns.column_definitions(), "column schema");
        self.emit(LoadEvent::SchemaInferred { schema: &columns });
        Ok(columns)
    }

    fn emit(&self, event: LoadEvent<'_>) {
        self.observer.on_event(&event);
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader").field("config", &self.config).finish()
    }
}

/// Run one load reporting to stdout; `true` if every stage succeeded.
pub async fn load_to_db(config: LoadConfig) -> bool {
    Loader::new(config).run().await.is_ok()
}
