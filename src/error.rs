use thiserror::Error;

use crate::types::InferredType;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for load pipeline stages.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared across CSV and (optional) spreadsheet ingestion.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet ingestion error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV ingestion error (malformed or ragged records, bad UTF-8, ...).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The path does not name a supported tabular format.
    #[error("invalid file format: {message}")]
    UnsupportedFormat { message: String },

    /// The input has no usable header/columns, or a requested sheet is absent.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },
}

/// Error returned by a stage of the load pipeline.
///
/// Each variant corresponds to the stage that produced it; the pipeline stops at the first one.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file could not be read or has an unsupported format.
    #[error("unable to read input file: {0}")]
    FileFormat(#[from] IngestionError),

    /// One or more columns have an inferred type with no database mapping.
    #[error("no mapping for 1 or more data types: {}", describe_unmapped(.columns))]
    TypeMapping { columns: Vec<(String, InferredType)> },

    /// The database server could not be reached or rejected the credentials.
    #[error("unable to connect to db server {host}:{port}/{database}: {}", pg_cause(.source))]
    Connection {
        host: String,
        port: u16,
        database: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Database or table lookup/creation failed.
    #[error("unable to provision {object}: {}\n{statement}", pg_cause(.source))]
    Provisioning {
        object: String,
        statement: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// A row could not be inserted; the transaction was rolled back.
    #[error("inserted {inserted} of {total}, insertion not completed{}: {}", describe_row(.row), pg_cause(.source))]
    Insertion {
        inserted: usize,
        total: usize,
        /// 1-based data row being inserted, `None` for transaction begin/commit failures.
        row: Option<usize>,
        #[source]
        source: tokio_postgres::Error,
    },
}

impl LoadError {
    /// Create a Provisioning error for `object` (e.g. `database sales`).
    pub fn provisioning(
        object: impl Into<String>,
        statement: impl Into<String>,
        source: tokio_postgres::Error,
    ) -> Self {
        LoadError::Provisioning {
            object: object.into(),
            statement: statement.into(),
            source,
        }
    }

    /// Short stage label used in status output.
    pub fn stage(&self) -> &'static str {
        match self {
            LoadError::FileFormat(_) => "read input file",
            LoadError::TypeMapping { .. } => "parse input data types",
            LoadError::Connection { .. } => "connect",
            LoadError::Provisioning { .. } => "provision",
            LoadError::Insertion { .. } => "insert records",
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::FileFormat(_) => 2,
            LoadError::TypeMapping { .. } => 3,
            LoadError::Connection { .. } => 4,
            LoadError::Provisioning { .. } => 5,
            LoadError::Insertion { .. } => 6,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Render a driver error with its underlying cause.
///
/// Server-side failures display only as `db error`; the server's message (severity, message,
/// detail, hint) is used instead. Other errors get their source chain appended.
pub fn pg_cause(error: &tokio_postgres::Error) -> String {
    if let Some(db) = error.as_db_error() {
        return db.to_string();
    }
    let mut out = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

fn describe_row(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {row}"),
        None => String::new(),
    }
}

fn describe_unmapped(columns: &[(String, InferredType)]) -> String {
    columns
        .iter()
        .map(|(name, ty)| format!("'{name}' ({ty})"))
        .collect::<Vec<_>>()
        .join(", ")
}
