use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::Provisioned;
use crate::error::{pg_cause, LoadError};
use crate::ingestion::IngestionFormat;
use crate::schema::ColumnSchema;

/// Progress events emitted by [`super::Loader::run`], in pipeline order.
#[derive(Debug, Clone, Copy)]
pub enum LoadEvent<'a> {
    InputRead {
        path: &'a Path,
        format: IngestionFormat,
        rows: usize,
        columns: usize,
    },
    SchemaInferred {
        schema: &'a ColumnSchema,
    },
    Connected {
        host: &'a str,
        port: u16,
        database: &'a str,
    },
    Database {
        name: &'a str,
        status: Provisioned,
    },
    Table {
        name: &'a str,
        status: Provisioned,
    },
    InsertStarted {
        table: &'a str,
        total: usize,
    },
    InsertFinished {
        inserted: usize,
        total: usize,
    },
    /// A stage failed; no later stage runs.
    Failed {
        error: &'a LoadError,
    },
    ConnectionClosed,
    Finished {
        success: bool,
    },
}

/// Observer interface for load progress.
///
/// Implementors can print status, write logs, or record events for tests.
pub trait LoadObserver: Send + Sync {
    fn on_event(&self, event: &LoadEvent<'_>);
}

/// Human-readable status line(s) for an event.
pub fn status_line(event: &LoadEvent<'_>) -> String {
    match *event {
        LoadEvent::InputRead { .. } => "INPUT FILE READ SUCCESSFUL".to_string(),
        LoadEvent::SchemaInferred { .. } => "INPUT DATA TYPES PARSE SUCCESSFUL".to_string(),
        LoadEvent::Connected { .. } => "DB SERVER CONNECTION SUCCESSFUL".to_string(),
        LoadEvent::Database { name, status: Provisioned::Existing } => {
            format!("DATABASE {name} ALREADY EXISTS. HENCE USING THE EXISTING DATABASE")
        }
        LoadEvent::Database { name, status: Provisioned::Created } => {
            format!("SUCCESSFULLY CREATED DATABASE NAMED {name}")
        }
        LoadEvent::Table { name, status: Provisioned::Existing } => {
            format!("TABLE {name} ALREADY EXISTS. HENCE USING THE EXISTING TABLE")
        }
        LoadEvent::Table { name, status: Provisioned::Created } => {
            format!("SUCCESSFULLY CREATED TABLE NAMED {name}")
        }
        LoadEvent::InsertStarted { .. } => {
            "BEGAN INSERTING RECORDS INTO DATABASE. IT MAY TAKE TIME FOR REMOTE CONNECTIONS.".to_string()
        }
        LoadEvent::InsertFinished { inserted, total } => {
            format!("INSERTED {inserted} OF {total} RECORDS\nINSERTION SUCCESSFUL")
        }
        LoadEvent::Failed { error } => failure_line(error),
        LoadEvent::ConnectionClosed => "DB CONNECTION CLOSED".to_string(),
        LoadEvent::Finished { success: true } => "TASK COMPLETE".to_string(),
        LoadEvent::Finished { success: false } => "TASK INCOMPLETE".to_string(),
    }
}

fn failure_line(error: &LoadError) -> String {
    match error {
        LoadError::FileFormat(e) => format!("UNABLE TO READ INPUT FILE\nReason: {e}"),
        LoadError::TypeMapping { .. } => format!("UNABLE TO PARSE INPUT FILE DATA TYPES\nReason: {error}"),
        LoadError::Connection { source, .. } => {
            format!("UNABLE TO CONNECT TO DB SERVER\nREASON: {}", pg_cause(source))
        }
        LoadError::Provisioning {
            object,
            statement,
            source,
        } => format!(
            "UNABLE TO PROVISION {}\nREASON: {}\n{statement}",
            object.to_uppercase(),
            pg_cause(source)
        ),
        LoadError::Insertion {
            inserted,
            total,
            source,
            ..
        } => format!(
            "ERROR: INSERTED {inserted} OF {total}\nINSERTION NOT COMPLETED\nREASON: {}\nROLLING BACK",
            pg_cause(source)
        ),
    }
}

/// An observer that fans out events to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_event(&self, event: &LoadEvent<'_>) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Prints status lines to stdout.
#[derive(Debug, Default)]
pub struct StdOutObserver;

impl LoadObserver for StdOutObserver {
    fn on_event(&self, event: &LoadEvent<'_>) {
        println!("{}", status_line(event));
    }
}

/// Discards all events.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {
    fn on_event(&self, _event: &LoadEvent<'_>) {}
}

/// Appends status lines to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_event(&self, event: &LoadEvent<'_>) {
        let ts = unix_ts();
        let detail = match *event {
            LoadEvent::InputRead {
                path,
                format,
                rows,
                columns,
            } => format!(" path={} format={format} rows={rows} columns={columns}", path.display()),
            LoadEvent::Connected { host, port, database } => format!(" target={host}:{port}/{database}"),
            _ => String::new(),
        };
        for (idx, line) in status_line(event).lines().enumerate() {
            if idx == 0 {
                self.append_line(&format!("{ts} {line}{detail}"));
            } else {
                self.append_line(&format!("{ts}   {line}"));
            }
        }
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_summary_matches_the_status_format() {
        let line = status_line(&LoadEvent::InsertFinished { inserted: 2, total: 2 });
        assert_eq!(line, "INSERTED 2 OF 2 RECORDS\nINSERTION SUCCESSFUL");
    }

    #[test]
    fn file_observer_appends_timestamped_lines() {
        let path = std::env::temp_dir().join(format!("csvxl-pg-loader-observer-{}.log", unix_ts()));
        let _ = std::fs::remove_file(&path);
        let obs = FileObserver::new(&path);

        obs.on_event(&LoadEvent::Table {
            name: "people",
            status: Provisioned::Created,
        });
        obs.on_event(&LoadEvent::Finished { success: true });

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("SUCCESSFULLY CREATED TABLE NAMED people"));
        assert!(lines[1].ends_with("TASK COMPLETE"));
        let _ = std::fs::remove_file(&path);
    }
}
