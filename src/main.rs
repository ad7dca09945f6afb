//! csvxl-pg-loader CLI - load a CSV or spreadsheet file into a PostgreSQL table.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use csvxl_pg_loader::db::InsertMode;
use csvxl_pg_loader::ingestion::ExcelSheetSelection;
use csvxl_pg_loader::pipeline::{CompositeObserver, FileObserver, LoadObserver, StdOutObserver};
use csvxl_pg_loader::{LoadConfig, Loader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csvxl-pg-loader")]
#[command(about = "Load a CSV or spreadsheet file into a PostgreSQL table")]
#[command(version)]
struct Cli {
    /// Input file (.csv, .xlsx, .xls, .xlsm, .xlsb, .ods)
    file: PathBuf,

    /// Target table (spaces and hyphens become underscores)
    #[arg(short, long)]
    table: String,

    /// Database server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Database server port
    #[arg(short, long, default_value_t = csvxl_pg_loader::db::DEFAULT_PORT)]
    port: u16,

    /// Target database, created if missing
    #[arg(short, long)]
    database: String,

    #[arg(short, long, default_value = "postgres")]
    username: String,

    #[arg(long, env = "PGPASSWORD", hide_env_values = true, default_value = "")]
    password: String,

    /// Insert this many rows per statement instead of one
    #[arg(long)]
    insert_batch_size: Option<usize>,

    /// Worksheet to read (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Also append status lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the load report as JSON to stdout
    #[arg(long)]
    output_json: bool,

    /// Log verbosity: debug, info, warn, error (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    verbosity: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.verbosity);

    let Ok(delimiter) = u8::try_from(cli.delimiter) else {
        eprintln!("Error: delimiter must be a single-byte character, got {:?}", cli.delimiter);
        return ExitCode::from(2);
    };

    let mut config = LoadConfig::new(
        &cli.file,
        &cli.table,
        &cli.host,
        &cli.database,
        &cli.username,
        &cli.password,
    )
    .with_port(cli.port);
    if let Some(rows_per_statement) = cli.insert_batch_size {
        config = config.with_insert_mode(InsertMode::Batched { rows_per_statement });
    }
    config.ingestion.delimiter = delimiter;
    if let Some(sheet) = cli.sheet {
        config.ingestion.excel_sheet_selection = ExcelSheetSelection::Sheet(sheet);
    }

    let mut observers: Vec<Arc<dyn LoadObserver>> = vec![Arc::new(StdOutObserver)];
    if let Some(path) = &cli.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    info!(file = %cli.file.display(), table = %cli.table, "starting load");

    let loader = Loader::new(config).with_observer(Arc::new(CompositeObserver::new(observers)));
    match loader.run().await {
        Ok(report) => {
            if cli.output_json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("Error: unable to serialize load report: {e}"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn setup_logging(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("csvxl_pg_loader={}", verbosity.to_lowercase())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
