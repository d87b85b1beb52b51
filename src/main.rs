//! querydb - run SQL statements against SQLite or PostgreSQL and print the results.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use querydb::{ConnectOptions, QueryRunner, ResultTable, db_connect, load_config};
use std::path::PathBuf;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Aligned text grid
    Table,
    /// JSON array of row objects
    Json,
}

/// Run SQL statements inside one scoped database connection.
#[derive(Debug, Parser)]
#[command(name = "querydb", version, about)]
struct Cli {
    /// Configuration file path (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format: plain (default) or json.
    #[arg(long, default_value = "plain", value_parser = ["plain", "json"])]
    log_format: String,

    /// Backend: sqlite3 or postgresql (case-insensitive).
    #[arg(short, long)]
    backend: Option<String>,

    /// SQLite database file, or :memory:.
    #[arg(long)]
    path: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    dbname: Option<String>,

    /// libpq-style connection string, e.g. "host=localhost user=postgres".
    #[arg(long)]
    connection_string: Option<String>,

    /// How to print result tables.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Also print the returned or affected row count of each statement.
    #[arg(long)]
    count: bool,

    /// SQL statements, executed in order, one statement per argument.
    #[arg(required = true)]
    sql: Vec<String>,
}

impl Cli {
    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            path: self.path.clone(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            dbname: self.dbname.clone(),
            connection_string: self.connection_string.clone(),
        }
    }
}

fn init_tracing(verbose: u8, log_format: &str) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    match log_format {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    };
}

fn print_table(table: &ResultTable, format: OutputFormat) -> querydb::Result<()> {
    match format {
        OutputFormat::Table => println!("{table}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table.to_records())?),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, &cli.log_format);

    let config = load_config(cli.config.as_deref()).context("loading configuration")?;
    let backend = cli
        .backend
        .clone()
        .or_else(|| config.backend.clone())
        .context("no backend given: pass --backend or set QUERYDB_BACKEND")?;
    let options = cli.connect_options().merged_over(&config.connect_options());

    tracing::info!(%backend, statements = cli.sql.len(), "running statements");

    db_connect(&backend, &options, |conn| {
        for sql in &cli.sql {
            let (table, count) = conn.fetch_all_with_count(sql)?;
            print_table(&table, cli.format)?;
            if cli.count {
                println!("row count: {count}");
            }
        }
        Ok(())
    })?;

    Ok(())
}
