pub mod backend;
pub mod config;
pub mod connection;
pub mod result;
pub mod runner;
pub mod runner_postgresql;
pub mod runner_sqlite;
pub mod table;

// Re-export types for convenience
pub use backend::Backend;
pub use config::{QueryDbConfig, load_config};
pub use connection::{
    ConnectOptions, DatabaseConnection, db_connect, postgres_connect, postgres_connect_options,
    sqlite3_connect,
};
pub use result::{QueryDbError, Result};
pub use runner::QueryRunner;
pub use table::ResultTable;

// Cell type of every ResultTable row
pub use serde_json::Value as JsonValue;

// Native handle held by DatabaseConnection::SQLite, for callers pinned to another rusqlite
pub use rusqlite::Connection as SqliteConnection;
