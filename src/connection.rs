use crate::{
    backend::Backend,
    config,
    result::Result,
    runner::QueryRunner,
    runner_postgresql::{self, PostgresClient},
    runner_sqlite,
    table::ResultTable,
};
use serde::{Deserialize, Serialize};

/// Connection parameters, passed through verbatim to the selected driver.
///
/// SQLite only reads `path`; PostgreSQL reads everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// SQLite database file, or `:memory:`
    pub path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub dbname: Option<String>,
    /// libpq-style connection string; explicit fields take precedence over it
    pub connection_string: Option<String>,
}

impl ConnectOptions {
    /// Options for a SQLite database at `path`
    pub fn sqlite(path: impl Into<String>) -> Self {
        ConnectOptions {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Fill every unset field from `base`
    pub fn merged_over(&self, base: &ConnectOptions) -> ConnectOptions {
        ConnectOptions {
            path: self.path.clone().or_else(|| base.path.clone()),
            host: self.host.clone().or_else(|| base.host.clone()),
            port: self.port.or(base.port),
            user: self.user.clone().or_else(|| base.user.clone()),
            password: self.password.clone().or_else(|| base.password.clone()),
            dbname: self.dbname.clone().or_else(|| base.dbname.clone()),
            connection_string: self
                .connection_string
                .clone()
                .or_else(|| base.connection_string.clone()),
        }
    }
}

/// Database connection enum that holds different database backends
pub enum DatabaseConnection {
    /// SQLite connection
    SQLite(rusqlite::Connection),
    /// PostgreSQL client driven on its own blocking runtime
    PostgreSQL(PostgresClient),
}

impl DatabaseConnection {
    /// Open a native handle for `backend`
    pub fn open(backend: Backend, options: &ConnectOptions) -> Result<Self> {
        match backend {
            Backend::Sqlite => runner_sqlite::connect_sqlite(options).map(DatabaseConnection::SQLite),
            Backend::Postgresql => {
                runner_postgresql::connect_postgresql(options).map(DatabaseConnection::PostgreSQL)
            }
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            DatabaseConnection::SQLite(_) => Backend::Sqlite,
            DatabaseConnection::PostgreSQL(_) => Backend::Postgresql,
        }
    }

    /// Release the native handle. Consuming `self` guarantees this happens once;
    /// a connection dropped without `close` is released by its destructor instead.
    pub fn close(self) -> Result<()> {
        match self {
            DatabaseConnection::SQLite(conn) => runner_sqlite::close_sqlite(conn),
            DatabaseConnection::PostgreSQL(client) => client.close(),
        }
    }
}

impl QueryRunner for DatabaseConnection {
    fn fetch_all_with_count(&mut self, sql: &str) -> Result<(ResultTable, u64)> {
        match self {
            DatabaseConnection::SQLite(conn) => runner_sqlite::fetch_all_sqlite(conn, sql),
            DatabaseConnection::PostgreSQL(client) => {
                runner_postgresql::fetch_all_postgresql(client, sql)
            }
        }
    }
}

/// Open a connection for the named backend, hand it to `scope`, and release it
/// when `scope` returns, whether it succeeded or failed.
///
/// The backend name is validated before any file or network I/O. A panic inside
/// `scope` still releases the handle while unwinding.
pub fn db_connect<T, F>(backend: &str, options: &ConnectOptions, scope: F) -> Result<T>
where
    F: FnOnce(&mut DatabaseConnection) -> Result<T>,
{
    let backend: Backend = backend.parse()?;
    let mut conn = DatabaseConnection::open(backend, options)?;
    tracing::debug!(%backend, "connection opened");

    let outcome = scope(&mut conn);
    let closed = conn.close();

    match outcome {
        Ok(value) => {
            closed?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(%backend, error = %err, "query scope failed");
            if let Err(close_err) = closed {
                tracing::warn!(%backend, error = %close_err, "failed to close connection");
            }
            Err(err)
        }
    }
}

/// `db_connect` bound to the SQLite backend
pub fn sqlite3_connect<T, F>(path: &str, scope: F) -> Result<T>
where
    F: FnOnce(&mut DatabaseConnection) -> Result<T>,
{
    db_connect(Backend::Sqlite.name(), &ConnectOptions::sqlite(path), scope)
}

/// Fill unset fields of `options` from the process configuration (`.env` and
/// `QUERYDB_*` environment variables), which is read on first use only.
pub fn postgres_connect_options(options: &ConnectOptions) -> Result<ConnectOptions> {
    static CONFIGURED: once_cell::sync::OnceCell<ConnectOptions> = once_cell::sync::OnceCell::new();

    let configured = CONFIGURED.get_or_try_init(|| {
        config::load_config(None).map(|cfg| cfg.connect_options())
    })?;
    Ok(options.merged_over(configured))
}

/// `db_connect` bound to the PostgreSQL backend, with unset fields taken from
/// [`postgres_connect_options`]
pub fn postgres_connect<T, F>(options: &ConnectOptions, scope: F) -> Result<T>
where
    F: FnOnce(&mut DatabaseConnection) -> Result<T>,
{
    let merged = postgres_connect_options(options)?;
    db_connect(Backend::Postgresql.name(), &merged, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::QueryDbError;

    #[test]
    fn test_merged_over_prefers_explicit_values() {
        let base = ConnectOptions {
            host: Some("configured".to_string()),
            port: Some(5432),
            user: Some("config_user".to_string()),
            ..Default::default()
        };
        let explicit = ConnectOptions {
            host: Some("explicit".to_string()),
            ..Default::default()
        };

        let merged = explicit.merged_over(&base);
        assert_eq!(merged.host.as_deref(), Some("explicit"));
        assert_eq!(merged.port, Some(5432));
        assert_eq!(merged.user.as_deref(), Some("config_user"));
        assert!(merged.password.is_none());
    }

    #[test]
    fn test_open_reports_backend() {
        let conn = DatabaseConnection::open(Backend::Sqlite, &ConnectOptions::sqlite(":memory:"))
            .unwrap();
        assert_eq!(conn.backend(), Backend::Sqlite);
        conn.close().unwrap();
    }

    #[test]
    fn test_unsupported_backend_never_runs_scope() {
        let mut ran = false;
        let result = db_connect("mysql", &ConnectOptions::sqlite(":memory:"), |_| {
            ran = true;
            Ok(())
        });
        assert!(matches!(result, Err(QueryDbError::UnsupportedBackend(_))));
        assert!(!ran);
    }
}
