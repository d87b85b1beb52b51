use thiserror::Error;

/// Main error type for the querydb library
#[derive(Error, Debug)]
pub enum QueryDbError {
    #[error("Unsupported backend '{0}': only SQLite3 and Postgres connections are implemented")]
    UnsupportedBackend(String),
    #[error("Connection parameter not provided: {0}")]
    MissingParameter(String),
    #[error("Column width mismatch: expected {expected} values per row, got {got}")]
    ColumnWidthMismatch { expected: usize, got: usize },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryDbError {
    /// True when the error was raised by a database driver while opening,
    /// executing or closing, as opposed to a setup or configuration problem.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, QueryDbError::Sqlite(_) | QueryDbError::Postgres(_))
    }
}

impl From<figment::Error> for QueryDbError {
    fn from(err: figment::Error) -> Self {
        QueryDbError::Config(err.to_string())
    }
}

/// Type alias for Results using QueryDbError
pub type Result<T> = std::result::Result<T, QueryDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_classification() {
        let sqlite_err = QueryDbError::Sqlite(rusqlite::Error::InvalidQuery);
        assert!(sqlite_err.is_backend_error());

        let config_err = QueryDbError::UnsupportedBackend("mysql".to_string());
        assert!(!config_err.is_backend_error());

        let width_err = QueryDbError::ColumnWidthMismatch {
            expected: 2,
            got: 3,
        };
        assert!(!width_err.is_backend_error());
    }

    #[test]
    fn test_unsupported_backend_message() {
        let err = QueryDbError::UnsupportedBackend("mysql".to_string());
        let msg = err.to_string();
        assert!(msg.contains("mysql"));
        assert!(msg.contains("only SQLite3 and Postgres"));
    }
}
