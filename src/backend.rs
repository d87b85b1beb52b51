use crate::result::QueryDbError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Database engines a connection can be opened against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    /// File-based embedded engine, driven through rusqlite
    Sqlite,
    /// Client-server engine, driven through tokio-postgres
    Postgresql,
}

impl Backend {
    /// Canonical identifier accepted by `from_str`
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite3",
            Backend::Postgresql => "postgresql",
        }
    }
}

impl FromStr for Backend {
    type Err = QueryDbError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite3" => Ok(Backend::Sqlite),
            "postgresql" => Ok(Backend::Postgresql),
            _ => Err(QueryDbError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Backend {
    type Error = QueryDbError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Backend> for String {
    fn from(backend: Backend) -> Self {
        backend.name().to_string()
    }
}
