//! Configuration loader (defaults + `.env` + TOML file + environment merge).

use crate::{
    connection::ConnectOptions,
    result::{QueryDbError, Result},
};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::collections::BTreeMap;
use std::path::Path;

/// Prefix of the environment variables read by [`load_config`], e.g. `QUERYDB_HOST`
pub const ENV_PREFIX: &str = "QUERYDB_";

/// Key-value file in the working directory that pre-populates connection settings
pub const DOTENV_FILE: &str = ".env";

/// Keys taken from [`DOTENV_FILE`], matched case-insensitively
const DOTENV_KEYS: [&str; 4] = ["user", "password", "host", "port"];

/// Keys taken from `QUERYDB_*` environment variables
const ENV_KEYS: [&str; 8] = [
    "backend",
    "path",
    "host",
    "port",
    "user",
    "password",
    "dbname",
    "connection_string",
];

/// Locally configured connection defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDbConfig {
    /// Backend identifier, `sqlite3` or `postgresql`
    pub backend: Option<String>,
    pub path: Option<String>,
    pub host: Option<String>,
    #[serde(deserialize_with = "port_from_number_or_text")]
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub dbname: Option<String>,
    pub connection_string: Option<String>,
}

impl QueryDbConfig {
    pub fn connect_options(&self) -> ConnectOptions {
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

/// TOML gives ports as integers, `.env` and environment layers as text
fn port_from_number_or_text<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match Option::<RawPort>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPort::Number(port)) => Ok(Some(port)),
        Some(RawPort::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid port `{text}`"))),
    }
}

/// Settings from a `.env` file, unparsed. A missing file contributes nothing.
fn dotenv_values(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    if !path.is_file() {
        return Ok(values);
    }

    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| QueryDbError::Config(format!("{}: {e}", path.display())))?;
    for entry in entries {
        let (key, value) =
            entry.map_err(|e| QueryDbError::Config(format!("{}: {e}", path.display())))?;
        let key = key.to_lowercase();
        if DOTENV_KEYS.contains(&key.as_str()) {
            values.insert(key, value);
        }
    }
    Ok(values)
}

/// `QUERYDB_*` variables as raw strings, so a numeric password stays a string
fn env_values() -> BTreeMap<String, String> {
    Env::prefixed(ENV_PREFIX)
        .iter()
        .map(|(key, value)| (key.as_str().to_lowercase(), value))
        .filter(|(key, _)| ENV_KEYS.contains(&key.as_str()))
        .collect()
}

/// Loads configuration by merging layers:
/// 1. Default values
/// 2. `.env` in the working directory (user, password, host, port)
/// 3. Config file (if given; it must exist)
/// 4. Environment variables (QUERYDB_ prefix)
pub fn load_config(config_path: Option<&Path>) -> Result<QueryDbConfig> {
    let mut figment = Figment::from(Serialized::defaults(QueryDbConfig::default()))
        .merge(Serialized::defaults(dotenv_values(Path::new(DOTENV_FILE))?));

    if let Some(path) = config_path {
        if !path.is_file() {
            return Err(QueryDbError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Serialized::defaults(env_values()));

    let config: QueryDbConfig = figment.extract()?;
    tracing::debug!(backend = ?config.backend, host = ?config.host, "configuration loaded");
    Ok(config)
}
