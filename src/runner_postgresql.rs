use crate::{connection::ConnectOptions, result::Result, table::ResultTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use tokio::{runtime::Runtime, task::JoinHandle};
use tokio_postgres::{
    Client, NoTls, Row, Statement,
    types::{FromSql, Type},
};

// PostgreSQL type OIDs for all column types
const POSTGRES_TYPE_OID_BOOL: u32 = 16;
const POSTGRES_TYPE_OID_BYTEA: u32 = 17;
const POSTGRES_TYPE_OID_NAME: u32 = 19;
const POSTGRES_TYPE_OID_INT2: u32 = 21;
const POSTGRES_TYPE_OID_INT4: u32 = 23;
const POSTGRES_TYPE_OID_INT8: u32 = 20;
const POSTGRES_TYPE_OID_OID: u32 = 26;
const POSTGRES_TYPE_OID_FLOAT4: u32 = 700;
const POSTGRES_TYPE_OID_FLOAT8: u32 = 701;
const POSTGRES_TYPE_OID_TEXT: u32 = 25;
const POSTGRES_TYPE_OID_VARCHAR: u32 = 1043;
const POSTGRES_TYPE_OID_BPCHAR: u32 = 1042;
const POSTGRES_TYPE_OID_JSON: u32 = 114;
const POSTGRES_TYPE_OID_JSONB: u32 = 3802;
const POSTGRES_TYPE_OID_NUMERIC: u32 = 1700;
const POSTGRES_TYPE_OID_DATE: u32 = 1082;
const POSTGRES_TYPE_OID_TIME: u32 = 1083;
const POSTGRES_TYPE_OID_TIMESTAMP: u32 = 1114;
const POSTGRES_TYPE_OID_TIMESTAMPTZ: u32 = 1184;
const POSTGRES_TYPE_OID_UUID: u32 = 2950;

const DEFAULT_HOST: &str = "localhost";

/// Blocking handle over an asynchronous tokio-postgres client.
///
/// The client and its connection task live on a private current-thread runtime,
/// so every call blocks the caller until the server answers.
pub struct PostgresClient {
    client: Client,
    connection_task: JoinHandle<std::result::Result<(), tokio_postgres::Error>>,
    runtime: Runtime,
}

impl PostgresClient {
    /// Drop the client and wait for the connection task to finish its shutdown
    pub fn close(self) -> Result<()> {
        let PostgresClient {
            client,
            connection_task,
            runtime,
        } = self;
        drop(client);
        match runtime.block_on(connection_task) {
            Ok(result) => result?,
            Err(join_err) => tracing::warn!(error = %join_err, "PostgreSQL connection task aborted"),
        }
        tracing::debug!("PostgreSQL connection closed");
        Ok(())
    }
}

/// Build the driver configuration: connection string first, explicit fields on top
pub fn postgres_config(options: &ConnectOptions) -> Result<tokio_postgres::Config> {
    let mut config = match &options.connection_string {
        Some(conn_str) => conn_str.parse::<tokio_postgres::Config>()?,
        None => tokio_postgres::Config::new(),
    };

    if let Some(host) = &options.host {
        config.host(host.as_str());
    }
    if config.get_hosts().is_empty() {
        config.host(DEFAULT_HOST);
    }
    if let Some(port) = options.port {
        config.port(port);
    }
    if let Some(user) = &options.user {
        config.user(user.as_str());
    }
    if let Some(password) = &options.password {
        config.password(password.as_str());
    }
    if let Some(dbname) = &options.dbname {
        config.dbname(dbname.as_str());
    }

    Ok(config)
}

/// Open a PostgreSQL connection without TLS
pub fn connect_postgresql(options: &ConnectOptions) -> Result<PostgresClient> {
    let config = postgres_config(options)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    tracing::debug!(hosts = ?config.get_hosts(), "opening PostgreSQL connection");
    let (client, connection) = runtime.block_on(config.connect(NoTls))?;
    let connection_task = runtime.spawn(connection);

    Ok(PostgresClient {
        client,
        connection_task,
        runtime,
    })
}

/// Column labels of a prepared PostgreSQL statement, in result order
pub fn postgres_column_names(statement: &Statement) -> Vec<String> {
    statement
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

/// Accepts any column type without decoding it; used to tell NULL apart
/// from values whose type has no JSON mapping.
struct Opaque;

impl<'a> FromSql<'a> for Opaque {
    fn from_sql(
        _ty: &Type,
        _raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Opaque)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn to_json_value<T: serde::Serialize>(value: T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// NUMERIC as a JSON number when it fits an f64, otherwise its exact text
fn numeric_to_json(value: Option<Decimal>) -> serde_json::Value {
    match value {
        None => serde_json::Value::Null,
        Some(decimal) => decimal
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(decimal.to_string())),
    }
}

/// Convert a PostgreSQL column value based on its type OID. SQL NULL becomes JSON null.
pub fn postgres_type_to_json_conversion(
    column_type: &Type,
    row: &Row,
    idx: usize,
) -> Result<serde_json::Value> {
    let oid = column_type.oid();
    match oid {
        POSTGRES_TYPE_OID_BOOL => to_json_value(row.try_get::<_, Option<bool>>(idx)?),
        POSTGRES_TYPE_OID_INT2 => to_json_value(row.try_get::<_, Option<i16>>(idx)?),
        POSTGRES_TYPE_OID_INT4 => to_json_value(row.try_get::<_, Option<i32>>(idx)?),
        POSTGRES_TYPE_OID_INT8 => to_json_value(row.try_get::<_, Option<i64>>(idx)?),
        POSTGRES_TYPE_OID_OID => to_json_value(row.try_get::<_, Option<u32>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT4 => to_json_value(row.try_get::<_, Option<f32>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT8 => to_json_value(row.try_get::<_, Option<f64>>(idx)?),
        POSTGRES_TYPE_OID_TEXT
        | POSTGRES_TYPE_OID_VARCHAR
        | POSTGRES_TYPE_OID_BPCHAR
        | POSTGRES_TYPE_OID_NAME => to_json_value(row.try_get::<_, Option<String>>(idx)?),
        POSTGRES_TYPE_OID_BYTEA => to_json_value(row.try_get::<_, Option<Vec<u8>>>(idx)?),
        POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
            to_json_value(row.try_get::<_, Option<serde_json::Value>>(idx)?)
        }
        POSTGRES_TYPE_OID_NUMERIC => Ok(numeric_to_json(row.try_get(idx)?)),
        // Dates and times serialize as ISO 8601 text
        POSTGRES_TYPE_OID_DATE => to_json_value(row.try_get::<_, Option<NaiveDate>>(idx)?),
        POSTGRES_TYPE_OID_TIME => to_json_value(row.try_get::<_, Option<NaiveTime>>(idx)?),
        POSTGRES_TYPE_OID_TIMESTAMP => {
            to_json_value(row.try_get::<_, Option<NaiveDateTime>>(idx)?)
        }
        POSTGRES_TYPE_OID_TIMESTAMPTZ => {
            to_json_value(row.try_get::<_, Option<DateTime<Utc>>>(idx)?)
        }
        POSTGRES_TYPE_OID_UUID => to_json_value(row.try_get::<_, Option<uuid::Uuid>>(idx)?),
        _ => match row.try_get::<_, Option<Opaque>>(idx)? {
            None => Ok(serde_json::Value::Null),
            Some(_) => to_json_value(format!(
                "Unsupported PostgreSQL type {}: OID {oid}",
                column_type.name()
            )),
        },
    }
}

fn row_to_values(row: &Row) -> Result<Vec<serde_json::Value>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| postgres_type_to_json_conversion(column.type_(), row, idx))
        .collect()
}

async fn fetch_all_async(client: &Client, sql: &str) -> Result<(ResultTable, u64)> {
    let statement = client.prepare(sql).await?;
    let columns = postgres_column_names(&statement);

    if columns.is_empty() {
        let affected = client.execute(&statement, &[]).await?;
        return Ok((ResultTable::empty(), affected));
    }

    let rows = client.query(&statement, &[]).await?;
    let data = rows
        .iter()
        .map(row_to_values)
        .collect::<Result<Vec<_>>>()?;
    let count = data.len() as u64;

    Ok((ResultTable::new(columns, data)?, count))
}

/// Execute one statement verbatim and buffer every row, blocking until done.
///
/// Returns the table and the row count: rows returned for statements with
/// result columns, rows affected for everything else.
pub fn fetch_all_postgresql(pg: &mut PostgresClient, sql: &str) -> Result<(ResultTable, u64)> {
    tracing::debug!(sql, "executing PostgreSQL statement");
    pg.runtime.block_on(fetch_all_async(&pg.client, sql))
}
