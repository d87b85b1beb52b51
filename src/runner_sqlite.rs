use crate::{
    connection::ConnectOptions,
    result::{QueryDbError, Result},
    table::ResultTable,
};
use rusqlite::{Connection, Statement, types::ValueRef};

/// Open a SQLite database at `options.path` (`:memory:` for an in-memory database)
pub fn connect_sqlite(options: &ConnectOptions) -> Result<Connection> {
    let path = options
        .path
        .as_deref()
        .ok_or_else(|| QueryDbError::MissingParameter("path".to_string()))?;
    tracing::debug!(path, "opening SQLite connection");
    Ok(Connection::open(path)?)
}

/// Column labels of a prepared SQLite statement, in result order
pub fn sqlite_column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Convert one SQLite cell to its JSON representation
fn sqlite_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(r) => serde_json::Value::from(r),
        ValueRef::Text(s) => serde_json::Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => serde_json::Value::Array(
            b.iter()
                .map(|&byte| serde_json::Value::Number(byte.into()))
                .collect(),
        ),
        ValueRef::Null => serde_json::Value::Null,
    }
}

/// Execute one statement verbatim and buffer every row.
///
/// Returns the table and the row count: rows returned for statements with
/// result columns, rows changed for everything else.
pub fn fetch_all_sqlite(conn: &Connection, sql: &str) -> Result<(ResultTable, u64)> {
    tracing::debug!(sql, "executing SQLite statement");
    let mut stmt = conn.prepare(sql)?;
    let columns = sqlite_column_names(&stmt);

    if columns.is_empty() {
        return match stmt.execute([]) {
            Ok(changed) => Ok((ResultTable::empty(), changed as u64)),
            // SQL holding only whitespace or comments prepares to no statement at all
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ApiMisuse =>
            {
                tracing::debug!("SQLite statement is empty");
                Ok((ResultTable::empty(), 0))
            }
            Err(err) => Err(err.into()),
        };
    }

    let width = columns.len();
    let rows = stmt.query_map([], |row| {
        (0..width)
            .map(|idx| row.get_ref(idx).map(sqlite_value))
            .collect::<rusqlite::Result<Vec<_>>>()
    })?;
    let data = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    let count = data.len() as u64;

    Ok((ResultTable::new(columns, data)?, count))
}

/// Close a SQLite connection, surfacing the driver error if the handle could not be released
pub fn close_sqlite(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, err)| QueryDbError::Sqlite(err))?;
    tracing::debug!("SQLite connection closed");
    Ok(())
}
