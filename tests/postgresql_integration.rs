//! PostgreSQL integration tests for querydb
//!
//! These tests verify that the scoped connection and fetch operations work
//! against a live PostgreSQL server.
//!
//! Tests are only run when POSTGRES_CONNECTION_STRING environment variable is set.

use querydb::{ConnectOptions, QueryDbError, QueryRunner, db_connect, postgres_connect};
use serde_json::json;

// Helper function to get PostgreSQL connection options from environment
fn postgres_options() -> Option<ConnectOptions> {
    let connection_string = std::env::var("POSTGRES_CONNECTION_STRING").ok()?;
    Some(ConnectOptions {
        connection_string: Some(connection_string),
        ..Default::default()
    })
}

#[test]
fn test_postgres_open_and_close_without_query() {
    let Some(options) = postgres_options() else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };

    let result = db_connect("postgresql", &options, |_conn| Ok(()));
    assert!(result.is_ok());
}

#[test]
fn test_postgres_create_insert_select() {
    let Some(options) = postgres_options() else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };

    let (table, inserted) = db_connect("PostgreSQL", &options, |conn| {
        conn.fetch_all("CREATE TEMP TABLE t (x INT)")?;
        let (_, inserted) = conn.fetch_all_with_count("INSERT INTO t VALUES (1), (2)")?;
        let table = conn.fetch_all("SELECT x FROM t ORDER BY x")?;
        Ok((table, inserted))
    })
    .unwrap();

    assert_eq!(inserted, 2);
    assert_eq!(table.columns(), &["x"]);
    assert_eq!(table.rows(), &[vec![json!(1)], vec![json!(2)]]);
}

#[test]
fn test_postgres_value_types() {
    let Some(options) = postgres_options() else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };

    let table = db_connect("postgresql", &options, |conn| {
        conn.fetch_all(
            "SELECT true AS flag, 7::int2 AS small, 42::int4 AS medium, 9000000000::int8 AS big, \
             1.5::float8 AS ratio, 'abc'::text AS label, 'x'::varchar AS code, \
             '\\x01ff'::bytea AS raw, '{\"k\": 1}'::jsonb AS doc, NULL::int4 AS missing, \
             '2024-01-01'::date AS day, 12.25::numeric AS price, NULL::numeric AS no_price, \
             '13:45:30'::time AS at, '2024-01-01 13:45:30'::timestamp AS stamp, \
             '2024-01-01 13:45:30+00'::timestamptz AS stamp_tz, \
             'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid AS id, point(1, 2) AS spot",
        )
    })
    .unwrap();

    assert_eq!(table.width(), 18);
    let records = table.to_records();
    let row = &records[0];
    assert_eq!(row["flag"], json!(true));
    assert_eq!(row["small"], json!(7));
    assert_eq!(row["medium"], json!(42));
    assert_eq!(row["big"], json!(9000000000i64));
    assert_eq!(row["ratio"], json!(1.5));
    assert_eq!(row["label"], json!("abc"));
    assert_eq!(row["code"], json!("x"));
    assert_eq!(row["raw"], json!([1, 255]));
    assert_eq!(row["doc"], json!({"k": 1}));
    assert_eq!(row["missing"], serde_json::Value::Null);
    assert_eq!(row["day"], json!("2024-01-01"));
    assert_eq!(row["price"], json!(12.25));
    assert_eq!(row["no_price"], serde_json::Value::Null);
    assert_eq!(row["at"], json!("13:45:30"));
    assert_eq!(row["stamp"], json!("2024-01-01T13:45:30"));
    assert_eq!(row["stamp_tz"], json!("2024-01-01T13:45:30Z"));
    assert_eq!(row["id"], json!("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"));
    // Types without a JSON mapping are named rather than dropped
    assert!(row["spot"].as_str().unwrap().contains("Unsupported PostgreSQL type point"));
}

#[test]
fn test_postgres_aggregate_numeric() {
    let Some(options) = postgres_options() else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };

    let table = db_connect("postgresql", &options, |conn| {
        conn.fetch_all("SELECT AVG(x) AS mean FROM (VALUES (1), (2)) AS v(x)")
    })
    .unwrap();

    assert_eq!(table.column("mean").unwrap(), vec![&json!(1.5)]);
}

#[test]
fn test_postgres_same_query_twice_is_identical() {
    let Some(options) = postgres_options() else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };

    let (first, second) = db_connect("postgresql", &options, |conn| {
        let sql = "SELECT g AS n, g * 2 AS doubled FROM generate_series(1, 3) AS g";
        Ok((conn.fetch_all(sql)?, conn.fetch_all(sql)?))
    })
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    for row in first.rows() {
        assert_eq!(row.len(), first.width());
    }
}

#[test]
fn test_postgres_syntax_error_is_returned() {
    let Some(options) = postgres_options() else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };

    let result = db_connect("postgresql", &options, |conn| {
        let failed = conn.fetch_all("SELEC 1");
        assert!(matches!(failed, Err(QueryDbError::Postgres(_))));
        // The connection stays usable after a failed statement
        conn.fetch_all("SELECT 1 AS one")
    });

    assert_eq!(result.unwrap().len(), 1);
}

#[test]
fn test_postgres_connect_helper() {
    let Some(options) = postgres_options() else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };

    let table = postgres_connect(&options, |conn| conn.fetch_all("SELECT 'ok' AS status")).unwrap();
    assert_eq!(table.column("status").unwrap(), vec![&json!("ok")]);
}
