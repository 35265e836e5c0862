use super::*;
use crate::error::GatewayResult;
use crate::test_support::{StubConnection, scalar};
use crate::types::{AttributeValue, Cursor};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case::firebird("Firebird 3.0", DatabaseFamily::Firebird)]
#[case::mysql("MySQL", DatabaseFamily::MySql)]
#[case::mariadb_via_mysql_driver("5.5.5-10.6.12-MariaDB mysql", DatabaseFamily::MySql)]
#[case::oracle("Oracle", DatabaseFamily::Oracle)]
#[case::mssql("Microsoft SQL Server", DatabaseFamily::SqlServer)]
#[case::mssql_lowercase("sql server express", DatabaseFamily::SqlServer)]
#[case::postgres("PostgreSQL 14.2", DatabaseFamily::PostgreSQL)]
#[case::sqlite("SQLite", DatabaseFamily::Unknown)]
#[case::empty("", DatabaseFamily::Unknown)]
fn test_detect_family(#[case] dbms_name: &str, #[case] expected: DatabaseFamily) {
    assert_eq!(DatabaseFamily::detect(dbms_name), expected);
}

#[test]
fn test_detect_from_connection() {
    let conn = StubConnection::new().with_dbms("PostgreSQL 14.2");
    assert_eq!(
        DialectResolver::detect(&conn).family(),
        DatabaseFamily::PostgreSQL
    );

    // No DBMS name at all still yields a usable resolver
    let conn = StubConnection::new();
    let resolver = DialectResolver::detect(&conn);
    assert_eq!(resolver.family(), DatabaseFamily::Unknown);
    assert_eq!(resolver.resolve("1").len(), 3);
}

#[test]
fn test_postgres_candidates_start_without_from() {
    let resolver = DialectResolver::for_family(DatabaseFamily::PostgreSQL);
    assert_eq!(
        resolver.resolve("CAST(? AS INTEGER)"),
        [
            "SELECT CAST(? AS INTEGER)",
            "SELECT CAST(? AS INTEGER) FROM RDB$DATABASE",
            "SELECT CAST(? AS INTEGER) FROM DUAL",
        ]
    );
}

#[rstest]
#[case::firebird(DatabaseFamily::Firebird, ["SELECT 1 FROM RDB$DATABASE", "SELECT 1 FROM DUAL", "SELECT 1"])]
#[case::oracle(DatabaseFamily::Oracle, ["SELECT 1 FROM DUAL", "SELECT 1 FROM RDB$DATABASE", "SELECT 1"])]
#[case::unknown(DatabaseFamily::Unknown, ["SELECT 1", "SELECT 1 FROM RDB$DATABASE", "SELECT 1 FROM DUAL"])]
fn test_candidate_order(#[case] family: DatabaseFamily, #[case] expected: [&str; 3]) {
    assert_eq!(DialectResolver::for_family(family).resolve("1"), expected);
}

fn firebird_rules(sql: &str, params: &[Value]) -> GatewayResult<Cursor> {
    if sql.ends_with("FROM RDB$DATABASE") {
        Ok(scalar(params.first().cloned().unwrap_or(Value::Int32(1))))
    } else {
        Err(GatewayError::new(
            "42000",
            "Dynamic SQL Error: Token unknown",
        ))
    }
}

#[test]
fn test_second_candidate_rescues_select_without_from() {
    // A Firebird server behind a driver that reports an unrecognised name
    let conn = StubConnection::new()
        .with_dbms("InterBase")
        .responding(firebird_rules);
    let mut resolver = DialectResolver::detect(&conn);

    let outcome = resolver.fallback(&conn, "CAST(? AS INTEGER)", &[Value::Int32(7)]);
    assert_eq!(outcome.value, Some(Value::Int32(7)));
    assert_eq!(
        outcome.statement.as_deref(),
        Some("SELECT CAST(? AS INTEGER) FROM RDB$DATABASE")
    );
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "SELECT CAST(? AS INTEGER)");
    assert_eq!(resolver.last_error().unwrap().sqlstate, "42000");
}

#[test]
fn test_detected_firebird_succeeds_first_try() {
    let conn = StubConnection::new()
        .with_dbms("Firebird 3.0")
        .responding(firebird_rules);
    let mut resolver = DialectResolver::detect(&conn);

    let outcome = resolver.fallback(&conn, "1", &[]);
    assert!(outcome.succeeded());
    assert!(outcome.failures.is_empty());
    assert_eq!(conn.executed.borrow().len(), 1);
}

#[test]
fn test_all_candidates_failing_returns_none() {
    let conn = StubConnection::new();
    let mut resolver = DialectResolver::for_family(DatabaseFamily::MySql);

    assert_eq!(resolver.execute_with_fallback(&conn, "1", &[]), None);
    assert_eq!(conn.executed.borrow().len(), 3);
    assert!(resolver.last_error().is_some());
}

#[test]
fn test_empty_result_moves_to_next_candidate() {
    let conn = StubConnection::new().responding(|sql, _| {
        if sql.ends_with("FROM DUAL") {
            Ok(scalar(Value::from("x")))
        } else {
            Ok(Cursor::new(vec!["value".into()], vec![]))
        }
    });
    let mut resolver = DialectResolver::for_family(DatabaseFamily::Unknown);

    let outcome = resolver.fallback(&conn, "'x'", &[]);
    assert_eq!(outcome.value, Some(Value::from("x")));
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].1.sqlstate, "02000");
}

#[test]
fn test_fallback_is_idempotent() {
    let conn = StubConnection::new().responding(firebird_rules);
    let mut resolver = DialectResolver::for_family(DatabaseFamily::Unknown);
    let params = [Value::from("abc")];

    let first = resolver.execute_with_fallback(&conn, "CAST(? AS VARCHAR(10))", &params);
    let second = resolver.execute_with_fallback(&conn, "CAST(? AS VARCHAR(10))", &params);
    assert_eq!(first, second);
    assert_eq!(first, Some(Value::from("abc")));
}

#[rstest]
#[case::sqlserver_named(DatabaseFamily::SqlServer, "named_parameters", true)]
#[case::sqlserver_multi(DatabaseFamily::SqlServer, "multiple_result_sets", true)]
#[case::oracle_multi(DatabaseFamily::Oracle, "multiple_result_sets", false)]
#[case::oracle_named(DatabaseFamily::Oracle, "named_parameters", true)]
#[case::postgres_savepoints(DatabaseFamily::PostgreSQL, "savepoints", true)]
#[case::firebird_savepoints(DatabaseFamily::Firebird, "transaction_savepoints", true)]
#[case::mysql_binary(DatabaseFamily::MySql, "binary_types", true)]
#[case::mysql_named(DatabaseFamily::MySql, "named_parameters", false)]
#[case::unknown_family(DatabaseFamily::Unknown, "binary_types", false)]
#[case::unknown_feature(DatabaseFamily::SqlServer, "time_travel", false)]
fn test_supports_feature(
    #[case] family: DatabaseFamily,
    #[case] feature: &str,
    #[case] expected: bool,
) {
    assert_eq!(
        DialectResolver::for_family(family).supports_feature(feature),
        expected
    );
}

#[rstest]
#[case::mysql_int(DatabaseFamily::MySql, "SMALLINT", "SIGNED")]
#[case::mysql_bigint(DatabaseFamily::MySql, "BIGINT", "SIGNED")]
#[case::mysql_varchar(DatabaseFamily::MySql, "VARCHAR(50)", "CHAR(50)")]
#[case::mysql_timestamp(DatabaseFamily::MySql, "TIMESTAMP", "DATETIME")]
#[case::oracle_bigint(DatabaseFamily::Oracle, "BIGINT", "NUMBER(19)")]
#[case::oracle_binary(DatabaseFamily::Oracle, "VARBINARY(10)", "RAW(10)")]
#[case::mssql_timestamp(DatabaseFamily::SqlServer, "TIMESTAMP", "DATETIME2")]
#[case::postgres_binary(DatabaseFamily::PostgreSQL, "BINARY(10)", "BYTEA")]
#[case::firebird_binary(DatabaseFamily::Firebird, "VARBINARY(10)", "VARCHAR(10) CHARACTER SET OCTETS")]
#[case::untouched(DatabaseFamily::PostgreSQL, "DECIMAL(10,2)", "DECIMAL(10,2)")]
#[case::unknown(DatabaseFamily::Unknown, "VARBINARY(10)", "VARBINARY(10)")]
fn test_cast_target_rewrites(
    #[case] family: DatabaseFamily,
    #[case] target: &str,
    #[case] expected: &str,
) {
    assert_eq!(DialectResolver::for_family(family).cast_target(target), expected);
}

#[test]
fn test_cast_expression() {
    let resolver = DialectResolver::for_family(DatabaseFamily::MySql);
    assert_eq!(resolver.cast_expression("INTEGER"), "CAST(? AS SIGNED)");
}

#[test]
fn test_detect_uses_text_of_integer_answer() {
    let conn = StubConnection::new().with_info(
        crate::capability::InfoType::DbmsName,
        Ok(AttributeValue::Integer(42)),
    );
    assert_eq!(
        DialectResolver::detect(&conn).family(),
        DatabaseFamily::Unknown
    );
}
