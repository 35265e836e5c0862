//! Dialect resolution against emulated drivers.
//!
//! Test categories:
//! - Family detection from the reported DBMS name
//! - First candidate per family
//! - Fallback to another FROM convention for unrecognised servers
//! - Outcome when no convention works

use crate::fixtures::{FamilyProfile, MockGateway};
use anyhow::Result;
use odbc_crusher_core::{DatabaseFamily, DialectResolver, Value};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// The reported DBMS name selects the family
#[rstest]
#[case::postgres(FamilyProfile::postgres(), DatabaseFamily::PostgreSQL)]
#[case::mysql(FamilyProfile::mysql(), DatabaseFamily::MySql)]
#[case::oracle(FamilyProfile::oracle(), DatabaseFamily::Oracle)]
#[case::sql_server(FamilyProfile::sql_server(), DatabaseFamily::SqlServer)]
#[case::firebird(FamilyProfile::firebird(), DatabaseFamily::Firebird)]
#[case::interbase(FamilyProfile::interbase(), DatabaseFamily::Unknown)]
fn test_family_detection(
    #[case] profile: FamilyProfile,
    #[case] expected: DatabaseFamily,
) -> Result<()> {
    let gateway = MockGateway::new(profile);
    let conn = gateway.open()?;

    assert_eq!(DialectResolver::detect(conn.as_ref()).family(), expected);
    Ok(())
}

/// Known families succeed with their own convention on the first try
#[rstest]
#[case::postgres(FamilyProfile::postgres(), "SELECT 1")]
#[case::mysql(FamilyProfile::mysql(), "SELECT 1")]
#[case::oracle(FamilyProfile::oracle(), "SELECT 1 FROM DUAL")]
#[case::firebird(FamilyProfile::firebird(), "SELECT 1 FROM RDB$DATABASE")]
fn test_first_candidate_matches_family(
    #[case] profile: FamilyProfile,
    #[case] statement: &str,
) -> Result<()> {
    let gateway = MockGateway::new(profile);
    let conn = gateway.open()?;
    let mut resolver = DialectResolver::detect(conn.as_ref());

    let outcome = resolver.fallback(conn.as_ref(), "1", &[]);

    assert_eq!(outcome.statement.as_deref(), Some(statement));
    assert_eq!(outcome.value, Some(Value::Int64(1)));
    assert!(outcome.failures.is_empty());
    assert_eq!(gateway.statements(), [statement]);
    Ok(())
}

/// A Firebird-compatible server under another name still gets a working
/// statement, one candidate later
#[test]
fn test_unknown_family_falls_back_to_rdb_database() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::interbase());
    let conn = gateway.open()?;
    let mut resolver = DialectResolver::detect(conn.as_ref());

    let outcome = resolver.fallback(conn.as_ref(), "1", &[]);

    assert_eq!(outcome.value, Some(Value::Int64(1)));
    assert_eq!(
        outcome.statement.as_deref(),
        Some("SELECT 1 FROM RDB$DATABASE")
    );
    assert_eq!(
        gateway.statements(),
        ["SELECT 1", "SELECT 1 FROM RDB$DATABASE"]
    );
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "SELECT 1");
    Ok(())
}

/// Fallback has no hidden state: the same probe twice gives the same outcome
#[test]
fn test_fallback_is_repeatable() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::interbase());
    let conn = gateway.open()?;
    let mut resolver = DialectResolver::detect(conn.as_ref());

    let first = resolver.fallback(conn.as_ref(), "1", &[]);
    let second = resolver.fallback(conn.as_ref(), "1", &[]);

    assert_eq!(first, second);
    Ok(())
}

/// When every convention is rejected the outcome carries each failure
#[test]
fn test_all_candidates_rejected() -> Result<()> {
    let mut profile = FamilyProfile::postgres();
    profile.from_clauses.clear();
    let gateway = MockGateway::new(profile);
    let conn = gateway.open()?;
    let mut resolver = DialectResolver::detect(conn.as_ref());

    let outcome = resolver.fallback(conn.as_ref(), "1", &[]);

    assert!(!outcome.succeeded());
    assert_eq!(outcome.value, None);
    assert_eq!(outcome.failures.len(), 3);
    assert_eq!(
        outcome.last_error().map(|e| e.sqlstate.as_str()),
        Some("42601")
    );
    assert_eq!(resolver.last_error(), outcome.last_error());
    Ok(())
}

/// Parameters are bound into whichever candidate runs
#[test]
fn test_fallback_binds_parameters() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::oracle());
    let conn = gateway.open()?;
    let mut resolver = DialectResolver::detect(conn.as_ref());
    let expression = resolver.cast_expression("BIGINT");

    let value = resolver.execute_with_fallback(conn.as_ref(), &expression, &[Value::Int64(42)]);

    assert_eq!(value, Some(Value::Int64(42)));
    assert_eq!(
        gateway.statements(),
        ["SELECT CAST(? AS NUMBER(19)) FROM DUAL"]
    );
    Ok(())
}
