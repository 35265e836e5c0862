//! Data type round trips across families.
//!
//! Test categories:
//! - Binary representations (raw bytes, hex text, latin-1 text, unsupported)
//! - Partial support within one type family
//! - Types a family does not have
//! - Family specific CAST target rewriting as seen by the driver

use crate::fixtures::{BinaryRepr, FamilyProfile, MockGateway, fast_config, run_battery};
use anyhow::{Context, Result};
use odbc_crusher_core::{RunConfig, Severity, TestResult, TestStatus};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn datatype_config() -> Result<RunConfig> {
    let mut config = fast_config();
    config.select_suites(&["datatype"])?;
    Ok(config)
}

fn result<'a>(results: &'a [TestResult], name: &str) -> Result<&'a TestResult> {
    results
        .iter()
        .find(|r| r.test_name == name)
        .with_context(|| format!("no result named {name}"))
}

/// Binary comes back as bytes or as hex text depending on the driver
#[rstest]
#[case::mysql_bytes(FamilyProfile::mysql(), "VARBINARY(10) round-trip matched (bytes)")]
#[case::postgres_hex(FamilyProfile::postgres(), "VARBINARY(10) round-trip matched (hex text)")]
#[case::firebird_octets(FamilyProfile::firebird(), "VARBINARY(10) round-trip matched (bytes)")]
#[case::latin1_text(
    FamilyProfile::mysql().with_binary(BinaryRepr::Latin1Text),
    "VARBINARY(10) round-trip matched (latin-1 text)"
)]
fn test_binary_representations(#[case] profile: FamilyProfile, #[case] actual: &str) -> Result<()> {
    let gateway = MockGateway::new(profile);
    let outcome = run_battery(&gateway, &datatype_config()?);

    let binary = result(outcome.results.as_slice(), "test_binary_types")?;
    assert_eq!(binary.status, TestStatus::Pass);
    assert_eq!(binary.actual, actual);
    Ok(())
}

/// A family that has binary types but fails every variant is a Fail
#[test]
fn test_binary_failure_on_binary_capable_family() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::postgres().with_binary(BinaryRepr::Unsupported));
    let outcome = run_battery(&gateway, &datatype_config()?);

    let binary = result(outcome.results.as_slice(), "test_binary_types")?;
    assert_eq!(binary.status, TestStatus::Fail);
    assert_eq!(binary.severity, Severity::Warning);
    assert!(
        binary
            .diagnostic
            .as_deref()
            .is_some_and(|d| d.starts_with("Driver may not support binary type binding"))
    );
    Ok(())
}

/// An unrecognised family without binary support is skipped, not failed
#[test]
fn test_binary_failure_on_unknown_family_is_skipped() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::interbase().with_binary(BinaryRepr::Unsupported));
    let outcome = run_battery(&gateway, &datatype_config()?);

    let binary = result(outcome.results.as_slice(), "test_binary_types")?;
    assert_eq!(binary.status, TestStatus::Skip);
    assert_eq!(binary.severity, Severity::Info);
    assert_eq!(binary.actual, "Binary types not supported for Unknown");
    assert!(!outcome.has_failures());
    Ok(())
}

/// One working integer width is a degraded pass
#[test]
fn test_integer_types_limited_support() -> Result<()> {
    let gateway = MockGateway::new(
        FamilyProfile::postgres()
            .rejecting_cast("SMALLINT")
            .rejecting_cast("BIGINT"),
    );
    let outcome = run_battery(&gateway, &datatype_config()?);

    let integers = result(outcome.results.as_slice(), "test_integer_types")?;
    assert_eq!(integers.status, TestStatus::Pass);
    assert_eq!(integers.severity, Severity::Warning);
    assert_eq!(integers.actual, "Limited support: INTEGER");
    assert_eq!(
        integers.diagnostic.as_deref(),
        Some("Driver may not support all integer types")
    );
    assert!(!outcome.has_failures());
    Ok(())
}

/// Oracle has no TIME type: only that case fails
#[test]
fn test_oracle_time_type_fails() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::oracle());
    let outcome = run_battery(&gateway, &datatype_config()?);

    let failures: Vec<&str> = outcome
        .results
        .failures()
        .map(|r| r.test_name.as_str())
        .collect();
    assert_eq!(failures, ["test_time_type"]);

    let time = result(outcome.results.as_slice(), "test_time_type")?;
    assert_eq!(time.severity, Severity::Warning);
    assert_eq!(time.actual, "TIME type could not be tested");
    Ok(())
}

/// The driver receives the family's own spelling of each CAST target
#[rstest]
#[case::mysql(FamilyProfile::mysql(), &[
    "SELECT CAST(? AS SIGNED)",
    "SELECT CAST(? AS DATETIME)",
    "SELECT CAST(? AS BINARY(10))",
])]
#[case::oracle(FamilyProfile::oracle(), &[
    "SELECT CAST(? AS NUMBER(5)) FROM DUAL",
    "SELECT CAST(? AS NUMBER(19)) FROM DUAL",
    "SELECT CAST(? AS RAW(10)) FROM DUAL",
])]
#[case::sql_server(FamilyProfile::sql_server(), &[
    "SELECT CAST(? AS DATETIME2)",
    "SELECT CAST(? AS FLOAT)",
])]
#[case::postgres(FamilyProfile::postgres(), &["SELECT CAST(? AS BYTEA)"])]
#[case::firebird(FamilyProfile::firebird(), &[
    "SELECT CAST(? AS VARCHAR(10) CHARACTER SET OCTETS) FROM RDB$DATABASE",
])]
fn test_cast_targets_are_rewritten(
    #[case] profile: FamilyProfile,
    #[case] expected: &[&str],
) -> Result<()> {
    let gateway = MockGateway::new(profile);
    run_battery(&gateway, &datatype_config()?);

    let executed = gateway.statements();
    for statement in expected {
        assert!(
            executed.iter().any(|s| s == statement),
            "{statement} was not executed: {executed:#?}"
        );
    }
    Ok(())
}

/// Every datatype case passes on a driver that round-trips everything
#[rstest]
#[case::postgres(FamilyProfile::postgres())]
#[case::mysql(FamilyProfile::mysql())]
#[case::sql_server(FamilyProfile::sql_server())]
#[case::firebird(FamilyProfile::firebird())]
fn test_all_datatypes_pass(#[case] profile: FamilyProfile) -> Result<()> {
    let gateway = MockGateway::new(profile);
    let outcome = run_battery(&gateway, &datatype_config()?);

    assert_eq!(outcome.results.len(), 8);
    let statuses: Vec<TestStatus> = outcome.results.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![TestStatus::Pass; 8]);
    Ok(())
}
