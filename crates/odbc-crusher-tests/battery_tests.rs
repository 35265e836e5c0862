//! Full battery runs against every emulated family.

use crate::fixtures::{FamilyProfile, MockGateway, fast_config, run_battery};
use anyhow::Result;
use odbc_crusher_core::{
    AttributeValue, BatteryOutcome, InfoType, Severity, Suite, SupportProvenance, TestStatus,
    summarize,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const CASES_PER_SUITE: [(Suite, usize); 7] = [
    (Suite::Capability, 5),
    (Suite::Connection, 3),
    (Suite::Handle, 4),
    (Suite::Statement, 4),
    (Suite::Metadata, 6),
    (Suite::Advanced, 6),
    (Suite::Datatype, 8),
];

/// Every family runs all 36 cases; only Oracle's missing TIME type fails
#[rstest]
#[case::postgres(FamilyProfile::postgres(), &[])]
#[case::mysql(FamilyProfile::mysql(), &[])]
#[case::oracle(FamilyProfile::oracle(), &["test_time_type"])]
#[case::sql_server(FamilyProfile::sql_server(), &[])]
#[case::firebird(FamilyProfile::firebird(), &[])]
#[case::interbase(FamilyProfile::interbase(), &[])]
fn test_full_battery(#[case] profile: FamilyProfile, #[case] failures: &[&str]) -> Result<()> {
    let gateway = MockGateway::new(profile);
    let outcome = run_battery(&gateway, &fast_config());
    let report = outcome.report();

    assert_eq!(outcome.results.len(), 36);
    assert!(outcome.snapshot.is_some());
    let failed: Vec<&str> = outcome
        .results
        .failures()
        .map(|r| r.test_name.as_str())
        .collect();
    assert_eq!(failed, failures);
    assert_eq!(report.has_failures(), !failures.is_empty());

    let s = report.summary;
    assert_eq!(s.passed + s.failed + s.skipped + s.errored, s.total);
    assert_eq!(s, summarize(outcome.results.iter()));
    Ok(())
}

/// Suites report in registry order and each keeps its case count
#[test]
fn test_suite_order() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::postgres());
    let outcome = run_battery(&gateway, &fast_config());

    let mut names = outcome.results.iter().map(|r| r.test_name.as_str());
    let firsts: Vec<&str> = CASES_PER_SUITE
        .iter()
        .filter_map(|(_, count)| {
            let first = names.next();
            for _ in 1..*count {
                names.next();
            }
            first
        })
        .collect();
    assert_eq!(
        firsts,
        [
            "test_driver_info",
            "test_basic_connection",
            "test_environment_handle",
            "test_simple_query",
            "test_tables",
            "test_autocommit_mode",
            "test_integer_types",
        ]
    );
    assert_eq!(names.next(), None);
    Ok(())
}

/// Selecting suites narrows the report but never reorders it
#[rstest]
#[case::single(&["advanced"], 6)]
#[case::reversed(&["datatype", "handle"], 12)]
#[case::capability_only(&["capability"], 5)]
fn test_suite_selection(#[case] suites: &[&str], #[case] expected: usize) -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::mysql());
    let mut config = fast_config();
    config.select_suites(suites)?;

    let outcome = run_battery(&gateway, &config);

    assert_eq!(outcome.results.len(), expected);
    assert!(outcome.snapshot.is_some());
    if suites == ["datatype", "handle"] {
        assert_eq!(outcome.results.as_slice()[0].test_name, "test_environment_handle");
        assert_eq!(outcome.results.as_slice()[4].test_name, "test_integer_types");
    }
    Ok(())
}

/// The snapshot records where function support came from
#[rstest]
#[case::bitmap(FamilyProfile::sql_server(), SupportProvenance::Verified)]
#[case::binding(FamilyProfile::postgres(), SupportProvenance::Assumed)]
fn test_function_provenance(
    #[case] profile: FamilyProfile,
    #[case] provenance: SupportProvenance,
) -> Result<()> {
    let gateway = MockGateway::new(profile);
    let outcome = run_battery(&gateway, &fast_config());

    let snapshot = outcome.snapshot.as_ref().map(|s| s.function_provenance);
    assert_eq!(snapshot, Some(provenance));
    let function_support = outcome
        .results
        .iter()
        .find(|r| r.test_name == "test_function_support")
        .map(|r| r.status);
    assert_eq!(function_support, Some(TestStatus::Pass));
    Ok(())
}

/// Drivers without transactions skip the commit and rollback cases
#[test]
fn test_no_transaction_support() -> Result<()> {
    let gateway = MockGateway::new(
        FamilyProfile::mysql().with_info(InfoType::TxnCapable, AttributeValue::Integer(0)),
    );
    let mut config = fast_config();
    config.select_suites(&["advanced"])?;

    let outcome = run_battery(&gateway, &config);

    let skipped: Vec<&str> = outcome
        .results
        .iter()
        .filter(|r| r.status == TestStatus::Skip)
        .map(|r| r.test_name.as_str())
        .collect();
    assert_eq!(skipped, ["test_manual_commit", "test_rollback"]);
    assert!(
        !gateway
            .statements()
            .iter()
            .any(|s| s.starts_with("CREATE"))
    );
    Ok(())
}

/// The manual commit case creates and drops its temporary table
#[test]
fn test_manual_commit_cleans_up() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::postgres());
    let mut config = fast_config();
    config.select_suites(&["advanced"])?;

    run_battery(&gateway, &config);

    let ddl: Vec<String> = gateway
        .statements()
        .into_iter()
        .filter(|s| !s.starts_with("SELECT"))
        .collect();
    assert_eq!(
        ddl,
        [
            "CREATE GLOBAL TEMPORARY TABLE test_temp (id INT) ON COMMIT PRESERVE ROWS",
            "DROP TABLE test_temp",
        ]
    );
    Ok(())
}

/// A missing conformance report is a Skip, not a failure
#[test]
fn test_missing_conformance_is_skipped() -> Result<()> {
    let gateway = MockGateway::new(
        FamilyProfile::postgres()
            .without_info(InfoType::SqlConformance)
            .without_info(InfoType::OdbcInterfaceConformance),
    );
    let mut config = fast_config();
    config.select_suites(&["capability"])?;

    let outcome = run_battery(&gateway, &config);

    let conformance = outcome
        .results
        .iter()
        .find(|r| r.test_name == "test_sql_conformance")
        .map(|r| (r.status, r.actual.as_str()));
    assert_eq!(
        conformance,
        Some((TestStatus::Skip, "Conformance levels not reported"))
    );
    assert!(!outcome.has_failures());
    Ok(())
}

fn verdict<'a>(
    outcome: &'a BatteryOutcome,
    name: &str,
) -> Option<(TestStatus, Severity, &'a str)> {
    outcome
        .results
        .iter()
        .find(|r| r.test_name == name)
        .map(|r| (r.status, r.severity, r.actual.as_str()))
}

/// A charset without 4-byte characters loses only the emoji sample
#[test]
fn test_partial_unicode_support() -> Result<()> {
    let gateway = MockGateway::new(FamilyProfile::mysql().with_max_char('\u{FFFF}'));
    let mut config = fast_config();
    config.select_suites(&["capability"])?;

    let outcome = run_battery(&gateway, &config);

    assert_eq!(
        verdict(&outcome, "test_unicode_capability"),
        Some((
            TestStatus::Pass,
            Severity::Warning,
            "4/5 samples round-tripped (Basic ASCII, Latin with accents, Cyrillic, Chinese)"
        ))
    );
    let diagnostic = outcome
        .results
        .iter()
        .find(|r| r.test_name == "test_unicode_capability")
        .and_then(|r| r.diagnostic.as_deref());
    assert_eq!(diagnostic, Some("Partial Unicode support: 4/5 passed"));
    Ok(())
}

/// Parameter binding grades by how many of the three types bind
#[rstest]
#[case::all(&[], TestStatus::Pass, Severity::Info, "Successfully bound 3 parameter types (integer, string, float)")]
#[case::string_only(&["int32", "float64"], TestStatus::Pass, Severity::Warning, "Limited success: 1 parameter type worked (string)")]
#[case::none(&["int32", "string", "float64"], TestStatus::Fail, Severity::Error, "No parameter bindings succeeded")]
fn test_parameter_binding_thresholds(
    #[case] unbindable: &[&'static str],
    #[case] status: TestStatus,
    #[case] severity: Severity,
    #[case] actual: &str,
) -> Result<()> {
    let profile = unbindable
        .iter()
        .copied()
        .fold(FamilyProfile::mysql(), |profile, type_name| {
            profile.without_binding(type_name)
        });
    let gateway = MockGateway::new(profile);
    let mut config = fast_config();
    config.select_suites(&["advanced"])?;

    let outcome = run_battery(&gateway, &config);

    assert_eq!(
        verdict(&outcome, "test_parameter_binding"),
        Some((status, severity, actual))
    );
    Ok(())
}
