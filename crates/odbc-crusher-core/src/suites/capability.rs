//! Driver identity, Unicode, conformance and feature detection.
//!
//! The first case also collects the capability snapshot that later suites
//! read.

use crate::capability::{
    CapabilityProbe, CapabilitySnapshot, InfoType, SupportProvenance, describe_interface_conformance,
    describe_outer_joins, describe_sql_conformance, describe_txn_capable,
};
use crate::connection::UNKNOWN;
use crate::result::{Severity, TestResult};
use crate::types::Value;

use super::{Suite, SuiteContext, SuiteRun, Verdict, case, grade};

const UNICODE_SAMPLES: &[(&str, &str)] = &[
    ("Basic ASCII", "Hello"),
    ("Latin with accents", "Café"),
    ("Cyrillic", "Привет"),
    ("Chinese", "你好"),
    ("Emoji", "🐍"),
];

/// Run the capability suite, returning the snapshot when one could be
/// collected.
pub fn run_collecting(ctx: &SuiteContext<'_>) -> (Vec<TestResult>, Option<CapabilitySnapshot>) {
    let mut run = SuiteRun::new(ctx, Suite::Capability);
    let mut snapshot: Option<CapabilitySnapshot> = None;

    run.with_session(
        case(
            "test_driver_info",
            "SQLGetInfo (Driver/DBMS information)",
            "Driver and DBMS identity should be retrievable",
        ),
        |session, _| {
            let collected = CapabilityProbe::collect(session.conn());
            let verdict = driver_info(&collected);
            snapshot = Some(collected);
            verdict
        },
    );

    run.with_session(
        case(
            "test_unicode_capability",
            "SQLBindParameter/SQLGetData (Unicode)",
            "All Unicode samples should round-trip unchanged",
        ),
        |session, _| {
            let expression = session.dialect().cast_expression("VARCHAR(50)");
            let mut passed = Vec::new();
            for (label, sample) in UNICODE_SAMPLES {
                let value = session
                    .fallback(&expression, &[Value::from(*sample)])
                    .value;
                let matched = value
                    .as_ref()
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.trim_end() == *sample);
                tracing::debug!(sample = label, matched, "Unicode round-trip");
                if matched {
                    passed.push(*label);
                }
            }

            let total = UNICODE_SAMPLES.len();
            let actual = if passed.is_empty() {
                format!("0/{total} samples round-tripped")
            } else {
                format!(
                    "{}/{total} samples round-tripped ({})",
                    passed.len(),
                    passed.join(", ")
                )
            };
            let none = Verdict::fail(Severity::Error, actual.clone()).with_diagnostic(
                session
                    .dialect()
                    .last_error()
                    .map(|e| e.diagnostic())
                    .unwrap_or_else(|| {
                        "Driver may not support Unicode parameter binding".to_string()
                    }),
            );
            let verdict = grade(passed.len(), total, actual, none);
            if verdict.severity == Severity::Warning {
                verdict.with_diagnostic(format!(
                    "Partial Unicode support: {}/{total} passed",
                    passed.len()
                ))
            } else {
                verdict
            }
        },
    );

    run.case(
        case(
            "test_sql_conformance",
            "SQLGetInfo (SQL conformance levels)",
            "Driver should report its SQL and ODBC conformance levels",
        ),
        |_| match &snapshot {
            Some(snapshot) => sql_conformance(snapshot),
            None => Verdict::error(Severity::Error, "Capability snapshot unavailable"),
        },
    );

    run.case(
        case(
            "test_supported_features",
            "SQLGetInfo (feature detection)",
            "Driver should report its optional features",
        ),
        |_| match &snapshot {
            Some(snapshot) => supported_features(snapshot),
            None => Verdict::error(Severity::Error, "Capability snapshot unavailable"),
        },
    );

    run.case(
        case(
            "test_function_support",
            "SQLGetFunctions",
            "Driver should report which ODBC functions it implements",
        ),
        |_| match &snapshot {
            Some(snapshot) => function_support(snapshot),
            None => Verdict::error(Severity::Error, "Capability snapshot unavailable"),
        },
    );

    (run.finish(), snapshot)
}

fn driver_info(snapshot: &CapabilitySnapshot) -> Verdict {
    let text = |info| snapshot.text(info).unwrap_or(UNKNOWN);
    if snapshot.attribute(InfoType::DriverName).is_none()
        && snapshot.attribute(InfoType::DbmsName).is_none()
    {
        return Verdict::fail(Severity::Warning, "Driver and DBMS names not reported")
            .with_diagnostic("SQLGetInfo failed for SQL_DRIVER_NAME and SQL_DBMS_NAME");
    }
    Verdict::pass(
        Severity::Info,
        format!(
            "{} v{} / {} v{}",
            text(InfoType::DriverName),
            text(InfoType::DriverVersion),
            text(InfoType::DbmsName),
            text(InfoType::DbmsVersion),
        ),
    )
    .with_diagnostic(format!(
        "Driver ODBC: {}, DM ODBC: {}",
        text(InfoType::DriverOdbcVersion),
        text(InfoType::OdbcVersion),
    ))
}

fn sql_conformance(snapshot: &CapabilitySnapshot) -> Verdict {
    let sql = snapshot
        .integer(InfoType::SqlConformance)
        .map(describe_sql_conformance);
    let interface = snapshot
        .integer(InfoType::OdbcInterfaceConformance)
        .map(describe_interface_conformance);

    match (sql, interface) {
        (None, None) => Verdict::skip(Severity::Info, "Conformance levels not reported"),
        (sql, interface) => Verdict::pass(
            Severity::Info,
            format!(
                "SQL conformance: {}, ODBC interface: {}",
                sql.unwrap_or(UNKNOWN),
                interface.unwrap_or(UNKNOWN)
            ),
        ),
    }
}

fn supported_features(snapshot: &CapabilitySnapshot) -> Verdict {
    let mut features = Vec::new();
    let yes = |info| snapshot.attribute(info).is_some_and(|v| v.is_yes());

    if yes(InfoType::Procedures) {
        features.push("Procedures".to_string());
    }
    if yes(InfoType::MultResultSets) {
        features.push("Multiple result sets".to_string());
    }
    match snapshot.integer(InfoType::OjCapabilities) {
        Some(bits) if bits != 0 => {
            features.push(format!("Outer joins ({})", describe_outer_joins(bits).join(", ")))
        }
        _ if yes(InfoType::OuterJoins) => features.push("Outer joins".to_string()),
        _ => {}
    }
    if let Some(txn) = snapshot.integer(InfoType::TxnCapable).filter(|t| *t != 0) {
        features.push(format!("Transactions ({})", describe_txn_capable(txn)));
    }
    if yes(InfoType::CatalogName) {
        features.push(format!(
            "Catalogs (term: {})",
            snapshot.text(InfoType::CatalogTerm).unwrap_or("catalog")
        ));
    }

    if features.is_empty() {
        Verdict::pass(Severity::Info, "Basic feature set only")
    } else {
        Verdict::pass(
            Severity::Info,
            format!("{} features detected: {}", features.len(), features.join("; ")),
        )
    }
}

fn function_support(snapshot: &CapabilitySnapshot) -> Verdict {
    let supported = snapshot.functions.values().filter(|s| **s).count();
    let total = snapshot.functions.len();
    let actual = format!(
        "{supported}/{total} functions supported ({})",
        snapshot.function_provenance
    );
    match snapshot.function_provenance {
        SupportProvenance::Verified => Verdict::pass(Severity::Info, actual),
        SupportProvenance::Assumed => Verdict::pass(Severity::Info, actual).with_diagnostic(
            "SQLGetFunctions unavailable; support assumed from the client binding",
        ),
    }
}
