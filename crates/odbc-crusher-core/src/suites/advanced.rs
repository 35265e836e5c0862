//! Transactions, prepared execution, parameter binding and result set
//! capabilities

use crate::capability::{InfoType, OdbcFunction, SupportProvenance};
use crate::dialect::DialectFeature;
use crate::result::{Severity, TestResult, TestStatus};
use crate::types::Value;

use super::{CaseEnv, Session, Suite, SuiteContext, SuiteRun, Verdict, case};

const TEMP_TABLE_DDL: &[&str] = &[
    "CREATE GLOBAL TEMPORARY TABLE test_temp (id INT) ON COMMIT PRESERVE ROWS",
    "CREATE TEMPORARY TABLE test_temp (id INT)",
    "CREATE TABLE test_temp (id INT)",
];

const FLOAT_TOLERANCE: f64 = 0.01;

pub(super) fn run(ctx: &SuiteContext<'_>) -> Vec<TestResult> {
    let mut run = SuiteRun::new(ctx, Suite::Advanced);

    run.with_session(
        case(
            "test_autocommit_mode",
            "SQLGetConnectAttr(SQL_ATTR_AUTOCOMMIT)",
            "Autocommit mode should be queryable",
        ),
        |session, _| match session.conn().autocommit() {
            Ok(enabled) => Verdict::pass(
                Severity::Info,
                format!("Autocommit mode is {}", if enabled { "ON" } else { "OFF" }),
            ),
            Err(e) if e.is_unsupported() => {
                Verdict::skip(Severity::Info, format!("Autocommit attribute not exposed: {e}"))
            }
            Err(e) => Verdict::error(Severity::Warning, format!("Error: {e}"))
                .with_diagnostic("Driver may not support autocommit attribute queries"),
        },
    );

    run.with_fresh_session(
        case(
            "test_manual_commit",
            "SQLEndTran(SQL_COMMIT)",
            "Manual transaction should commit",
        ),
        manual_commit,
    );

    run.with_fresh_session(
        case(
            "test_rollback",
            "SQLEndTran(SQL_ROLLBACK)",
            "Transaction should roll back",
        ),
        |session, env| {
            if let Some(skip) = transactions_unavailable(env) {
                return skip;
            }
            let conn = session.conn();
            if let Err(e) = conn.set_autocommit(false) {
                tracing::debug!(error = %e, "Could not disable autocommit");
            }
            match conn.rollback() {
                Ok(()) => Verdict::pass(Severity::Info, "Transaction rolled back successfully"),
                Err(e) => Verdict::from_error(
                    TestStatus::Fail,
                    Severity::Warning,
                    "Rollback failed",
                    &e,
                ),
            }
        },
    );

    run.with_session(
        case(
            "test_prepared_statement",
            "SQLPrepare/SQLExecute",
            "A parameterized statement should prepare and execute repeatedly",
        ),
        prepared_statement,
    );

    run.with_session(
        case(
            "test_parameter_binding",
            "SQLBindParameter",
            "Integer, string and float parameters should bind",
        ),
        parameter_binding,
    );

    run.with_session(
        case(
            "test_multiple_result_sets",
            "SQLMoreResults",
            "Driver should expose multiple result set iteration",
        ),
        |session, env| {
            let dialect = if session.dialect().supports(DialectFeature::MultipleResultSets) {
                format!("{} supports multiple result sets", session.dialect().family())
            } else {
                format!("{} not known to support multiple result sets", session.dialect().family())
            };
            let support = env
                .capabilities()
                .and_then(|caps| caps.function_support(OdbcFunction::MoreResults))
                .or_else(|| {
                    session
                        .conn()
                        .has_binding(OdbcFunction::MoreResults)
                        .then_some((true, SupportProvenance::Assumed))
                });
            match support {
                Some((true, provenance)) => Verdict::pass(
                    Severity::Info,
                    format!("SQLMoreResults available ({provenance})"),
                )
                .with_diagnostic(dialect),
                _ => Verdict::skip(Severity::Info, "SQLMoreResults not available")
                    .with_diagnostic("Multiple result sets may not be supported or exposed"),
            }
        },
    );

    run.finish()
}

/// Skip when the driver reports no transaction support at all
fn transactions_unavailable(env: &CaseEnv<'_, '_>) -> Option<Verdict> {
    let capable = env.capabilities()?.integer(InfoType::TxnCapable)?;
    (capable == 0).then(|| {
        Verdict::skip(Severity::Info, "Driver reports no transaction support (SQL_TC_NONE)")
    })
}

fn manual_commit(session: &mut Session<'_>, env: &CaseEnv<'_, '_>) -> Verdict {
    if let Some(skip) = transactions_unavailable(env) {
        return skip;
    }
    let conn = session.conn();
    if let Err(e) = conn.set_autocommit(false) {
        tracing::debug!(error = %e, "Could not disable autocommit");
    }

    let created = TEMP_TABLE_DDL.iter().find(|ddl| match conn.execute(ddl, &[]) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(sql = %ddl, error = %e, "Temporary table variant failed");
            false
        }
    });

    if let Err(e) = conn.commit() {
        return Verdict::from_error(TestStatus::Fail, Severity::Warning, "Commit failed", &e)
            .with_diagnostic("Driver may not support manual transactions");
    }

    match created {
        Some(ddl) => {
            let cleanup = conn
                .execute("DROP TABLE test_temp", &[])
                .and_then(|_| conn.commit());
            if let Err(e) = cleanup {
                tracing::warn!(error = %e, "Could not drop test_temp");
            }
            Verdict::pass(Severity::Info, "Transaction committed successfully")
                .with_diagnostic(format!("Created table with: {ddl}"))
        }
        None => Verdict::pass(
            Severity::Info,
            "Empty transaction committed (no table creation)",
        ),
    }
}

fn prepared_statement(session: &mut Session<'_>, _: &CaseEnv<'_, '_>) -> Verdict {
    let expression = session.dialect().cast_expression("INTEGER");
    let candidates = session.dialect().resolve(&expression);
    let conn = session.conn();
    let mut last_error = None;

    for statement in &candidates {
        let mut prepared = match conn.prepare(statement) {
            Ok(prepared) => prepared,
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        };
        let mut matched = 0;
        for expected in [1_i64, 2] {
            match prepared.execute(&[Value::Int64(expected)]) {
                Ok(mut cursor) => {
                    let value = cursor.fetch_one().and_then(|row| row.get(0).and_then(Value::as_i64));
                    if value == Some(expected) {
                        matched += 1;
                    }
                }
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }
        if matched == 2 {
            return Verdict::pass(
                Severity::Info,
                "Prepared statement executed twice with different parameters",
            )
            .with_diagnostic(format!("Statement: {statement}"));
        }
    }

    let verdict = Verdict::fail(Severity::Warning, "Failed to execute any parameterized query");
    match last_error {
        Some(e) => verdict.with_diagnostic(format!(
            "[{}] {}. Driver may not support prepared statements or parameter markers",
            e.sqlstate, e.message
        )),
        None => verdict
            .with_diagnostic("Driver returned unexpected values for prepared statement parameters"),
    }
}

fn parameter_binding(session: &mut Session<'_>, _: &CaseEnv<'_, '_>) -> Verdict {
    let samples: [(&str, Value); 3] = [
        ("integer", Value::Int32(1)),
        ("string", Value::from("test")),
        ("float", Value::Float64(3.25)),
    ];

    let mut bound = Vec::new();
    for (label, param) in &samples {
        let outcome = session.fallback("?", std::slice::from_ref(param));
        let matched = outcome.value.as_ref().is_some_and(|value| same_value(param, value));
        tracing::debug!(param = label, matched, "Parameter binding");
        if matched {
            bound.push(*label);
        }
    }

    match bound.len() {
        0 => Verdict::fail(Severity::Error, "No parameter bindings succeeded")
            .with_diagnostic("Driver may not support parameter binding"),
        1 => Verdict::pass(
            Severity::Warning,
            format!("Limited success: 1 parameter type worked ({})", bound[0]),
        )
        .with_diagnostic("Driver may not support all data type bindings"),
        n => Verdict::pass(
            Severity::Info,
            format!("Successfully bound {n} parameter types ({})", bound.join(", ")),
        ),
    }
}

/// Compare a bound parameter with what the driver echoed back, tolerating
/// representation changes (numbers as text, padded strings).
fn same_value(sent: &Value, received: &Value) -> bool {
    match sent {
        Value::Int32(_) | Value::Int64(_) => sent.as_i64() == received.as_i64(),
        Value::Float64(expected) => received
            .as_f64()
            .is_some_and(|actual| (actual - expected).abs() < FLOAT_TOLERANCE),
        Value::String(expected) => received
            .as_str()
            .is_some_and(|actual| actual.trim_end() == expected),
        _ => sent == received,
    }
}
