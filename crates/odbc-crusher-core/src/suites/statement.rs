//! Direct execution, fetching and empty result handling

use crate::result::{Severity, TestResult, TestStatus};
use crate::types::Value;

use super::{CaseEnv, Session, Suite, SuiteContext, SuiteRun, Verdict, case};

pub(super) fn run(ctx: &SuiteContext<'_>) -> Vec<TestResult> {
    let mut run = SuiteRun::new(ctx, Suite::Statement);

    run.with_session(
        case(
            "test_simple_query",
            "SQLExecDirect",
            "A minimal SELECT should execute",
        ),
        |session, _| {
            let outcome = session.fallback("1", &[]);
            match (&outcome.statement, outcome.last_error()) {
                (Some(statement), _) => {
                    Verdict::pass(Severity::Info, format!("Executed: {statement}"))
                }
                (None, Some(e)) => Verdict::from_error(
                    TestStatus::Fail,
                    Severity::Critical,
                    "No SELECT variant executed",
                    e,
                ),
                (None, None) => Verdict::fail(Severity::Critical, "No SELECT variant executed"),
            }
        },
    );

    run.with_session(
        case(
            "test_query_with_results",
            "SQLFetch/SQLGetData",
            "One row with 2 columns (1, 'test')",
        ),
        query_with_results,
    );

    run.with_session(
        case(
            "test_empty_result_set",
            "SQLFetch (empty results)",
            "Query with no matching rows should fetch nothing without error",
        ),
        empty_result_set,
    );

    run.with_session(
        case(
            "test_multiple_statements",
            "SQLExecDirect (multiple)",
            "3 sequential statements should execute on one connection",
        ),
        |session, _| {
            let expressions = ["1", "2", "3"];
            let executed = expressions
                .iter()
                .filter(|expression| session.fallback(expression, &[]).succeeded())
                .count();
            let actual = format!("{executed}/{} statements executed", expressions.len());
            match executed {
                n if n == expressions.len() => Verdict::pass(Severity::Info, actual),
                0 => Verdict::fail(Severity::Critical, actual),
                _ => Verdict::fail(Severity::Warning, actual),
            }
        },
    );

    run.finish()
}

fn query_with_results(session: &mut Session<'_>, _: &CaseEnv<'_, '_>) -> Verdict {
    let candidates = session.dialect().resolve("1 AS num, 'test' AS txt");
    let mut last_error = None;
    for statement in candidates {
        let mut cursor = match session.conn().execute(&statement, &[]) {
            Ok(cursor) => cursor,
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        };
        let columns = cursor.column_count();
        let Some(row) = cursor.fetch_one() else {
            return Verdict::fail(Severity::Critical, format!("{statement} returned no rows"));
        };
        let extra = cursor.fetch_all().len();
        let num = row.get(0).and_then(Value::as_i64);
        let txt = row.text(1);
        let actual = format!(
            "{} row(s), {columns} columns, values ({}, {})",
            1 + extra,
            num.map(|n| n.to_string()).unwrap_or_else(|| "NULL".into()),
            txt.as_deref().unwrap_or("NULL")
        );
        return if columns == 2 && num == Some(1) && txt.as_deref().map(str::trim_end) == Some("test")
        {
            Verdict::pass(Severity::Info, actual)
        } else {
            Verdict::fail(Severity::Critical, actual)
        };
    }
    match last_error {
        Some(e) => Verdict::from_error(
            TestStatus::Fail,
            Severity::Critical,
            "Query could not be executed",
            &e,
        ),
        None => Verdict::fail(Severity::Critical, "Query could not be executed"),
    }
}

fn empty_result_set(session: &mut Session<'_>, _: &CaseEnv<'_, '_>) -> Verdict {
    let candidates = session.dialect().resolve("1 AS num");
    let mut last_error = None;
    for candidate in candidates {
        let statement = format!("{candidate} WHERE 1=0");
        match session.conn().execute(&statement, &[]) {
            Ok(mut cursor) => {
                return match cursor.fetch_one() {
                    None => Verdict::pass(Severity::Info, "No rows returned, as expected"),
                    Some(_) => Verdict::fail(
                        Severity::Warning,
                        format!("{statement} returned a row"),
                    ),
                };
            }
            Err(e) => last_error = Some(e),
        }
    }
    match last_error {
        Some(e) => Verdict::from_error(
            TestStatus::Fail,
            Severity::Warning,
            "Empty-result query failed",
            &e,
        ),
        None => Verdict::fail(Severity::Warning, "Empty-result query failed"),
    }
}
