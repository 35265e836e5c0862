//! Environment, connection and statement handle lifecycle

use crate::capability::InfoType;
use crate::result::{Severity, TestResult, TestStatus};

use super::{Suite, SuiteContext, SuiteRun, Verdict, case};

const REUSE_ITERATIONS: usize = 5;
const CONCURRENT_STATEMENTS: usize = 3;

pub(super) fn run(ctx: &SuiteContext<'_>) -> Vec<TestResult> {
    let mut run = SuiteRun::new(ctx, Suite::Handle);

    run.case(
        case(
            "test_environment_handle",
            "SQLAllocHandle(SQL_HANDLE_ENV)",
            "Environment handle should be allocated and freed",
        ),
        |env| match env.ctx().gateway.probe_environment() {
            Ok(()) => Verdict::pass(Severity::Info, "Environment handle allocated and freed"),
            Err(e) => Verdict::from_error(
                TestStatus::Fail,
                Severity::Critical,
                "Environment allocation failed",
                &e,
            ),
        },
    );

    run.with_fresh_session(
        case(
            "test_connection_handle",
            "SQLAllocHandle(SQL_HANDLE_DBC)",
            "Connection handle should be allocated and usable",
        ),
        |session, _| match session.conn().get_info(InfoType::DbmsName) {
            Ok(name) => Verdict::pass(
                Severity::Info,
                format!("Connection handle allocated and usable (DBMS: {name})"),
            ),
            Err(e) => Verdict::from_error(
                TestStatus::Fail,
                Severity::Error,
                "Connection handle allocated but SQLGetInfo failed",
                &e,
            ),
        },
    );

    run.with_session(
        case(
            "test_statement_handle",
            "SQLAllocHandle(SQL_HANDLE_STMT)",
            "Statement handles should be allocated and freed",
        ),
        |session, _| {
            let conn = session.conn();
            if let Err(e) = conn.allocate_statements(1) {
                return Verdict::from_error(
                    TestStatus::Fail,
                    Severity::Error,
                    "Statement allocation failed",
                    &e,
                );
            }
            match conn.allocate_statements(CONCURRENT_STATEMENTS) {
                Ok(()) => Verdict::pass(
                    Severity::Info,
                    format!("1 and then {CONCURRENT_STATEMENTS} concurrent statement handles allocated"),
                ),
                Err(e) => Verdict::from_error(
                    TestStatus::Fail,
                    Severity::Warning,
                    &format!("Single statement allocated, {CONCURRENT_STATEMENTS} concurrent failed"),
                    &e,
                ),
            }
        },
    );

    run.case(
        case(
            "test_handle_reuse",
            "SQLFreeHandle/SQLAllocHandle (repeated)",
            "Handles should be reusable across repeated allocate/free cycles",
        ),
        |env| {
            for iteration in 1..=REUSE_ITERATIONS {
                let cycle = env.open().and_then(|session| {
                    session.conn().allocate_statements(1)?;
                    session.close()
                });
                if let Err(e) = cycle {
                    return Verdict::from_error(
                        TestStatus::Fail,
                        Severity::Warning,
                        &format!("Failed at iteration {iteration}"),
                        &e,
                    );
                }
            }
            Verdict::pass(
                Severity::Info,
                format!("{REUSE_ITERATIONS} allocate/free cycles completed"),
            )
        },
    );

    run.finish()
}
