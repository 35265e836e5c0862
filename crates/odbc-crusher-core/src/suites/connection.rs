//! Connect/disconnect, attribute sanity and connection capacity

use crate::capability::InfoType;
use crate::error::GatewayResult;
use crate::result::{Severity, TestResult, TestStatus};
use crate::types::AttributeValue;

use super::{Suite, SuiteContext, SuiteRun, Verdict, case};

const SIMULTANEOUS_CONNECTIONS: usize = 3;

pub(super) fn run(ctx: &SuiteContext<'_>) -> Vec<TestResult> {
    let mut run = SuiteRun::new(ctx, Suite::Connection);

    run.case(
        case(
            "test_basic_connection",
            "SQLConnect/SQLDisconnect",
            "Connection should open and close cleanly",
        ),
        |env| match env.open() {
            Ok(session) => match session.close() {
                Ok(()) => Verdict::pass(Severity::Info, "Connected and disconnected successfully"),
                Err(e) => Verdict::from_error(
                    TestStatus::Fail,
                    Severity::Warning,
                    "Disconnect failed",
                    &e,
                ),
            },
            Err(e) => Verdict::from_error(TestStatus::Fail, Severity::Critical, "Connect failed", &e),
        },
    );

    run.with_session(
        case(
            "test_connection_attributes",
            "SQLGetInfo",
            "Driver and DBMS names should be retrievable",
        ),
        |session, _| {
            let conn = session.conn();
            let driver = conn.get_info(InfoType::DriverName);
            let dbms = conn.get_info(InfoType::DbmsName);
            match (driver, dbms) {
                (Err(driver_err), Err(_)) => Verdict::from_error(
                    TestStatus::Fail,
                    Severity::Warning,
                    "No attributes retrieved",
                    &driver_err,
                ),
                (driver, dbms) => Verdict::pass(
                    Severity::Info,
                    format!("Driver: {}, DBMS: {}", text_or_na(driver), text_or_na(dbms)),
                ),
            }
        },
    );

    run.case(
        case(
            "test_multiple_connections",
            "SQLConnect (multiple)",
            "3 simultaneous connections should be supported",
        ),
        |env| {
            let mut sessions = Vec::with_capacity(SIMULTANEOUS_CONNECTIONS);
            for _ in 0..SIMULTANEOUS_CONNECTIONS {
                match env.open() {
                    Ok(session) => sessions.push(session),
                    Err(e) => {
                        let opened = sessions.len();
                        // Close everything opened so far before reporting
                        drop(sessions);
                        return Verdict::from_error(
                            TestStatus::Fail,
                            Severity::Warning,
                            &format!("Failed after {opened} connections"),
                            &e,
                        );
                    }
                }
            }

            let close_errors = sessions
                .into_iter()
                .filter_map(|session| session.close().err())
                .count();
            if close_errors > 0 {
                Verdict::fail(
                    Severity::Warning,
                    format!(
                        "{SIMULTANEOUS_CONNECTIONS} connections opened, {close_errors} failed to close"
                    ),
                )
            } else {
                Verdict::pass(
                    Severity::Info,
                    format!("{SIMULTANEOUS_CONNECTIONS} simultaneous connections opened and closed"),
                )
            }
        },
    );

    run.finish()
}

fn text_or_na(result: GatewayResult<AttributeValue>) -> String {
    result
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "N/A".to_string())
}
