//! Runs the selected suites in registry order against one target.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::capability::CapabilitySnapshot;
use crate::config::RunConfig;
use crate::gateway::{ConnectionDescriptor, OdbcGateway};
use crate::report::{StructuredReport, has_failures, to_structured_report};
use crate::result::{ResultSet, Severity, TestResult, TestStatus};
use crate::suites::{self, Suite, SuiteContext};

/// Everything a battery run produced
#[derive(Debug, Clone, Default)]
pub struct BatteryOutcome {
    pub results: ResultSet,
    /// `None` when the capability suite could not connect
    pub snapshot: Option<CapabilitySnapshot>,
}

impl BatteryOutcome {
    pub fn report(&self) -> StructuredReport {
        to_structured_report(self.results.as_slice())
    }

    pub fn has_failures(&self) -> bool {
        has_failures(&self.results)
    }
}

/// Drives the test battery for one connection descriptor.
pub struct BatteryRunner<'a> {
    gateway: &'a dyn OdbcGateway,
    descriptor: &'a ConnectionDescriptor,
    config: &'a RunConfig,
}

impl<'a> BatteryRunner<'a> {
    pub fn new(
        gateway: &'a dyn OdbcGateway,
        descriptor: &'a ConnectionDescriptor,
        config: &'a RunConfig,
    ) -> Self {
        Self {
            gateway,
            descriptor,
            config,
        }
    }

    /// Run the battery.
    ///
    /// The capability suite always runs first since its snapshot feeds the
    /// later suites; its own results are kept only when it was selected.
    pub fn run(&self) -> BatteryOutcome {
        let started = Instant::now();
        let base = SuiteContext::new(self.gateway, self.descriptor, self.config);
        tracing::info!(
            descriptor = %self.descriptor.redacted(),
            suites = ?self.config.suites,
            "Starting test battery"
        );

        let mut results = ResultSet::new();
        let (capability_results, snapshot) =
            match panic::catch_unwind(AssertUnwindSafe(|| suites::run_collecting(&base))) {
                Ok(collected) => collected,
                Err(payload) => (
                    vec![suite_crashed(Suite::Capability, &suites::panic_message(payload.as_ref()))],
                    None,
                ),
            };
        if self.config.is_selected(Suite::Capability) {
            results.extend(capability_results);
        }
        match &snapshot {
            Some(snapshot) => tracing::info!(
                attributes = snapshot.collected_count(),
                types = snapshot.types.len(),
                provenance = %snapshot.function_provenance,
                "Capability snapshot collected"
            ),
            None => tracing::warn!("No capability snapshot, dependent suites run without it"),
        }

        let ctx = base.with_capabilities(snapshot.as_ref());
        for suite in Suite::ALL
            .into_iter()
            .filter(|s| *s != Suite::Capability && self.config.is_selected(*s))
        {
            match panic::catch_unwind(AssertUnwindSafe(|| suite.run(&ctx))) {
                Ok(suite_results) => results.extend(suite_results),
                Err(payload) => {
                    let message = suites::panic_message(payload.as_ref());
                    tracing::error!(%suite, %message, "Suite aborted");
                    results.push(suite_crashed(suite, &message));
                }
            }
        }

        tracing::info!(
            total = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Test battery finished"
        );
        BatteryOutcome { results, snapshot }
    }
}

fn suite_crashed(suite: Suite, message: &str) -> TestResult {
    TestResult {
        test_name: format!("{suite}_suite"),
        function: suite.display_name().to_string(),
        status: TestStatus::Error,
        expected: "Suite should run to completion".to_string(),
        actual: format!("Suite aborted: {message}"),
        diagnostic: None,
        severity: Severity::Error,
        duration_ms: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::test_support::{StubConnection, StubGateway};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unselected_capability_still_feeds_snapshot() {
        let gateway = StubGateway::new(|| StubConnection::new().with_dbms("PostgreSQL"));
        let descriptor = ConnectionDescriptor::new("DSN=pg");
        let mut config = RunConfig::default();
        config.select_suites(&["handle"]).unwrap();

        let outcome = BatteryRunner::new(&gateway, &descriptor, &config).run();

        assert!(outcome.snapshot.is_some());
        assert!(outcome.results.iter().all(|r| !r.test_name.contains("driver_info")));
        assert_eq!(outcome.results.len(), 4);
    }

    #[test]
    fn test_every_suite_reports_when_nothing_connects() {
        let gateway = StubGateway::refusing(GatewayError::new("08001", "refused"));
        let descriptor = ConnectionDescriptor::new("DSN=down");
        let config = RunConfig::default();

        let outcome = BatteryRunner::new(&gateway, &descriptor, &config).run();
        let report = outcome.report();

        assert!(outcome.has_failures());
        assert_eq!(report.summary.total, outcome.results.len());
        assert_eq!(
            report.summary.passed
                + report.summary.failed
                + report.summary.skipped
                + report.summary.errored,
            report.summary.total
        );
        assert_eq!(outcome.results.len(), 5 + 3 + 4 + 4 + 6 + 6 + 8);
    }
}
