//! Text and JSON rendering of battery reports

use std::fmt::Write as _;

use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use odbc_crusher_core::{ConnectionCheck, Severity, StructuredReport, TestResult, TestStatus};

fn status_cell(status: TestStatus) -> Cell {
    let (label, color) = match status {
        TestStatus::Pass => ("✓ PASS", Color::Green),
        TestStatus::Fail => ("✗ FAIL", Color::Red),
        TestStatus::Skip => ("○ SKIP", Color::DarkGrey),
        TestStatus::Error => ("⚠ ERROR", Color::Yellow),
    };
    Cell::new(label).fg(color)
}

fn severity_cell(severity: Severity) -> Cell {
    let color = match severity {
        Severity::Critical | Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Blue,
    };
    Cell::new(severity).fg(color)
}

pub fn summary_line(report: &StructuredReport) -> String {
    let s = &report.summary;
    format!(
        "Total: {} | Passed: {} | Failed: {} | Errors: {} | Skipped: {} ({:.1}% passed)",
        s.total,
        s.passed,
        s.failed,
        s.errored,
        s.skipped,
        s.pass_rate()
    )
}

pub fn results_table(results: &[TestResult]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Status",
            "Test Name",
            "Function",
            "Severity",
            "Duration (ms)",
        ]);
    for result in results {
        table.add_row(vec![
            status_cell(result.status),
            Cell::new(&result.test_name),
            Cell::new(&result.function),
            severity_cell(result.severity),
            Cell::new(format!("{:.2}", result.duration_ms)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn failure_detail(out: &mut String, result: &TestResult) {
    let _ = writeln!(out, "{}: {}", result.status, result.test_name);
    let _ = writeln!(out, "  Function: {}", result.function);
    let _ = writeln!(out, "  Expected: {}", result.expected);
    let _ = writeln!(out, "  Actual:   {}", result.actual);
    if let Some(diagnostic) = &result.diagnostic {
        let _ = writeln!(out, "  Diagnostic: {diagnostic}");
    }
    out.push('\n');
}

/// Summary line, results table, then one detail block per Fail/Error.
pub fn render_text(report: &StructuredReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Test Summary");
    let _ = writeln!(out, "{}\n", summary_line(report));
    if report.results.is_empty() {
        return out;
    }

    let _ = writeln!(out, "{}\n", results_table(&report.results));

    let mut failures = report.failures().peekable();
    if failures.peek().is_some() {
        let _ = writeln!(out, "Failed Tests Details:\n");
        for result in failures {
            failure_detail(&mut out, result);
        }
    }
    out
}

pub fn render_json(report: &StructuredReport) -> anyhow::Result<String> {
    Ok(report.to_json_pretty()?)
}

/// Phase 1 outcome, with the driver identity when it was gathered
pub fn render_connection_check(check: &ConnectionCheck) -> String {
    let mut out = String::new();
    if check.success {
        let _ = writeln!(out, "✓ Connection successful");
        for (key, value) in &check.info {
            let _ = writeln!(out, "  {key}: {value}");
        }
    } else {
        let _ = writeln!(
            out,
            "✗ Connection failed: {}",
            check.error.as_deref().unwrap_or("unknown error")
        );
        if let Some(diagnostic) = &check.diagnostic {
            let _ = writeln!(out, "\nDiagnostic: {diagnostic}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use odbc_crusher_core::to_structured_report;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn result(name: &str, status: TestStatus, diagnostic: Option<&str>) -> TestResult {
        TestResult {
            test_name: name.to_string(),
            function: "SQLExecDirect".to_string(),
            status,
            expected: "a row".to_string(),
            actual: "no row".to_string(),
            diagnostic: diagnostic.map(String::from),
            severity: Severity::Warning,
            duration_ms: 1.5,
        }
    }

    #[test]
    fn test_text_report_lists_failures_with_diagnostic() {
        let report = to_structured_report(&[
            result("test_simple_query", TestStatus::Pass, None),
            result("test_binary_types", TestStatus::Fail, Some("Check BINARY support")),
            result("test_foreign_keys", TestStatus::Skip, None),
        ]);

        let text = render_text(&report);

        assert!(text.contains("Total: 3 | Passed: 1 | Failed: 1 | Errors: 0 | Skipped: 1"));
        assert!(text.contains("test_simple_query"));
        assert!(text.contains("Failed Tests Details:"));
        assert!(text.contains("FAIL: test_binary_types"));
        assert!(text.contains("Diagnostic: Check BINARY support"));
        assert!(!text.contains("SKIP: test_foreign_keys"));
    }

    #[test]
    fn test_text_report_without_failures_has_no_detail_block() {
        let report = to_structured_report(&[result("test_simple_query", TestStatus::Pass, None)]);
        assert!(!render_text(&report).contains("Failed Tests Details"));
    }

    #[test]
    fn test_empty_report_still_has_summary() {
        let report = to_structured_report(&[]);
        assert_eq!(
            render_text(&report),
            "Test Summary\nTotal: 0 | Passed: 0 | Failed: 0 | Errors: 0 | Skipped: 0 (0.0% passed)\n\n"
        );
    }

    #[rstest]
    #[case::pass(TestStatus::Pass, "✓ PASS")]
    #[case::error(TestStatus::Error, "⚠ ERROR")]
    fn test_status_labels(#[case] status: TestStatus, #[case] label: &str) {
        assert_eq!(status_cell(status).content(), label);
    }

    #[test]
    fn test_json_report_shape() {
        let report = to_structured_report(&[result("test_x", TestStatus::Error, None)]);
        let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

        assert_eq!(json["summary"]["errors"], 1);
        assert_eq!(json["results"][0]["status"], "ERROR");
        assert_eq!(json["results"][0]["severity"], "WARNING");
    }

    #[test]
    fn test_connection_failure_shows_diagnostic() {
        let check = ConnectionCheck {
            success: false,
            error: Some("[28000] Login failed".into()),
            diagnostic: Some("Authentication failed".into()),
            ..Default::default()
        };
        let text = render_connection_check(&check);
        assert!(text.starts_with("✗ Connection failed: [28000] Login failed"));
        assert!(text.contains("Diagnostic: Authentication failed"));
    }
}
