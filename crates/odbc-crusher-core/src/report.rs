//! Result aggregation and the structured report shape consumed by renderers

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::result::{TestResult, TestStatus};

/// Counts derived from a result list. Always recomputed, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(rename = "errors")]
    pub errored: usize,
}

impl Summary {
    /// Percentage of passed results, `0.0` for an empty run
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Count results by status in one pass
pub fn summarize<'a>(results: impl IntoIterator<Item = &'a TestResult>) -> Summary {
    results
        .into_iter()
        .fold(Summary::default(), |mut summary, result| {
            summary.total += 1;
            match result.status {
                TestStatus::Pass => summary.passed += 1,
                TestStatus::Fail => summary.failed += 1,
                TestStatus::Skip => summary.skipped += 1,
                TestStatus::Error => summary.errored += 1,
            }
            summary
        })
}

/// Whether any result is a Fail or an Error
pub fn has_failures<'a>(results: impl IntoIterator<Item = &'a TestResult>) -> bool {
    results.into_iter().any(|r| r.status.is_failure())
}

/// `{summary, results}` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub summary: Summary,
    pub results: Vec<TestResult>,
}

impl StructuredReport {
    /// The Fail/Error subset, for emphasis in renderers
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.status.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        has_failures(&self.results)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Lossless report over every result
pub fn to_structured_report(results: &[TestResult]) -> StructuredReport {
    StructuredReport {
        summary: summarize(results),
        results: results.to_vec(),
    }
}
