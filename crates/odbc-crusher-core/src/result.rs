//! Test outcome taxonomy: status, severity and the result record

use serde::{Deserialize, Serialize};

/// Terminal state of a test case
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TestStatus {
    /// The assertion held
    Pass,
    /// The assertion was evaluated and did not hold
    Fail,
    /// The capability needed for the assertion is absent
    Skip,
    /// The assertion could not be evaluated at all
    Error,
}

impl TestStatus {
    /// Fail and Error drive a non-zero exit status
    pub fn is_failure(self) -> bool {
        matches!(self, TestStatus::Fail | TestStatus::Error)
    }
}

/// How much a result matters to a driver author
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    /// The ODBC function(s) the case exercises
    pub function: String,
    pub status: TestStatus,
    pub expected: String,
    pub actual: String,
    pub diagnostic: Option<String>,
    pub severity: Severity,
    /// Wall clock time in fractional milliseconds
    pub duration_ms: f64,
}

/// Ordered, append-only collection of results in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<TestResult>);

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: TestResult) {
        self.0.push(result);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestResult> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TestResult] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fail and Error results, in execution order
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.0.iter().filter(|r| r.status.is_failure())
    }
}

impl Extend<TestResult> for ResultSet {
    fn extend<I: IntoIterator<Item = TestResult>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<TestResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = TestResult>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a TestResult;
    type IntoIter = std::slice::Iter<'a, TestResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, status: TestStatus) -> TestResult {
        TestResult {
            test_name: name.into(),
            function: "SQLExecDirect".into(),
            status,
            expected: "e".into(),
            actual: "a".into(),
            diagnostic: None,
            severity: Severity::Info,
            duration_ms: 0.5,
        }
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_value(result("t", TestStatus::Skip)).unwrap();
        assert_eq!(json["status"], "SKIP");
        assert_eq!(json["severity"], "INFO");
        assert_eq!(json["diagnostic"], serde_json::Value::Null);
        assert_eq!(TestStatus::Error.to_string(), "ERROR");
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_failures_keep_execution_order() {
        let results: ResultSet = [
            result("a", TestStatus::Error),
            result("b", TestStatus::Pass),
            result("c", TestStatus::Fail),
            result("d", TestStatus::Skip),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = results.failures().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }
}
