//! Result aggregation and the final report
//!
//! [`Aggregator`] is the single place where results from concurrently
//! finishing tests are tallied. Once the run is over it is turned into a
//! [`Report`], which renders the summary table and the lists of failing
//! tests.

use crate::result::{TestCaseResult, TestResultCode};
use rustc_hash::FxHashMap as HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Count of results per code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    counts: HashMap<TestResultCode, usize>,
}

impl Stats {
    pub fn get(&self, code: TestResultCode) -> usize {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, code: TestResultCode) {
        *self.counts.entry(code).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Names of failing tests per failure code, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedCases {
    tests: HashMap<TestResultCode, Vec<String>>,
}

impl FailedCases {
    pub fn push(&mut self, code: TestResultCode, test_name: impl Into<String>) {
        self.tests.entry(code).or_default().push(test_name.into());
    }

    pub fn get(&self, code: TestResultCode) -> &[String] {
        self.tests.get(&code).map_or(&[], Vec::as_slice)
    }
}

#[derive(Debug, Default)]
struct Tally {
    stats: Stats,
    failed_cases: FailedCases,
}

/// Thread-safe accumulator for test results
#[derive(Debug, Default)]
pub struct Aggregator {
    tally: Mutex<Tally>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        // A panic while holding the lock cannot leave a half-applied record.
        self.tally.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count `result` and, for failures, remember the test name.
    pub fn record(&self, result: &TestCaseResult) {
        let mut tally = self.lock();
        tally.stats.increment(result.code);
        if result.code.is_failure() {
            tally.failed_cases.push(result.code, result.test_name.clone());
        }
    }

    /// Number of results recorded so far
    pub fn recorded(&self) -> usize {
        self.lock().stats.total()
    }

    pub fn count(&self, code: TestResultCode) -> usize {
        self.lock().stats.get(code)
    }

    pub fn into_report(self, elapsed: Duration) -> Report {
        let tally = self
            .tally
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Report {
            stats: tally.stats,
            failed_cases: tally.failed_cases,
            elapsed,
        }
    }
}

/// Final statistics of a run
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub stats: Stats,
    pub failed_cases: FailedCases,
    pub elapsed: Duration,
}

const RULE: &str = "-----------------------------------";
const SEPARATOR: &str = "|----------------------+----------|";

fn failure_header(code: TestResultCode) -> &'static str {
    match code {
        TestResultCode::CompileFailed => "Compile failed:",
        TestResultCode::CompileTimeout => "Compile timeout:",
        TestResultCode::ExecuteFailed => "Execute failed:",
        TestResultCode::ExecuteTimeout => "Execute timeout:",
        TestResultCode::TestUnexpectedPassed => "Unexpected passed:",
        _ => "",
    }
}

impl Report {
    pub fn total(&self) -> usize {
        self.stats.total()
    }

    pub fn passed(&self) -> usize {
        self.stats.get(TestResultCode::TestPassed)
    }

    pub fn failed(&self) -> usize {
        TestResultCode::FAILURES
            .iter()
            .map(|&code| self.stats.get(code))
            .sum()
    }

    pub fn skipped(&self) -> usize {
        self.stats.get(TestResultCode::TestSkipped)
    }

    pub fn permanently_skipped(&self) -> usize {
        self.stats.get(TestResultCode::TestPermanentlySkipped)
    }

    /// Tests that were actually run
    pub fn eligible(&self) -> usize {
        self.total() - self.skipped() - self.permanently_skipped()
    }

    /// Fraction of eligible tests that passed; `None` when nothing ran
    pub fn pass_rate(&self) -> Option<f64> {
        match self.eligible() {
            0 => None,
            eligible => Some(self.passed() as f64 / eligible as f64),
        }
    }

    pub fn pass_rate_display(&self) -> String {
        match self.pass_rate() {
            Some(rate) => format!("{:.2}%", rate * 100.0),
            None => "--".to_string(),
        }
    }

    /// True when every eligible test passed
    pub fn is_pass(&self) -> bool {
        self.eligible() == self.passed()
    }

    pub fn status(&self) -> &'static str {
        if self.is_pass() {
            "PASS"
        } else {
            "FAIL"
        }
    }

    /// The fixed-format summary table
    pub fn format_summary(&self) -> String {
        let row = |label: &str, value: &dyn fmt::Display| {
            format!("| {:<20} | {:>8} |\n", label, value)
        };
        let mut s = String::new();
        s.push_str(RULE);
        s.push('\n');
        s.push_str(&format!("| {:<20} |   {}   |\n", "Results", self.status()));
        s.push_str(SEPARATOR);
        s.push('\n');
        s.push_str(&row("Total", &self.total()));
        s.push_str(&row("Pass", &self.passed()));
        s.push_str(&row("Fail", &self.failed()));
        s.push_str(&row("Skipped", &self.skipped()));
        s.push_str(&row("Permanently Skipped", &self.permanently_skipped()));
        s.push_str(&row("Pass Rate", &self.pass_rate_display()));
        s.push_str(RULE);
        s.push('\n');
        s.push_str(&row("Failures", &""));
        s.push_str(SEPARATOR);
        s.push('\n');
        s.push_str(&row("Compile fail", &self.stats.get(TestResultCode::CompileFailed)));
        s.push_str(&row("Compile timeout", &self.stats.get(TestResultCode::CompileTimeout)));
        s.push_str(&row("Execute fail", &self.stats.get(TestResultCode::ExecuteFailed)));
        s.push_str(&row("Execute timeout", &self.stats.get(TestResultCode::ExecuteTimeout)));
        s.push_str(RULE);
        s.push('\n');
        s
    }

    /// Failing test names grouped by failure code
    pub fn format_failures(&self) -> String {
        let mut s = String::from("\nDetails:\n");
        for code in TestResultCode::FAILURES {
            let tests = self.failed_cases.get(code);
            if tests.is_empty() {
                continue;
            }
            s.push_str(RULE);
            s.push('\n');
            s.push_str(failure_header(code));
            s.push('\n');
            for test in tests {
                s.push_str(test);
                s.push('\n');
            }
            s.push_str(RULE);
            s.push('\n');
        }
        s
    }

    /// Export as JSON
    pub fn to_json(&self) -> serde_json::Value {
        let counts: serde_json::Map<String, serde_json::Value> = TestResultCode::ALL
            .iter()
            .map(|&code| (json_key(code), serde_json::json!(self.stats.get(code))))
            .collect();
        let failures: serde_json::Map<String, serde_json::Value> = TestResultCode::FAILURES
            .iter()
            .filter(|&&code| !self.failed_cases.get(code).is_empty())
            .map(|&code| (json_key(code), serde_json::json!(self.failed_cases.get(code))))
            .collect();

        serde_json::json!({
            "status": self.status(),
            "total": self.total(),
            "passed": self.passed(),
            "failed": self.failed(),
            "skipped": self.skipped(),
            "permanently_skipped": self.permanently_skipped(),
            "eligible": self.eligible(),
            "pass_rate": self.pass_rate(),
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "counts": counts,
            "failures": failures,
        })
    }
}

fn json_key(code: TestResultCode) -> String {
    serde_json::to_value(code)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| code.label().to_string())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_summary())?;
        f.write_str(&self.format_failures())
    }
}
