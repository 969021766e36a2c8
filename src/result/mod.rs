//! Test outcomes
//!
//! Every test file ends in exactly one [`TestResultCode`], wrapped in a
//! [`TestCaseResult`] together with a message and any captured tool output.

use serde::Serialize;
use std::fmt;

/// Final classification of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestResultCode {
    TestSkipped,
    TestPermanentlySkipped,
    CompileFailed,
    CompileTimeout,
    ExecuteFailed,
    ExecuteTimeout,
    TestPassed,
    TestUnexpectedPassed,
}

/// Which bucket of the report a code is counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCategory {
    Skip,
    Failure,
    Success,
}

impl TestResultCode {
    /// Every code, in report order
    pub const ALL: [TestResultCode; 8] = [
        TestResultCode::TestSkipped,
        TestResultCode::TestPermanentlySkipped,
        TestResultCode::CompileFailed,
        TestResultCode::CompileTimeout,
        TestResultCode::ExecuteFailed,
        TestResultCode::ExecuteTimeout,
        TestResultCode::TestPassed,
        TestResultCode::TestUnexpectedPassed,
    ];

    /// The failure codes, in the order failing tests are listed
    pub const FAILURES: [TestResultCode; 5] = [
        TestResultCode::CompileFailed,
        TestResultCode::CompileTimeout,
        TestResultCode::ExecuteFailed,
        TestResultCode::ExecuteTimeout,
        TestResultCode::TestUnexpectedPassed,
    ];

    pub fn category(self) -> ResultCategory {
        match self {
            TestResultCode::TestSkipped | TestResultCode::TestPermanentlySkipped => {
                ResultCategory::Skip
            }
            TestResultCode::TestPassed => ResultCategory::Success,
            TestResultCode::CompileFailed
            | TestResultCode::CompileTimeout
            | TestResultCode::ExecuteFailed
            | TestResultCode::ExecuteTimeout
            | TestResultCode::TestUnexpectedPassed => ResultCategory::Failure,
        }
    }

    pub fn is_failure(self) -> bool {
        self.category() == ResultCategory::Failure
    }

    pub fn is_skip(self) -> bool {
        self.category() == ResultCategory::Skip
    }

    /// Short label used by the progress display
    pub fn label(self) -> &'static str {
        match self {
            TestResultCode::TestSkipped => "SKIP",
            TestResultCode::TestPermanentlySkipped => "PERMANENTLY SKIP",
            TestResultCode::CompileFailed => "COMPILE FAIL",
            TestResultCode::CompileTimeout => "COMPILE TIMEOUT",
            TestResultCode::ExecuteFailed => "EXECUTE FAIL",
            TestResultCode::ExecuteTimeout => "EXECUTE TIMEOUT",
            TestResultCode::TestPassed => "PASS",
            TestResultCode::TestUnexpectedPassed => "UNEXPECTED PASS",
        }
    }
}

impl fmt::Display for TestResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of running one test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseResult {
    /// Test path relative to the suite root
    pub test_name: String,
    pub code: TestResultCode,
    /// Human-readable explanation (may be empty for a plain pass)
    pub message: String,
    /// Captured stdout/stderr of the tool that decided the outcome
    pub output: String,
}

impl TestCaseResult {
    pub fn new(
        test_name: impl Into<String>,
        code: TestResultCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            code,
            message: message.into(),
            output: String::new(),
        }
    }

    /// Attach captured tool output
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn passed(test_name: impl Into<String>) -> Self {
        Self::new(test_name, TestResultCode::TestPassed, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_one_category() {
        let failures: Vec<_> = TestResultCode::ALL
            .iter()
            .copied()
            .filter(|c| c.is_failure())
            .collect();
        assert_eq!(failures, TestResultCode::FAILURES.to_vec());

        let skips = TestResultCode::ALL.iter().filter(|c| c.is_skip()).count();
        assert_eq!(skips, 2);
        assert_eq!(
            TestResultCode::TestPassed.category(),
            ResultCategory::Success
        );
    }

    #[test]
    fn test_codes_are_ordered_by_category() {
        assert!(TestResultCode::TestSkipped < TestResultCode::CompileFailed);
        assert!(TestResultCode::ExecuteTimeout < TestResultCode::TestPassed);
    }

    #[test]
    fn test_result_with_output() {
        let result = TestCaseResult::new("a.js", TestResultCode::ExecuteFailed, "boom")
            .with_output("stderr:\n oops");
        assert_eq!(result.output, "stderr:\n oops");
        assert!(result.code.is_failure());
    }

    #[test]
    fn test_code_serializes_screaming_case() {
        let json = serde_json::to_string(&TestResultCode::CompileTimeout).unwrap();
        assert_eq!(json, "\"COMPILE_TIMEOUT\"");
    }
}
