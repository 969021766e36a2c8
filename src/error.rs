//! Error types for the Test262 runner
//!
//! Only run-level preconditions are errors. Anything that goes wrong while a
//! single test is being prepared, compiled or executed is folded into that
//! test's [`TestCaseResult`](crate::result::TestCaseResult) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the runner
#[derive(Error, Debug)]
pub enum Error {
    /// A test file or directory given on the command line does not exist
    #[error("test path '{}' does not exist", .0.display())]
    TestPathNotFound(PathBuf),

    /// The compiler or runtime binary could not be found
    #[error("{tool} not found at '{}'", path.display())]
    ToolNotFound { tool: String, path: PathBuf },

    /// No ancestor of a test file contains a `harness/` directory
    #[error("could not locate the test suite root for '{}'", .0.display())]
    SuiteRootNotFound(PathBuf),

    /// The skip list file is malformed
    #[error("invalid skip list '{}': {message}", path.display())]
    SkipList { path: PathBuf, message: String },

    /// A harness include could not be loaded for a test
    #[error("harness error for '{}': {message}", path.display())]
    Harness { path: PathBuf, message: String },

    /// IO error
    #[error("IOError: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization error
    #[error("JSONError: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create a tool-not-found error
    pub fn tool_not_found(tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Error::ToolNotFound {
            tool: tool.into(),
            path: path.into(),
        }
    }

    /// Create a harness error for a test file
    pub fn harness(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Harness {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for the runner
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found_message() {
        let err = Error::tool_not_found("hermesc", "/opt/bin/hermesc");
        assert_eq!(err.to_string(), "hermesc not found at '/opt/bin/hermesc'");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("gone"));
    }
}
