//! Prelude module for convenient imports
//!
//! ```no_run
//! use test262_runner::prelude::*;
//! ```

// Running
pub use crate::runner::{run, Runner, RunnerConfig};

// Error handling
pub use crate::error::{Error, Result};

// Results and reporting
pub use crate::report::{Aggregator, Report};
pub use crate::result::{TestCaseResult, TestResultCode};

// Exclusions
pub use crate::skiplist::{SkipCategory, SkipList};
