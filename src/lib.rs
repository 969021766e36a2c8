//! test262-runner: a Test262 conformance runner for ahead-of-time JavaScript toolchains
//!
//! Every test file is compiled to a binary artifact by an external compiler
//! and the artifact is then executed by an external runtime. Outcomes are
//! classified against the test's `negative` expectation and summarized in a
//! pass/fail report.
//!
//! # Quick Start
//!
//! ```no_run
//! use test262_runner::prelude::*;
//! use std::path::PathBuf;
//!
//! fn main() -> Result<()> {
//!     let config = RunnerConfig {
//!         binary_path: PathBuf::from("build/bin"),
//!         jobs: 8,
//!         ..Default::default()
//!     };
//!     let report = run(config, &[PathBuf::from("test262/test/language")])?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! A test flows: [`runner`] discovery → [`skiplist`] → [`harness`] →
//! [`pipeline`] → [`report`]
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Loading** | [`harness`], [`skiplist`] |
//! | **Execution** | [`pipeline`], [`scheduler`], [`runner`] |
//! | **Output** | [`result`], [`report`], [`progress`] |

pub mod harness;
pub mod pipeline;
pub mod prelude;
pub mod progress;
pub mod report;
pub mod result;
pub mod runner;
pub mod scheduler;
pub mod skiplist;

mod error;

pub use error::{Error, Result};
pub use runner::{run, Runner, RunnerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
