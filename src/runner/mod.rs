//! Test262 run orchestration
//!
//! A run discovers the requested test files, settles every file that is
//! excluded by path, and then hands the remaining tests to the
//! [`Scheduler`]. Each scheduled test is loaded, checked for flags and
//! features that rule it out, written to the work directory as one file per
//! strict-mode variant, and pushed through the [`Toolchain`].
//!
//! ```no_run
//! use test262_runner::runner::{Runner, RunnerConfig};
//! use std::path::PathBuf;
//!
//! let config = RunnerConfig {
//!     binary_path: PathBuf::from("build/bin"),
//!     ..Default::default()
//! };
//! let runner = Runner::new(config)?;
//! let report = runner.run(&[PathBuf::from("test262/test/built-ins/Array")])?;
//! println!("{}", report);
//! # Ok::<(), test262_runner::Error>(())
//! ```

pub mod discover;

use crate::error::{Error, Result};
use crate::harness::{self, Negative, StrictMode};
use crate::pipeline::{
    SourceVariant, Toolchain, DEFAULT_COMPILER, DEFAULT_RUNTIME, DEFAULT_TIMEOUT,
};
use crate::progress::ProgressDisplay;
use crate::report::{Aggregator, Report};
use crate::result::{TestCaseResult, TestResultCode};
use crate::scheduler::Scheduler;
use crate::skiplist::{SkipCategory, SkipList};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const STRICT_DIRECTIVE: &str = "'use strict';\n";

/// Configuration for a test run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory holding the compiler and runtime binaries
    pub binary_path: PathBuf,
    pub compiler_name: String,
    pub runtime_name: String,
    /// Where preprocessed sources and compiled artifacts are written
    pub work_dir: PathBuf,
    /// Maximum number of tests in flight
    pub jobs: usize,
    /// Limit for each of the compile and execute phases
    pub timeout: Duration,
    /// Print one line per finished test
    pub verbose: bool,
    /// JSON skip list; the built-in list is used when unset
    pub skip_list: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("."),
            compiler_name: DEFAULT_COMPILER.to_string(),
            runtime_name: DEFAULT_RUNTIME.to_string(),
            work_dir: std::env::temp_dir().join("test262-runner"),
            jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
            skip_list: None,
        }
    }
}

/// One test file waiting to be run
#[derive(Debug, Clone)]
pub struct TestTask {
    pub file: PathBuf,
    /// Suite root the harness is loaded from
    pub suite: PathBuf,
    /// Path relative to the suite root, used in every result
    pub name: String,
}

impl TestTask {
    fn new(file: PathBuf) -> Result<Self> {
        let suite = discover::suite_root(&file)
            .ok_or_else(|| Error::SuiteRootNotFound(file.clone()))?;
        let name = file
            .strip_prefix(&suite)
            .unwrap_or(&file)
            .to_string_lossy()
            .into_owned();
        Ok(Self { file, suite, name })
    }
}

/// A loaded test that is either settled already or ready for the toolchain
enum Prepared {
    Settled(TestCaseResult),
    Ready {
        variants: Vec<SourceVariant>,
        negative: Option<Negative>,
    },
}

/// Runs Test262 tests through an external compiler and runtime
pub struct Runner {
    config: RunnerConfig,
    toolchain: Toolchain,
    skip_list: SkipList,
}

impl Runner {
    /// Build a runner, loading the configured skip list.
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let skip_list = match &config.skip_list {
            Some(path) => SkipList::load(path)?,
            None => SkipList::builtin(),
        };
        Ok(Self::with_skip_list(config, skip_list))
    }

    pub fn with_skip_list(config: RunnerConfig, skip_list: SkipList) -> Self {
        let toolchain = Toolchain::new(
            &config.binary_path,
            &config.compiler_name,
            &config.runtime_name,
            config.timeout,
        );
        Self {
            config,
            toolchain,
            skip_list,
        }
    }

    /// Run every test under `paths`, showing progress on stdout/stderr.
    pub fn run(&self, paths: &[PathBuf]) -> Result<Report> {
        self.run_with(paths, |total| ProgressDisplay::stdio(total, self.config.verbose))
    }

    /// Run every test under `paths` with a caller-built progress display.
    pub fn run_with<O, S, F>(&self, paths: &[PathBuf], make_progress: F) -> Result<Report>
    where
        O: Write,
        S: Write,
        F: FnOnce(usize) -> ProgressDisplay<O, S>,
    {
        let paths = paths
            .iter()
            .map(|p| p.canonicalize().map_err(|_| Error::TestPathNotFound(p.clone())))
            .collect::<Result<Vec<_>>>()?;
        self.toolchain.check()?;

        let tests_home = discover::common_path(&paths);
        let tasks = discover::list_all_files(&paths)?
            .into_iter()
            .map(TestTask::new)
            .collect::<Result<Vec<_>>>()?;

        let scheduler = Scheduler::new(self.config.jobs);
        tracing::info!(
            tests = tasks.len(),
            jobs = scheduler.jobs(),
            home = %tests_home.display(),
            "starting test run"
        );

        let aggregator = Aggregator::new();
        let mut progress = make_progress(tasks.len());
        progress.start(scheduler.jobs());

        let mut pending = Vec::with_capacity(tasks.len());
        for task in tasks {
            match self.skip_by_path(&task) {
                Some(result) => {
                    aggregator.record(&result);
                    progress.update(&result);
                }
                None => pending.push(task),
            }
        }

        scheduler.run(
            pending,
            |task| self.run_test(task, &tests_home),
            |task, message| {
                TestCaseResult::new(
                    &task.name,
                    TestResultCode::CompileFailed,
                    format!("FAIL: runner panicked on {}: {}", task.name, message),
                )
            },
            |result| {
                aggregator.record(&result);
                progress.update(&result);
            },
        );

        let elapsed = progress.finish();
        let report = aggregator.into_report(elapsed);
        tracing::info!(
            total = report.total(),
            passed = report.passed(),
            failed = report.failed(),
            ?elapsed,
            "test run finished"
        );
        Ok(report)
    }

    /// Exclusions decided from the file path alone
    fn skip_by_path(&self, task: &TestTask) -> Option<TestCaseResult> {
        let path = task.file.to_string_lossy();
        if let Some(result) = self.skip_list.try_skip(
            &*path,
            &[SkipCategory::SkipList, SkipCategory::PermanentSkipList],
            &task.name,
        ) {
            return Some(result);
        }
        self.skip_list
            .try_skip(&*path, &[SkipCategory::IntlTests], &task.name)
            .map(|result| TestCaseResult {
                code: TestResultCode::TestSkipped,
                ..result
            })
    }

    /// Load, prepare and run a single test.
    pub fn run_test(&self, task: &TestTask, tests_home: &Path) -> TestCaseResult {
        match self.prepare(task, tests_home) {
            Ok(Prepared::Settled(result)) => result,
            Ok(Prepared::Ready { variants, negative }) => {
                let disable_handle_san = self
                    .skip_list
                    .should_skip_cat(task.file.to_string_lossy(), SkipCategory::HandlesanSkipList);
                self.toolchain
                    .run_variants(&task.name, &variants, negative.as_ref(), disable_handle_san)
            }
            Err(e) => {
                tracing::debug!(test = %task.name, error = %e, "could not prepare test");
                TestCaseResult::new(
                    &task.name,
                    TestResultCode::CompileFailed,
                    format!("FAIL: {}", e),
                )
            }
        }
    }

    fn prepare(&self, task: &TestTask, tests_home: &Path) -> Result<Prepared> {
        let content = std::fs::read_to_string(&task.file)?;
        let test_case = harness::generate_source(&content, &task.suite, &task.name)?;
        let skipped = |message: String| -> Result<Prepared> {
            Ok(Prepared::Settled(TestCaseResult::new(
                &task.name,
                TestResultCode::TestSkipped,
                message,
            )))
        };

        if test_case.includes.iter().any(|i| i == "testIntl.js") {
            return skipped(format!(
                "SKIP: no support for multiple Intl constructors in {}",
                task.name
            ));
        }
        for flag in ["async", "module"] {
            if test_case.has_flag(flag) {
                return skipped(format!("SKIP: test has `{}` flag", flag));
            }
        }
        for feature in &test_case.features {
            if let Some(result) = self.skip_list.try_skip(
                feature,
                &[
                    SkipCategory::UnsupportedFeatures,
                    SkipCategory::PermanentUnsupportedFeatures,
                ],
                &task.name,
            ) {
                return Ok(Prepared::Settled(result));
            }
        }

        let rel_dir = task
            .file
            .strip_prefix(tests_home)
            .ok()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        let out_dir = self.config.work_dir.join(rel_dir);
        std::fs::create_dir_all(&out_dir)?;

        let stem = task
            .file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let flags = test_case.flags_suffix();

        let mut variants = Vec::with_capacity(2);
        if test_case.strict_mode.contains(StrictMode::STRICT) {
            let path = out_dir.join(format!("{}.strict{}.js", stem, flags));
            std::fs::write(&path, format!("{}{}", STRICT_DIRECTIVE, test_case.source))?;
            variants.push(SourceVariant { path, strict: true });
        }
        if test_case.strict_mode.contains(StrictMode::NO_STRICT) {
            let path = out_dir.join(format!("{}{}.js", stem, flags));
            std::fs::write(&path, &test_case.source)?;
            variants.push(SourceVariant { path, strict: false });
        }

        Ok(Prepared::Ready {
            variants,
            negative: test_case.negative,
        })
    }
}

/// Run the tests under `paths` with `config`.
pub fn run(config: RunnerConfig, paths: &[PathBuf]) -> Result<Report> {
    Runner::new(config)?.run(paths)
}
