//! Compile-then-execute pipeline
//!
//! Each source variant of a test is compiled with the external compiler and,
//! unless the compiler was expected to reject it, executed with the external
//! runtime. Both phases run under the same timeout. The outcome of each phase
//! is classified against the test's `negative` expectation by
//! [`classify_compile`] and [`classify_execute`]; the first terminal verdict
//! becomes the test's result.

pub mod process;

use crate::error::{Error, Result};
use crate::harness::{Negative, NegativePhase};
use crate::result::{TestCaseResult, TestResultCode};
use process::{run_with_timeout, CapturedOutput, ProcessOutcome};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Default per-phase timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(200);

pub const DEFAULT_COMPILER: &str = "hermesc";
pub const DEFAULT_RUNTIME: &str = "hvm";

const EXTRA_COMPILE_FLAGS: &[&str] = &["-fno-static-builtins"];
const OPT_LEVEL_FLAG: &str = "-O0";
const ES6_ARGS: &[&str] = &["-Xes6-promise", "-Xes6-proxy"];
const EXTRA_RUN_ARGS: &[&str] = &["-Xhermes-internal-test-methods"];
const MICROTASK_FLAG: &str = "-Xmicrotask-queue";
const DISABLE_HANDLE_SAN_FLAG: &str = "-gc-sanitize-handles=0";

/// One rendering of a test written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVariant {
    pub path: PathBuf,
    pub strict: bool,
}

impl SourceVariant {
    /// Where the compiler writes the artifact for this variant
    pub fn artifact_path(&self) -> PathBuf {
        let mut out = self.path.clone().into_os_string();
        out.push(".out");
        PathBuf::from(out)
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Verdict after the compile phase of one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileVerdict {
    /// Compiled cleanly; go on to execute
    Execute,
    /// Failed as the test expected; this variant is done
    ExpectedFailure,
    /// Terminal failure for the whole test
    Fail(CompileFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileFailure {
    /// Non-zero exit that the test did not ask for
    Rejected,
    /// Exit zero although a parse/early error was expected
    UnexpectedSuccess,
}

/// Verdict after the execute phase of one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteVerdict {
    /// Ran cleanly with no expectation; move on to the next variant
    Continue,
    /// Threw at runtime as the test expected; the test passes
    ExpectedFailure,
    /// Threw although no runtime failure was expected
    Failed,
    /// Ran cleanly although a failure was expected
    UnexpectedPass,
}

/// Classify a finished compile against the test's expectation.
pub fn classify_compile(success: bool, negative: Option<&Negative>) -> CompileVerdict {
    let expects_compile_error = negative.is_some_and(|n| n.phase.is_compile_time());
    match (success, expects_compile_error) {
        (true, false) => CompileVerdict::Execute,
        (true, true) => CompileVerdict::Fail(CompileFailure::UnexpectedSuccess),
        (false, true) => CompileVerdict::ExpectedFailure,
        (false, false) => CompileVerdict::Fail(CompileFailure::Rejected),
    }
}

/// Classify a finished execution against the test's expectation.
pub fn classify_execute(success: bool, negative: Option<&Negative>) -> ExecuteVerdict {
    match (success, negative) {
        (true, None) => ExecuteVerdict::Continue,
        (true, Some(_)) => ExecuteVerdict::UnexpectedPass,
        (false, Some(n)) if n.phase == NegativePhase::Runtime => {
            ExecuteVerdict::ExpectedFailure
        }
        (false, _) => ExecuteVerdict::Failed,
    }
}

/// The external compiler and runtime
#[derive(Debug, Clone)]
pub struct Toolchain {
    binary_path: PathBuf,
    compiler: PathBuf,
    runtime: PathBuf,
    timeout: Duration,
}

impl Toolchain {
    pub fn new(
        binary_path: impl Into<PathBuf>,
        compiler_name: &str,
        runtime_name: &str,
        timeout: Duration,
    ) -> Self {
        let binary_path = binary_path.into();
        Self {
            compiler: binary_path.join(compiler_name),
            runtime: binary_path.join(runtime_name),
            binary_path,
            timeout,
        }
    }

    /// Fail fast if either binary is missing
    pub fn check(&self) -> Result<()> {
        for (tool, path) in [("compiler", &self.compiler), ("runtime", &self.runtime)] {
            if !path.is_file() {
                return Err(Error::tool_not_found(tool, path.clone()));
            }
        }
        Ok(())
    }

    fn compile_command(&self, variant: &SourceVariant) -> Command {
        let mut cmd = Command::new(&self.compiler);
        cmd.arg(&variant.path)
            .arg("-emit-binary")
            .arg("-out")
            .arg(variant.artifact_path())
            .args(EXTRA_COMPILE_FLAGS)
            .arg(OPT_LEVEL_FLAG)
            // Each rendering is compiled in the mode it was written for.
            .arg(if variant.strict { "-strict" } else { "-non-strict" });
        cmd
    }

    fn execute_command(&self, artifact: &Path, disable_handle_san: bool) -> Command {
        let mut cmd = Command::new(&self.runtime);
        cmd.arg(artifact)
            .args(ES6_ARGS)
            .args(EXTRA_RUN_ARGS)
            .arg(MICROTASK_FLAG);
        if disable_handle_san {
            cmd.arg(DISABLE_HANDLE_SAN_FLAG);
        }
        cmd.env_clear().env("LC_ALL", "en_US.UTF-8");
        if cfg!(target_os = "linux") {
            cmd.env("ICU_DATA", &self.binary_path);
        }
        cmd
    }

    /// Run every variant in order and produce the test's single result.
    pub fn run_variants(
        &self,
        test_name: &str,
        variants: &[SourceVariant],
        negative: Option<&Negative>,
        disable_handle_san: bool,
    ) -> TestCaseResult {
        for variant in variants {
            match self.compile(test_name, variant, negative) {
                Step::Proceed => {}
                Step::NextVariant => continue,
                Step::Done(result) => return result,
            }
            match self.execute(test_name, variant, negative, disable_handle_san) {
                Step::Proceed | Step::NextVariant => {}
                Step::Done(result) => return result,
            }
        }
        TestCaseResult::passed(test_name)
    }

    fn compile(
        &self,
        test_name: &str,
        variant: &SourceVariant,
        negative: Option<&Negative>,
    ) -> Step {
        let mut cmd = self.compile_command(variant);
        tracing::debug!(test = test_name, command = ?cmd, "compiling");

        let (status, output) = match run_with_timeout(&mut cmd, self.timeout) {
            Ok(ProcessOutcome::Exited { status, output }) => (status, output),
            Ok(ProcessOutcome::TimedOut) => {
                let msg = format!("FAIL: Compilation timed out on {}", variant.path.display());
                return Step::done(test_name, TestResultCode::CompileTimeout, msg, None);
            }
            Err(e) => {
                let msg = format!("FAIL: could not run {}: {}", self.compiler.display(), e);
                return Step::done(test_name, TestResultCode::CompileFailed, msg, None);
            }
        };

        match classify_compile(status.success(), negative) {
            CompileVerdict::Execute => Step::Proceed,
            CompileVerdict::ExpectedFailure => Step::NextVariant,
            CompileVerdict::Fail(CompileFailure::Rejected) => {
                let msg = format!("FAIL: Compilation failed ({}): {:?}", status, cmd);
                Step::done(test_name, TestResultCode::CompileFailed, msg, Some(&output))
            }
            CompileVerdict::Fail(CompileFailure::UnexpectedSuccess) => {
                let msg = format!("FAIL: Compilation failure expected on {}", variant.file_name());
                Step::done(test_name, TestResultCode::CompileFailed, msg, Some(&output))
            }
        }
    }

    fn execute(
        &self,
        test_name: &str,
        variant: &SourceVariant,
        negative: Option<&Negative>,
        disable_handle_san: bool,
    ) -> Step {
        let artifact = variant.artifact_path();
        let mut cmd = self.execute_command(&artifact, disable_handle_san);
        tracing::debug!(test = test_name, command = ?cmd, "executing");

        let (status, output) = match run_with_timeout(&mut cmd, self.timeout) {
            Ok(ProcessOutcome::Exited { status, output }) => (status, output),
            Ok(ProcessOutcome::TimedOut) => {
                let msg = format!("FAIL: Execution of binary timed out for {}", artifact.display());
                return Step::done(test_name, TestResultCode::ExecuteTimeout, msg, None);
            }
            Err(e) => {
                let msg = format!("FAIL: could not run {}: {}", self.runtime.display(), e);
                return Step::done(test_name, TestResultCode::ExecuteFailed, msg, None);
            }
        };

        let name = variant.file_name();
        match classify_execute(status.success(), negative) {
            ExecuteVerdict::Continue => Step::NextVariant,
            ExecuteVerdict::ExpectedFailure => {
                let msg = format!("PASS: execution of {} threw an error as expected", name);
                Step::done(test_name, TestResultCode::TestPassed, msg, None)
            }
            ExecuteVerdict::Failed => {
                let msg = format!("FAIL: Execution of {} threw unexpected error", name);
                Step::done(test_name, TestResultCode::ExecuteFailed, msg, Some(&output))
            }
            ExecuteVerdict::UnexpectedPass => {
                let msg = format!("FAIL: Expected execution of {} to throw", name);
                Step::done(
                    test_name,
                    TestResultCode::TestUnexpectedPassed,
                    msg,
                    Some(&output),
                )
            }
        }
    }
}

/// What the pipeline does after a phase
enum Step {
    /// Go on to the next phase of this variant
    Proceed,
    /// This variant is finished without a verdict
    NextVariant,
    /// Terminal result for the whole test
    Done(TestCaseResult),
}

impl Step {
    fn done(
        test_name: &str,
        code: TestResultCode,
        message: String,
        output: Option<&CapturedOutput>,
    ) -> Self {
        let result = TestCaseResult::new(test_name, code, message);
        let result = match output {
            Some(output) => result.with_output(output.render()),
            None => result,
        };
        tracing::debug!(test = test_name, code = %code, "test finished");
        Step::Done(result)
    }
}
