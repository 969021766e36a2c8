//! Live progress output while tests run
//!
//! The header, verbose per-test lines and the final timing go to the report
//! stream (stdout). The `Testing: [done/total]` counter is redrawn in place
//! on the status stream (stderr), and only when that stream is interactive.

use crate::result::{ResultCategory, TestCaseResult};
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

/// Tracks completed tests and prints progress
pub struct ProgressDisplay<O: Write, S: Write> {
    out: O,
    status: S,
    total: usize,
    completed: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    verbose: bool,
    redraw: bool,
    start: Instant,
}

impl ProgressDisplay<io::Stdout, io::Stderr> {
    /// Progress on the process's stdout and stderr
    pub fn stdio(total: usize, verbose: bool) -> Self {
        let status = io::stderr();
        let redraw = status.is_terminal();
        Self::new(io::stdout(), status, total, verbose, redraw)
    }
}

impl<O: Write, S: Write> ProgressDisplay<O, S> {
    pub fn new(out: O, status: S, total: usize, verbose: bool, redraw: bool) -> Self {
        Self {
            out,
            status,
            total,
            completed: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            verbose,
            redraw,
            start: Instant::now(),
        }
    }

    /// Print the run header and restart the clock.
    pub fn start(&mut self, jobs: usize) {
        let _ = writeln!(
            self.out,
            "-- Testing: {} tests, max {} concurrent tasks --",
            self.total, jobs
        );
        self.start = Instant::now();
    }

    /// Account for one finished test.
    pub fn update(&mut self, result: &TestCaseResult) {
        self.completed += 1;
        match result.code.category() {
            ResultCategory::Success => self.passed += 1,
            ResultCategory::Failure => self.failed += 1,
            ResultCategory::Skip => self.skipped += 1,
        }

        if self.verbose {
            self.clear_status();
            let _ = writeln!(self.out, "{}: {}", result.code, result.test_name);
            if result.code.is_failure() {
                if !result.message.is_empty() {
                    let _ = writeln!(self.out, "{}", result.message);
                }
                if !result.output.is_empty() {
                    let _ = writeln!(self.out, "{}", result.output.trim_end());
                }
            }
        }

        if self.redraw {
            let _ = write!(self.status, "\r{}", self.counter_line());
            let _ = self.status.flush();
        }
    }

    /// `Testing: [done/total] pass/fail/skip`
    pub fn counter_line(&self) -> String {
        format!(
            "Testing: [{}/{}] {}/{}/{}",
            self.completed, self.total, self.passed, self.failed, self.skipped
        )
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    fn clear_status(&mut self) {
        if self.redraw && self.completed > 1 {
            let _ = write!(self.status, "\r\x1b[2K");
        }
    }

    /// End the counter line and print the elapsed time.
    pub fn finish(&mut self) -> Duration {
        if self.redraw {
            let _ = writeln!(self.status);
        }
        let elapsed = self.start.elapsed();
        let _ = writeln!(self.out, "Testing time: {:.2}", elapsed.as_secs_f64());
        let _ = self.out.flush();
        elapsed
    }
}
