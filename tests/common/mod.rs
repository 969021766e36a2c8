//! Shared test helpers for integration tests
//!
//! [`Fixture`] lays out a miniature Test262 suite in a temporary directory
//! together with a fake compiler and runtime. The fake tools are shell
//! scripts driven by markers in the test source:
//!
//! - `COMPILE_FAIL`: the compiler exits 1
//! - `COMPILE_HANG`: the compiler sleeps, recording the sleeper's pid
//! - `RUNTIME_FAIL`: the runtime exits 1
//! - `RUNTIME_HANG`: the runtime spins forever
//!
//! Every invocation is appended to a log so tests can tell which tools ran.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use test262_runner::progress::ProgressDisplay;
use test262_runner::report::Report;
use test262_runner::skiplist::SkipList;
use test262_runner::{Runner, RunnerConfig};

pub struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let fixture = Self { _dir: dir, root };

        fixture.write("suite/harness/assert.js", "var assert = {};\n");
        fixture.write("suite/harness/sta.js", "function Test262Error() {}\n");
        fs::create_dir_all(fixture.bin_dir()).unwrap();
        fs::create_dir_all(fixture.work_dir()).unwrap();

        let log = fixture.log_path();
        let pid = fixture.pid_path();
        write_script(
            &fixture.bin_dir().join("hermesc"),
            &format!(
                r#"#!/bin/sh
src="$1"
out="$4"
echo "compile $src" >> "{log}"
if grep -q COMPILE_FAIL "$src"; then
  echo "SyntaxError: unexpected token" >&2
  exit 1
fi
if grep -q COMPILE_HANG "$src"; then
  sleep 30 &
  echo $! > "{pid}"
  wait
  exit 0
fi
cp "$src" "$out"
"#,
                log = log.display(),
                pid = pid.display(),
            ),
        );
        // The runtime's environment is cleared, so it sticks to shell builtins.
        write_script(
            &fixture.bin_dir().join("hvm"),
            &format!(
                r#"#!/bin/sh
echo "run $1" >> "{log}"
body="$(while IFS= read -r line; do printf '%s\n' "$line"; done < "$1")"
case "$body" in
  *RUNTIME_FAIL*)
    echo "Uncaught Test262Error" >&2
    exit 1
    ;;
  *RUNTIME_HANG*)
    while :; do :; done
    ;;
esac
echo "ok"
"#,
                log = log.display(),
            ),
        );
        fixture
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn suite(&self) -> PathBuf {
        self.root.join("suite")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join("work")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("tools.log")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root.join("hang.pid")
    }

    /// Write a file relative to the fixture root
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Add a test under `suite/test/`
    pub fn add_test(&self, rel: &str, frontmatter: &str, body: &str) -> PathBuf {
        let content = format!("/*---\n{}---*/\n{}\n", frontmatter, body);
        self.write(&format!("suite/test/{}", rel), &content)
    }

    /// Tool invocations, one per line
    pub fn log(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn invocations(&self, prefix: &str, test_stem: &str) -> usize {
        self.log()
            .iter()
            .filter(|line| line.starts_with(prefix) && line.contains(test_stem))
            .count()
    }

    pub fn config(&self) -> RunnerConfig {
        RunnerConfig {
            binary_path: self.bin_dir(),
            work_dir: self.work_dir(),
            jobs: 4,
            timeout: Duration::from_secs(20),
            ..Default::default()
        }
    }

    pub fn run(&self, config: RunnerConfig, paths: &[PathBuf]) -> Report {
        self.run_with_skip_list(config, SkipList::builtin(), paths)
    }

    pub fn run_with_skip_list(
        &self,
        config: RunnerConfig,
        skip_list: SkipList,
        paths: &[PathBuf],
    ) -> Report {
        Runner::with_skip_list(config, skip_list)
            .run_with(paths, |total| {
                ProgressDisplay::new(io::sink(), io::sink(), total, false, false)
            })
            .unwrap()
    }
}

/// Whether a process with `pid` still exists and is not a zombie
pub fn process_alive(pid: i32) -> bool {
    if let Ok(stat) = fs::read_to_string(format!("/proc/{}/stat", pid)) {
        return stat
            .rsplit_once(") ")
            .is_some_and(|(_, rest)| !rest.starts_with('Z'));
    }
    if Path::new("/proc/self").exists() {
        return false;
    }
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
