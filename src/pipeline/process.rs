//! Running a toolchain process under a deadline
//!
//! The child is started in its own process group so that, on timeout, the
//! whole group (including anything the tool spawned) can be killed at once.
//! stdout and stderr are drained on background threads so a chatty tool
//! never blocks on a full pipe.

use crossbeam_channel::{bounded, Receiver};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output may stay open after the process has exited before the
/// rest of its process group is killed
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How long to wait for the readers once the process group is gone
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Captured output of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    /// Render both streams for a failure message; empty streams are omitted.
    pub fn render(&self) -> String {
        let mut output = String::new();
        if !self.stdout.is_empty() {
            output.push_str("stdout:\n ");
            output.push_str(&String::from_utf8_lossy(&self.stdout));
        }
        if !self.stderr.is_empty() {
            output.push_str("stderr:\n ");
            output.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        output
    }
}

/// Result of waiting on a process
#[derive(Debug)]
pub enum ProcessOutcome {
    Exited {
        status: ExitStatus,
        output: CapturedOutput,
    },
    /// The deadline passed; the process group has been killed and reaped.
    TimedOut,
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = bounded(1);
    match stream {
        Some(mut stream) => {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = stream.read_to_end(&mut buffer);
                let _ = tx.send(buffer);
            });
        }
        None => {
            let _ = tx.send(Vec::new());
        }
    }
    rx
}

/// SIGKILL every process left in the group led by `pid`.
fn signal_process_group(pid: u32) {
    #[cfg(unix)]
    {
        let pgid = pid as libc::pid_t;
        // SAFETY: signalling a process group we created; no memory is touched.
        let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if rc != 0 {
            let error = io::Error::last_os_error();
            // ESRCH: the group is already empty.
            if error.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!(pid = pgid, %error, "failed to kill process group");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

fn kill_process_group(child: &mut Child) {
    signal_process_group(child.id());
    let _ = child.kill();
}

/// Spawn `cmd` and wait for it for at most `timeout`.
///
/// Only spawn and wait failures are reported as `Err`; a non-zero exit is an
/// ordinary [`ProcessOutcome::Exited`].
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<ProcessOutcome> {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    tracing::trace!(pid = child.id(), "spawned toolchain process");

    let stdout_rx = spawn_reader(child.stdout.take());
    let stderr_rx = spawn_reader(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() >= timeout {
            kill_process_group(&mut child);
            child.wait()?;
            tracing::debug!(pid = child.id(), ?timeout, "process timed out and was killed");
            return Ok(ProcessOutcome::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    };

    let deadline = Instant::now() + DRAIN_GRACE;
    let mut stdout = stdout_rx.recv_deadline(deadline).ok();
    let mut stderr = stderr_rx.recv_deadline(deadline).ok();
    if stdout.is_none() || stderr.is_none() {
        // Something the tool spawned still holds the pipes open.
        tracing::debug!(pid = child.id(), "output still open after exit, killing process group");
        signal_process_group(child.id());
        let deadline = Instant::now() + KILL_GRACE;
        let drain = |rx: &Receiver<Vec<u8>>| rx.recv_deadline(deadline).ok();
        stdout = stdout.or_else(|| drain(&stdout_rx));
        stderr = stderr.or_else(|| drain(&stderr_rx));
    }
    let output = CapturedOutput {
        stdout: stdout.unwrap_or_default(),
        stderr: stderr.unwrap_or_default(),
    };
    Ok(ProcessOutcome::Exited { status, output })
}
