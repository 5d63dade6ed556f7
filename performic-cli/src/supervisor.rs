//! Child Process Supervision
//!
//! Runs an external program (kernel or hook), streams its stdout line by line and
//! enforces a hard deadline. On timeout the child gets SIGTERM, a short window
//! to flush its last lines, then SIGKILL. Both pipes are drained to EOF so a
//! chatty child never blocks or dies on a closed pipe.

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use performic_core::KernelError;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Window granted after SIGTERM before the child is killed
pub const TERMINATE_DRAIN: Duration = Duration::from_millis(500);

/// Cap on captured stderr, for error messages
const STDERR_LIMIT: usize = 16 * 1024;

/// Longest stdout line forwarded in one piece; longer lines arrive in chunks
const LINE_LIMIT: usize = performic_payload::MAX_PAYLOAD_SIZE;

/// Stdout lines buffered between the reader thread and the consumer
const LINE_BACKLOG: usize = 64;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("No command configured")]
    EmptyCommand,

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("payload exceeds {0} bytes")]
    OutputTooLarge(usize),

    #[error("Process exited with {status}{}", format_stderr(.stderr))]
    Exited { status: ExitStatus, stderr: String },
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

impl From<SupervisorError> for KernelError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::SpawnFailed(io) => KernelError::Launch(io),
            SupervisorError::Timeout(limit) => KernelError::TimedOut(limit),
            other => KernelError::Failed(other.to_string()),
        }
    }
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
#[cfg(unix)]
fn send_sigterm(child: &mut Child) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// No SIGTERM equivalent; terminate outright.
#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) -> Result<(), std::io::Error> {
    child.kill()
}

/// A running kernel process with its stdout streamed over a channel
pub struct ProcessHandle {
    child: Child,
    lines: Receiver<String>,
    stderr: Option<JoinHandle<String>>,
    timeout: Duration,
}

impl ProcessHandle {
    /// Spawn `argv[0]` with the remaining arguments and extra environment
    pub fn spawn(
        argv: &[String],
        envs: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Self, SupervisorError> {
        let (program, args) = argv.split_first().ok_or(SupervisorError::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(args)
            .envs(envs.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (tx, lines) = bounded(LINE_BACKLOG);
        if let Some(stdout) = child.stdout.take() {
            thread::Builder::new()
                .name("performic-stdout".to_string())
                .spawn(move || {
                    for line in stdout_lines(stdout) {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                })?;
        }

        let stderr = match child.stderr.take() {
            Some(stderr) => Some(
                thread::Builder::new()
                    .name("performic-stderr".to_string())
                    .spawn(move || drain_stderr(stderr))?,
            ),
            None => None,
        };

        debug!(program = %program, pid = child.id(), "process spawned");
        Ok(Self {
            child,
            lines,
            stderr,
            timeout,
        })
    }

    /// Feed every stdout line to `on_line` until the process exits.
    ///
    /// Fails on timeout or a non-zero exit status.
    pub fn for_each_line(&mut self, mut on_line: impl FnMut(&str)) -> Result<(), SupervisorError> {
        self.drive(|line| {
            on_line(line);
            true
        })
        .map(|_| ())
    }

    /// Collect stdout into one string, lines joined by `\n`.
    ///
    /// Stops reading and kills the child once the output passes `limit` bytes.
    pub fn collect_stdout(&mut self, limit: usize) -> Result<String, SupervisorError> {
        let mut output = String::new();
        let completed = self.drive(|line| {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(line);
            output.len() <= limit
        })?;
        if !completed {
            return Err(SupervisorError::OutputTooLarge(limit));
        }
        Ok(output)
    }

    /// Pump lines into `on_line` until EOF. Returns `Ok(false)` when
    /// `on_line` gave up and the child was killed.
    fn drive(&mut self, mut on_line: impl FnMut(&str) -> bool) -> Result<bool, SupervisorError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    if !on_line(&line) {
                        warn!(pid = self.child.id(), "process output over limit; terminating");
                        self.terminate();
                        return Ok(false);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(self.handle_timeout(|line| {
                        on_line(line);
                    }));
                }
            }
        }

        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if status.success() {
            if !stderr.is_empty() {
                debug!(%stderr, "process stderr");
            }
            Ok(true)
        } else {
            Err(SupervisorError::Exited { status, stderr })
        }
    }

    /// Handle timeout: send SIGTERM, drain remaining lines for a short window, then SIGKILL.
    fn handle_timeout(&mut self, mut on_line: impl FnMut(&str)) -> SupervisorError {
        warn!(pid = self.child.id(), timeout = ?self.timeout, "process timed out");
        // Ignore the error: the child may already be gone
        let _ = send_sigterm(&mut self.child);

        let drain_deadline = Instant::now() + TERMINATE_DRAIN;
        loop {
            let remaining = drain_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.lines.recv_timeout(remaining) {
                Ok(line) => on_line(&line),
                Err(_) => break,
            }
        }

        if self.is_alive() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        SupervisorError::Timeout(self.timeout)
    }

    /// Kill the child and reap it
    fn terminate(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }

    /// Check if the process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Stdout as lossy UTF-8 lines, each at most [`LINE_LIMIT`] bytes
fn stdout_lines(stdout: ChildStdout) -> impl Iterator<Item = String> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    std::iter::from_fn(move || {
        buf.clear();
        match (&mut reader).take(LINE_LIMIT as u64).read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                Some(String::from_utf8_lossy(&buf).into_owned())
            }
        }
    })
}

/// Read stderr to EOF, keeping the first [`STDERR_LIMIT`] bytes
fn drain_stderr(mut stderr: ChildStderr) -> String {
    let mut captured = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stderr.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let room = STDERR_LIMIT.saturating_sub(captured.len());
                captured.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&captured).trim().to_string()
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            // Graceful: SIGTERM first, brief wait, then SIGKILL
            let _ = send_sigterm(&mut self.child);
            thread::sleep(Duration::from_millis(50));
            if self.is_alive() {
                let _ = self.child.kill();
            }
            let _ = self.child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const LIMIT: usize = 1024 * 1024;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_collects_stdout() {
        let mut handle =
            ProcessHandle::spawn(&sh("echo one; echo two"), &[], Duration::from_secs(10)).unwrap();
        assert_eq!(handle.collect_stdout(LIMIT).unwrap(), "one\ntwo");
    }

    #[test]
    fn test_passes_environment() {
        let mut handle = ProcessHandle::spawn(
            &sh("echo $PERFORMIC_TEST_VALUE"),
            &[("PERFORMIC_TEST_VALUE", "42")],
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(handle.collect_stdout(LIMIT).unwrap(), "42");
    }

    #[test]
    fn test_non_zero_exit_carries_stderr() {
        let mut handle =
            ProcessHandle::spawn(&sh("echo boom >&2; exit 3"), &[], Duration::from_secs(10))
                .unwrap();
        match handle.collect_stdout(LIMIT) {
            Err(SupervisorError::Exited { status, stderr }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_process() {
        let mut handle =
            ProcessHandle::spawn(&sh("echo early; sleep 30"), &[], Duration::from_millis(200))
                .unwrap();
        let begin = Instant::now();
        let mut seen = Vec::new();
        let err = handle
            .for_each_line(|line| seen.push(line.to_string()))
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Timeout(_)));
        assert_eq!(seen, vec!["early"]);
        assert!(begin.elapsed() < Duration::from_secs(5));
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_heavy_stderr_does_not_break_the_child() {
        // ~64 KiB of stderr, well past the captured prefix
        let script = "i=0; while [ $i -lt 1024 ]; do \
            echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx' >&2; \
            i=$((i+1)); done; echo '{\"success\":true}'";
        let mut handle = ProcessHandle::spawn(&sh(script), &[], Duration::from_secs(10)).unwrap();
        assert_eq!(handle.collect_stdout(LIMIT).unwrap(), r#"{"success":true}"#);
    }

    #[test]
    fn test_stderr_capture_is_capped() {
        let script = "head -c 65536 /dev/zero | tr '\\0' 'e' >&2; printf '\\377\\n' >&2; exit 1";
        let mut handle = ProcessHandle::spawn(&sh(script), &[], Duration::from_secs(10)).unwrap();
        match handle.collect_stdout(LIMIT) {
            Err(SupervisorError::Exited { status, stderr }) => {
                assert_eq!(status.code(), Some(1));
                assert_eq!(stderr.len(), STDERR_LIMIT);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_output_limit_kills_runaway_process() {
        let mut handle =
            ProcessHandle::spawn(&sh("yes 0123456789"), &[], Duration::from_secs(30)).unwrap();
        let begin = Instant::now();
        let err = handle.collect_stdout(64 * 1024).unwrap_err();

        assert!(matches!(err, SupervisorError::OutputTooLarge(limit) if limit == 64 * 1024));
        assert_eq!(err.to_string(), "payload exceeds 65536 bytes");
        assert!(begin.elapsed() < Duration::from_secs(10));
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_invalid_utf8_stdout_is_lossy() {
        let mut handle =
            ProcessHandle::spawn(&sh("printf 'a\\377b\\n'"), &[], Duration::from_secs(10))
                .unwrap();
        assert_eq!(handle.collect_stdout(LIMIT).unwrap(), "a\u{FFFD}b");
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(
            ProcessHandle::spawn(&[], &[], Duration::from_secs(1)),
            Err(SupervisorError::EmptyCommand)
        ));
    }

    #[test]
    fn test_maps_to_kernel_error() {
        assert!(matches!(
            KernelError::from(SupervisorError::Timeout(Duration::from_secs(1))),
            KernelError::TimedOut(_)
        ));
        assert!(matches!(
            KernelError::from(SupervisorError::EmptyCommand),
            KernelError::Failed(_)
        ));
        assert!(matches!(
            KernelError::from(SupervisorError::OutputTooLarge(16)),
            KernelError::Failed(message) if message == "payload exceeds 16 bytes"
        ));
    }
}
