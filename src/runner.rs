//! External command execution with a hard time bound.
//!
//! [`CommandRunner`] is the capability seam: the pipeline only ever asks a
//! runner to execute an [`Invocation`], so tests substitute scripted fakes.
//! [`run_safely`] folds every possible fault into a [`RunOutcome`] for
//! callers that only care about success and a message.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{HarvestError, Result};
use crate::model::ExecutionOutcome;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for a pipe to drain after the process is gone. Processes
/// that leave children holding the pipe open would otherwise block forever.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

const MAX_STDERR_CHARS: usize = 2000;

/// A command line to run, where, and for how long at most.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(argv: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: None,
            timeout,
        }
    }

    /// Split a command string on whitespace. No quoting rules apply.
    pub fn from_command_line(line: &str, timeout: Duration) -> Self {
        Self::new(line.split_whitespace(), timeout)
    }

    #[must_use]
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Executes invocations. Implementations return `Err` only when the process
/// could not be run at all; nonzero exits and timeouts are outcomes.
pub trait CommandRunner {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionOutcome>;
}

/// Runs real processes via `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionOutcome> {
        let (program, args) = invocation
            .argv
            .split_first()
            .ok_or_else(|| HarvestError::Other("empty command line".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        debug!(command = %invocation, timeout_secs = invocation.timeout.as_secs(), "spawning");
        let start = Instant::now();
        let mut child = cmd.spawn()?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if start.elapsed() >= invocation.timeout {
                timed_out = true;
                warn!(command = %invocation, "timed out, killing");
                let _ = child.kill();
                break child.wait()?;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let outcome = ExecutionOutcome {
            stdout: collect(stdout),
            stderr: collect(stderr),
            exit_code: status.code(),
            timed_out,
            elapsed: start.elapsed(),
        };
        debug!(
            command = %invocation,
            exit_code = ?outcome.exit_code,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "finished"
        );
        Ok(outcome)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

fn collect(rx: mpsc::Receiver<Vec<u8>>) -> String {
    rx.recv_timeout(DRAIN_GRACE)
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// Uniform success / failure / timeout classification of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success,
    Failed { code: Option<i32>, stderr: String },
    TimedOut(Duration),
    /// The command could not be started or waited on.
    Error(String),
}

impl RunOutcome {
    pub fn from_execution(outcome: &ExecutionOutcome, timeout: Duration) -> Self {
        if outcome.timed_out {
            RunOutcome::TimedOut(timeout)
        } else if outcome.exit_code == Some(0) {
            RunOutcome::Success
        } else {
            RunOutcome::Failed {
                code: outcome.exit_code,
                stderr: outcome.stderr.clone(),
            }
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    /// Human-readable error text; empty on success.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            RunOutcome::Success => String::new(),
            RunOutcome::Failed { code, stderr } => {
                let stderr = truncate(stderr.trim(), MAX_STDERR_CHARS);
                match code {
                    Some(code) => format!("Exit code {code}. stderr: {stderr}"),
                    None => format!("Terminated by signal. stderr: {stderr}"),
                }
            }
            RunOutcome::TimedOut(after) => format!("Timeout after {}s", after.as_secs()),
            RunOutcome::Error(e) => format!("OS error: {e}"),
        }
    }
}

/// Run an invocation, never failing: spawn errors become [`RunOutcome::Error`].
pub fn run_safely(runner: &dyn CommandRunner, invocation: &Invocation) -> RunOutcome {
    match runner.execute(invocation) {
        Ok(outcome) => RunOutcome::from_execution(&outcome, invocation.timeout),
        Err(e) => RunOutcome::Error(e.to_string()),
    }
}

/// Cut `text` to at most `max` characters without splitting a code point.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line_splits_on_whitespace() {
        let inv = Invocation::from_command_line("npm  test -- --coverage", Duration::from_secs(1));
        assert_eq!(inv.argv, vec!["npm", "test", "--", "--coverage"]);
        assert_eq!(inv.to_string(), "npm test -- --coverage");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn test_outcome_classification() {
        let timeout = Duration::from_secs(7);
        let ok = ExecutionOutcome {
            exit_code: Some(0),
            ..Default::default()
        };
        assert_eq!(RunOutcome::from_execution(&ok, timeout), RunOutcome::Success);
        assert_eq!(RunOutcome::Success.message(), "");

        let failed = ExecutionOutcome {
            exit_code: Some(2),
            stderr: "  boom \n".to_string(),
            ..Default::default()
        };
        let outcome = RunOutcome::from_execution(&failed, timeout);
        assert_eq!(outcome.message(), "Exit code 2. stderr: boom");

        let slow = ExecutionOutcome {
            timed_out: true,
            ..Default::default()
        };
        let outcome = RunOutcome::from_execution(&slow, timeout);
        assert_eq!(outcome, RunOutcome::TimedOut(timeout));
        assert_eq!(outcome.message(), "Timeout after 7s");
    }

    #[test]
    fn test_missing_program_is_an_error_outcome() {
        let inv = Invocation::new(["covharvest-no-such-program-xyz"], Duration::from_secs(5));
        let outcome = run_safely(&SystemRunner, &inv);
        assert!(matches!(outcome, RunOutcome::Error(_)));
        assert!(outcome.message().starts_with("OS error:"));
    }

    #[test]
    fn test_empty_command_is_an_error_outcome() {
        let inv = Invocation::new(Vec::<String>::new(), Duration::from_secs(5));
        assert!(matches!(run_safely(&SystemRunner, &inv), RunOutcome::Error(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output_and_exit_code() {
        let inv = Invocation::new(
            ["sh", "-c", "echo out; echo err 1>&2; exit 3"],
            Duration::from_secs(10),
        );
        let outcome = SystemRunner.execute(&inv).unwrap();
        assert_eq!(outcome.stdout.trim(), "out");
        assert_eq!(outcome.stderr.trim(), "err");
        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_enforces_timeout() {
        let inv = Invocation::new(["sleep", "10"], Duration::from_millis(200));
        let outcome = SystemRunner.execute(&inv).unwrap();
        assert!(outcome.timed_out);
        assert!(outcome.elapsed < Duration::from_secs(5));
        assert!(matches!(
            RunOutcome::from_execution(&outcome, inv.timeout),
            RunOutcome::TimedOut(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_uses_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let inv = Invocation::new(["ls"], Duration::from_secs(10)).in_dir(dir.path());
        let outcome = SystemRunner.execute(&inv).unwrap();
        assert!(outcome.stdout.contains("marker.txt"));
    }
}
