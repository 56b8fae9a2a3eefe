//! Simulator subprocess harness.
//!
//! One [`ExecutionHarness::run`] call owns one child process and one deadline:
//! - the child leads its own process group, so everything it starts can be killed with it;
//! - stdout and stderr are drained by reader threads so a chatty simulator never blocks on a full pipe;
//! - a waiter thread blocks in `wait()` and hands the exit status over a channel;
//! - the caller blocks in `recv_timeout`, first for the exit status and then for both captures.
//!
//! The deadline covers the whole run, including pipes held open by processes the
//! simulator left behind. If it passes, the process group is killed, the child is
//! reaped, and whatever it had written is thrown away.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::{ExecutionResult, strip_trailing_nul};
use crate::common::{Result, TestbenchError};

/// Which pipe a capture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

type Capture = (Stream, io::Result<Vec<u8>>);

/// Runs the simulator-under-test with a wall-clock limit.
#[derive(Debug, Clone)]
pub struct ExecutionHarness {
    simulator: PathBuf,
    timeout: Duration,
    strip_nul: bool,
}

impl ExecutionHarness {
    /// Creates a harness for `simulator` with a per-run `timeout`.
    pub fn new(simulator: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            simulator: simulator.into(),
            timeout,
            strip_nul: true,
        }
    }

    /// Keeps or strips trailing NUL bytes of captured stdout (stripped by default).
    #[must_use]
    pub fn strip_trailing_nul(mut self, strip: bool) -> Self {
        self.strip_nul = strip;
        self
    }

    /// The simulator executable.
    pub fn simulator(&self) -> &Path {
        &self.simulator
    }

    /// The per-run wall-clock limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `simulator <binary>` and captures its outcome.
    ///
    /// `stdin` is connected to the child when given; otherwise the child gets a pipe
    /// that is closed immediately, so reads see end-of-file.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::Spawn`] if the simulator cannot be started and
    /// [`TestbenchError::Io`] if waiting on it or reading its output fails.
    pub fn run(&self, binary: &Path, stdin: Option<File>) -> Result<ExecutionResult> {
        let stdin = stdin.map_or_else(Stdio::piped, Stdio::from);
        let start = Instant::now();
        // `None` when the timeout is too large to represent; the run is then unbounded.
        let deadline = start.checked_add(self.timeout);

        let mut cmd = Command::new(&self.simulator);
        let _ = cmd
            .arg(binary)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            let _ = cmd.process_group(0);
        }
        let mut child = cmd.spawn().map_err(|source| TestbenchError::Spawn {
            program: self.simulator.clone(),
            source,
        })?;

        drop(child.stdin.take());
        let (cap_tx, cap_rx) = mpsc::channel();
        let mut pending = 0;
        if let Some(pipe) = child.stdout.take() {
            capture(pipe, Stream::Stdout, cap_tx.clone());
            pending += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            capture(pipe, Stream::Stderr, cap_tx.clone());
            pending += 1;
        }
        drop(cap_tx);

        let pid = child.id();
        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let _ = tx.send(child.wait());
        });

        let status = match rx.recv_timeout(remaining(deadline)) {
            Ok(status) => status,
            Err(RecvTimeoutError::Timeout) => {
                terminate(pid);
                let _ = rx.recv();
                let _ = waiter.join();
                return Ok(self.expired(binary, "simulator"));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TestbenchError::WorkerPanicked {
                    stage: "simulator wait",
                });
            }
        };
        let _ = waiter.join();
        let status = status.map_err(|e| TestbenchError::io(&self.simulator, e))?;

        let Some((output, stderr)) = self.collect(&cap_rx, pending, deadline)? else {
            // The child exited but something it started still holds a pipe open.
            terminate(pid);
            return Ok(self.expired(binary, "output pipes"));
        };
        let output = if self.strip_nul {
            strip_trailing_nul(output)
        } else {
            output
        };

        let raw = raw_exit_code(status);
        tracing::debug!(
            binary = %binary.display(),
            exit = raw,
            stdout_bytes = output.len(),
            stderr_bytes = stderr.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "simulator exited"
        );
        Ok(ExecutionResult::completed(raw, output, stderr))
    }

    /// Waits until every pipe reached end-of-file, or returns `None` at the deadline.
    fn collect(
        &self,
        captures: &Receiver<Capture>,
        mut pending: usize,
        deadline: Option<Instant>,
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
        while pending > 0 {
            let (stream, bytes) = match captures.recv_timeout(remaining(deadline)) {
                Ok(capture) => capture,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TestbenchError::WorkerPanicked { stage: "capture" });
                }
            };
            let bytes = bytes.map_err(|e| TestbenchError::io(&self.simulator, e))?;
            match stream {
                Stream::Stdout => stdout = bytes,
                Stream::Stderr => stderr = bytes,
            }
            pending -= 1;
        }
        Ok(Some((stdout, stderr)))
    }

    fn expired(&self, binary: &Path, waiting_on: &'static str) -> ExecutionResult {
        tracing::warn!(
            binary = %binary.display(),
            timeout_ms = self.timeout.as_millis() as u64,
            waiting_on,
            "simulator timed out and was killed"
        );
        // Reader threads are detached; their partial capture is never looked at.
        ExecutionResult::timed_out()
    }
}

fn remaining(deadline: Option<Instant>) -> Duration {
    deadline.map_or(Duration::MAX, |d| d.saturating_duration_since(Instant::now()))
}

fn capture<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<Capture>) {
    let _ = thread::spawn(move || {
        let mut buf = Vec::new();
        let read = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send((stream, read));
    });
}

/// Exit code as a shell would report it: the status code, or `128 + signal`.
fn raw_exit_code(status: ExitStatus) -> i64 {
    if let Some(code) = status.code() {
        return i64::from(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + i64::from(signal);
        }
    }
    1
}

/// Kills the simulator's process group, then the simulator itself.
#[cfg(unix)]
fn terminate(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) only takes integers and touches no memory owned by this process.
    // The group id stays ours while the child is unreaped or any group member is alive.
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pid, error = %io::Error::last_os_error(), "group kill failed");
    }
    // SAFETY: as above; ESRCH after the group kill is expected.
    let _ = unsafe { libc::kill(pid, libc::SIGKILL) };
}

#[cfg(not(unix))]
fn terminate(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .output();
}
