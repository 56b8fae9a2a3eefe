//! Error taxonomy for the testbench.
//!
//! This module separates failures by where they stop a test:
//! 1. **Fixture errors:** Missing or corrupt expected-output fixtures and unreadable fixture files.
//!    The affected test is reported as `Error` and never executed.
//! 2. **Build failures:** The toolchain could not produce a binary. The test is reported as `BuildError`.
//! 3. **Testbench errors:** Everything else, from spawning the simulator to writing the report.
//!
//! Timeouts and output mismatches are verdicts, not errors; see [`crate::compare::Verdict`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = TestbenchError> = std::result::Result<T, E>;

/// Problems with the expected-result or stdin fixture of one test.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// No expected-output fixture exists for the test.
    #[error("no expected-result fixture at {}", path.display())]
    Missing {
        /// Path the naming convention resolved to.
        path: PathBuf,
    },

    /// The fixture exists but does not follow the `exit code line + output` format.
    #[error("corrupt fixture {}: {reason}", path.display())]
    Corrupt {
        /// Fixture path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The fixture could not be read.
    #[error("cannot read fixture {}: {source}", path.display())]
    Io {
        /// Fixture path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Reasons the build stage produced no runnable binary for a test.
#[derive(Debug, Error)]
pub enum BuildFailure {
    /// The toolchain program could not be started.
    #[error("cannot start toolchain `{program}`: {source}")]
    Spawn {
        /// Program name from the command template.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The toolchain ran and exited unsuccessfully.
    #[error("toolchain exited with {status}: {diagnostic}")]
    Exited {
        /// Rendered exit status (`exit status: 2`, `signal: 9`, ...).
        status: String,
        /// Tail of the toolchain's standard error (or standard output when stderr was empty).
        diagnostic: String,
    },

    /// The toolchain reported success but left no binary behind.
    #[error("toolchain succeeded but produced no binary at {}", path.display())]
    MissingBinary {
        /// Expected binary location.
        path: PathBuf,
    },

    /// Prebuilt mode: the binary was never built.
    #[error("no prebuilt binary at {}", path.display())]
    NotBuilt {
        /// Expected binary location.
        path: PathBuf,
    },

    /// The command template is empty.
    #[error("empty toolchain command")]
    EmptyCommand,

    /// The binary output directory could not be created.
    #[error("cannot create binary directory {}: {reason}", path.display())]
    OutputDir {
        /// Binary directory.
        path: PathBuf,
        /// Rendered I/O error.
        reason: String,
    },

    /// The build worker handling this test died.
    #[error("build worker aborted")]
    Aborted,
}

/// Top-level error type of the testbench.
#[derive(Debug, Error)]
pub enum TestbenchError {
    /// A file or directory needed by the run could not be accessed.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A fixture problem surfaced while executing a test.
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// The simulator-under-test could not be started.
    #[error("cannot start simulator {}: {source}", program.display())]
    Spawn {
        /// Simulator executable.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The JSON configuration could not be parsed.
    #[error("invalid configuration {origin}: {source}")]
    Config {
        /// File path or `<inline>`.
        origin: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The run report could not be encoded as JSON.
    #[error("cannot encode run report: {0}")]
    Encode(#[source] serde_json::Error),

    /// A test was handed to the reporter a second time.
    #[error("test `{id}` was already reported")]
    DuplicateReport {
        /// Canonical test id.
        id: String,
    },

    /// Writing to the report or error stream failed.
    #[error("cannot write report: {0}")]
    Report(#[from] io::Error),

    /// A worker thread panicked.
    #[error("{stage} worker panicked")]
    WorkerPanicked {
        /// Stage the worker belonged to.
        stage: &'static str,
    },
}

impl TestbenchError {
    /// Wraps an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
