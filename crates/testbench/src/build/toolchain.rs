//! Toolchain abstraction.
//!
//! The assembler/compiler is an opaque external program. [`Toolchain`] is the seam the
//! build stage calls through; [`CommandToolchain`] runs a command template per test.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

use crate::common::BuildFailure;
use crate::config::BuildConfig;
use crate::fixture::TestCase;

/// Longest toolchain diagnostic kept in a build failure, in bytes.
const DIAGNOSTIC_TAIL: usize = 2048;

/// Turns one test source into a binary image.
///
/// Implementors must be `Send + Sync`: builds run concurrently on a worker pool and
/// share one toolchain.
pub trait Toolchain: Send + Sync {
    /// Builds `case` so that its binary ends up at `binary`.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildFailure`] when no binary could be produced.
    fn build(&self, case: &TestCase, binary: &Path) -> Result<(), BuildFailure>;
}

/// Runs an external command per test, e.g. `make test/bin/add.mips.bin`.
///
/// Arguments may contain `{source}`, `{binary}` and `{id}`; they are substituted
/// before the command is spawned. Standard output and error are captured and only
/// surface in the failure diagnostic and `debug` logs.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    command: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandToolchain {
    /// Creates a toolchain from an argv template.
    pub fn new(command: Vec<String>, working_dir: Option<PathBuf>) -> Self {
        Self {
            command,
            working_dir,
        }
    }

    /// Creates a toolchain from the build section of the configuration.
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.command.clone(), config.working_dir.clone())
    }

    /// The argv for one test after placeholder substitution.
    pub fn argv(&self, case: &TestCase, binary: &Path) -> Vec<String> {
        let source = case.source_path.display().to_string();
        let binary = binary.display().to_string();
        self.command
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source)
                    .replace("{binary}", &binary)
                    .replace("{id}", &case.id)
            })
            .collect()
    }
}

impl Toolchain for CommandToolchain {
    fn build(&self, case: &TestCase, binary: &Path) -> Result<(), BuildFailure> {
        let argv = self.argv(case, binary);
        let (program, args) = argv.split_first().ok_or(BuildFailure::EmptyCommand)?;

        let mut cmd = Command::new(program);
        let _ = cmd.args(args);
        if let Some(dir) = &self.working_dir {
            let _ = cmd.current_dir(dir);
        }

        let start = Instant::now();
        let output = cmd.output().map_err(|source| BuildFailure::Spawn {
            program: program.clone(),
            source,
        })?;
        tracing::debug!(
            id = %case.id,
            status = %output.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "toolchain finished"
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(BuildFailure::Exited {
                status: output.status.to_string(),
                diagnostic: diagnostic_tail(&output),
            })
        }
    }
}

/// Last [`DIAGNOSTIC_TAIL`] bytes of stderr, or of stdout when stderr is empty.
fn diagnostic_tail(output: &Output) -> String {
    let stream = if output.stderr.iter().all(u8::is_ascii_whitespace) {
        &output.stdout
    } else {
        &output.stderr
    };
    let start = stream.len().saturating_sub(DIAGNOSTIC_TAIL);
    String::from_utf8_lossy(&stream[start..]).trim().to_string()
}
