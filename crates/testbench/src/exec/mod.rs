//! Execution stage.
//!
//! This module runs the simulator-under-test. It provides:
//! 1. **Harness:** Spawns `simulator <binary>` with the stdin fixture or an empty pipe.
//! 2. **Timeout:** A blocking wait bounded by a per-run deadline; expired runs are killed.
//! 3. **Normalization:** 8-bit exit codes and NUL-stripped standard output.

/// Subprocess spawning, capture and timeout enforcement.
pub mod harness;

pub use harness::ExecutionHarness;

use serde::Serialize;

use crate::fixture::expected::reduce_exit_code;

/// Observed outcome of one simulator run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Exit status reduced modulo 256.
    pub exit_code: u8,
    /// Standard output with trailing NUL bytes removed.
    pub output: Vec<u8>,
    /// Standard error, surfaced verbatim and never judged.
    pub stderr: Vec<u8>,
    /// The run exceeded its deadline and was killed. Output and stderr are then empty.
    pub timed_out: bool,
}

impl ExecutionResult {
    /// A completed run. `raw_exit_code` is folded into 8 bits.
    pub fn completed(raw_exit_code: i64, output: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code: reduce_exit_code(raw_exit_code),
            output,
            stderr,
            timed_out: false,
        }
    }

    /// A run that was killed at its deadline; partial capture is discarded.
    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }
}

/// Removes trailing NUL bytes, the padding of simulators that dump a fixed-size buffer.
pub fn strip_trailing_nul(mut bytes: Vec<u8>) -> Vec<u8> {
    let keep = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    bytes.truncate(keep);
    bytes
}
