//! Conformance testbench for instruction-set simulators.
//!
//! This crate drives a simulator-under-test through a directory of conformance tests:
//! 1. **Fixtures:** Discovers test sources and resolves expected-output and stdin fixtures by name.
//! 2. **Build:** Turns every source into a binary image with an external toolchain, concurrently.
//! 3. **Execution:** Runs the simulator per binary with a wall-clock timeout and full I/O capture.
//! 4. **Comparison:** Judges exit code and standard output against the fixture.
//! 5. **Reporting:** Streams one line per test and a final pass-rate summary.
//!
//! The [`Testbench`] wires these stages into one configurable pipeline.

/// Shared types (error taxonomy).
pub mod common;
/// Runner configuration (defaults, layout templates, build/exec/compare settings).
pub mod config;
/// Test discovery, fixture resolution and fixture parsing.
pub mod fixture;
/// Toolchain invocation and the concurrent build stage.
pub mod build;
/// Simulator subprocess execution with timeout and capture.
pub mod exec;
/// Verdicts and actual-vs-expected comparison.
pub mod compare;
/// Streaming report lines, summary and JSON run report.
pub mod report;
/// End-to-end orchestration of the stages.
pub mod pipeline;

/// Root configuration type; use `RunnerConfig::default()` or load it from JSON.
pub use crate::config::RunnerConfig;
/// One discovered conformance test.
pub use crate::fixture::TestCase;
/// Categorical outcome of judging one test.
pub use crate::compare::Verdict;
/// Streaming reporter; construct with `Reporter::new(stdout, stderr)`.
pub use crate::report::Reporter;
/// The orchestration engine; construct with `Testbench::new`.
pub use crate::pipeline::Testbench;
