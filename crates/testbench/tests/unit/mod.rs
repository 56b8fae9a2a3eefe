//! # Unit Components
//!
//! One module per testbench stage, plus end-to-end pipeline runs.

/// Build stage: command toolchain and concurrent driver.
pub mod build;

/// Comparator: verdict rules and exit-code folding.
pub mod compare;





/// Report lines, diagnostics and summary.
pub mod report;
