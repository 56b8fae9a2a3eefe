//! Common types shared by every stage of the testbench.
//!
//! Currently this is the error taxonomy: fixture errors (discovery and parsing),
//! build failures, and the top-level [`TestbenchError`].

/// Error types for fixtures, builds and the run as a whole.
pub mod error;

pub use error::{BuildFailure, FixtureError, Result, TestbenchError};
