//! Run aggregates and the machine-readable run report.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::common::{Result, TestbenchError};
use crate::compare::Verdict;

/// Aggregate counters of a run.
///
/// Only ever incremented, one verdict at a time, so `pass_count <= count` holds at
/// every point of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Tests reported.
    pub count: u64,
    /// Tests that passed.
    pub pass_count: u64,
    /// Tests whose exit code or output mismatched.
    pub failed: u64,
    /// Tests whose build failed.
    pub build_errors: u64,
    /// Tests killed at their deadline.
    pub timeouts: u64,
    /// Tests that could not be judged.
    pub errors: u64,
}

impl Summary {
    /// Counts one verdict.
    pub fn add(&mut self, verdict: Verdict) {
        self.count += 1;
        match verdict {
            Verdict::Pass => self.pass_count += 1,
            Verdict::Fail => self.failed += 1,
            Verdict::BuildError => self.build_errors += 1,
            Verdict::Timeout => self.timeouts += 1,
            Verdict::Error => self.errors += 1,
        }
    }

    /// Pass rate in whole percent (truncating), or `None` for a run without tests.
    pub fn percentage(&self) -> Option<u64> {
        (self.count > 0).then(|| 100 * self.pass_count / self.count)
    }

    /// Whether every reported test passed (vacuously true for an empty run).
    pub fn all_passed(&self) -> bool {
        self.pass_count == self.count
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test cases passed: {}/{} -- ", self.pass_count, self.count)?;
        match self.percentage() {
            Some(pct) => write!(f, "{pct}%"),
            None => f.write_str("N/A"),
        }
    }
}

/// Per-test entry of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    /// Canonical test id.
    pub id: String,
    /// Instruction tag.
    pub instruction: String,
    /// Final verdict.
    pub verdict: Verdict,
    /// Author from the source header.
    pub author: String,
    /// Description from the source header.
    pub description: String,
    /// Exit-code sub-check, when the test was compared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code_pass: Option<bool>,
    /// Output sub-check, when the test was compared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_pass: Option<bool>,
    /// Wall-clock time spent executing (zero if the test never ran).
    pub duration_ms: u64,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Aggregate counters.
    pub summary: Summary,
    /// One record per reported test, in reporting order.
    pub tests: Vec<TestRecord>,
    /// Why discovery failed, if the source directory could not be listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_error: Option<String>,
}

impl RunReport {
    /// Serializes the report as pretty JSON into `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::Io`] if the file or its directory cannot be written.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TestbenchError::io(parent, e))?;
        }
        let mut json = serde_json::to_string_pretty(self).map_err(TestbenchError::Encode)?;
        json.push('\n');
        std::fs::write(path, json).map_err(|e| TestbenchError::io(path, e))
    }
}
