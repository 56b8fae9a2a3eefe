//! Reporter and aggregator.
//!
//! The reporter is the only owner of the run's counters. It provides:
//! 1. **Streaming:** One report line per test, written and flushed as soon as the verdict is known.
//! 2. **Diagnostics:** Simulator stderr and an `ERROR FROM ...` line per non-passing test, on the error stream.
//! 3. **Summary:** A final `passCount/count -- percentage` line and the [`RunReport`] value.
//!
//! Report line format:
//!
//! ```text
//! addiu.2, ADDIU, Pass, jdoe, adds a negative immediate
//! ```

/// Counters and the JSON run report.
pub mod summary;

use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

pub use summary::{RunReport, Summary, TestRecord};

use crate::common::{BuildFailure, Result, TestbenchError};
use crate::compare::{Judgement, Verdict};
use crate::exec::ExecutionResult;
use crate::fixture::{ExpectedResult, TestCase};

/// How one test ended up.
#[derive(Debug)]
pub enum Outcome {
    /// The simulator ran (or was killed at its deadline) and the result was judged.
    Judged {
        /// Fixture the run was judged against.
        expected: ExpectedResult,
        /// What the simulator did.
        actual: ExecutionResult,
        /// Verdict and sub-checks.
        judgement: Judgement,
    },
    /// No binary could be produced.
    BuildFailed(BuildFailure),
    /// The test could not be judged.
    Errored(TestbenchError),
}

impl Outcome {
    /// The verdict this outcome is reported under.
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Judged { judgement, .. } => judgement.verdict,
            Self::BuildFailed(_) => Verdict::BuildError,
            Self::Errored(_) => Verdict::Error,
        }
    }
}

/// Everything the reporter needs about one finished test.
#[derive(Debug)]
pub struct CaseReport {
    /// The test.
    pub case: TestCase,
    /// How it ended.
    pub outcome: Outcome,
    /// Time spent executing the simulator.
    pub elapsed: Duration,
}

impl CaseReport {
    /// Creates a report with zero execution time.
    pub fn new(case: TestCase, outcome: Outcome) -> Self {
        Self {
            case,
            outcome,
            elapsed: Duration::ZERO,
        }
    }

    /// Sets the execution time.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Shorthand for `self.outcome.verdict()`.
    pub fn verdict(&self) -> Verdict {
        self.outcome.verdict()
    }
}

/// Streams report lines to `out` and diagnostics to `err`.
#[derive(Debug)]
pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    summary: Summary,
    records: Vec<TestRecord>,
    seen: HashSet<String>,
}

impl<O: Write, E: Write> Reporter<O, E> {
    /// Creates a reporter writing report lines to `out` and diagnostics to `err`.
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            summary: Summary::default(),
            records: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Counters so far.
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Reports one test and returns its verdict.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::DuplicateReport`] if the test id was already reported
    /// (nothing is written in that case) and [`TestbenchError::Report`] if a stream fails.
    pub fn record(&mut self, report: CaseReport) -> Result<Verdict> {
        if !self.seen.insert(report.case.id.clone()) {
            return Err(TestbenchError::DuplicateReport {
                id: report.case.id,
            });
        }

        let verdict = report.verdict();
        let case = &report.case;

        if let Outcome::Judged { actual, .. } = &report.outcome {
            if !actual.stderr.is_empty() {
                self.err.write_all(&actual.stderr)?;
            }
        }

        writeln!(
            self.out,
            "{}, {}, {}, {}, {}",
            case.id,
            case.instruction_tag,
            verdict,
            case.metadata.author,
            case.metadata.description
        )?;
        self.out.flush()?;

        self.write_diagnostic(&report)?;

        self.summary.add(verdict);
        self.records.push(record_of(&report));
        Ok(verdict)
    }

    fn write_diagnostic(&mut self, report: &CaseReport) -> Result<()> {
        let id = &report.case.id;
        match &report.outcome {
            Outcome::Judged {
                expected,
                actual,
                judgement,
            } => match judgement.verdict {
                Verdict::Fail => writeln!(
                    self.err,
                    "ERROR FROM {id}: Exit code was {} and expected {}; Output was \"{}\" and expected \"{}\" (exitCodePass={}, outputPass={})",
                    actual.exit_code,
                    expected.exit_code,
                    String::from_utf8_lossy(&actual.output),
                    String::from_utf8_lossy(&expected.output),
                    judgement.comparison.exit_code_pass,
                    judgement.comparison.output_pass,
                )?,
                Verdict::Timeout => writeln!(
                    self.err,
                    "ERROR FROM {id}: Timed out after {} ms; exit code and output discarded, expected {} and \"{}\"",
                    report.elapsed.as_millis(),
                    expected.exit_code,
                    String::from_utf8_lossy(&expected.output),
                )?,
                _ => return Ok(()),
            },
            Outcome::BuildFailed(failure) => {
                writeln!(self.err, "ERROR FROM {id}: Build failed: {failure}")?;
            }
            Outcome::Errored(error) => writeln!(self.err, "ERROR FROM {id}: {error}")?,
        }
        self.err.flush()?;
        Ok(())
    }

    /// Writes the summary line and returns the run report.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::Report`] if the report stream fails.
    pub fn finish(mut self) -> Result<RunReport> {
        writeln!(self.out, "{}", self.summary)?;
        self.out.flush()?;
        Ok(RunReport {
            summary: self.summary,
            tests: self.records,
            discovery_error: None,
        })
    }
}

fn record_of(report: &CaseReport) -> TestRecord {
    let (exit_code_pass, output_pass) = match &report.outcome {
        Outcome::Judged { judgement, .. } if judgement.verdict != Verdict::Timeout => (
            Some(judgement.comparison.exit_code_pass),
            Some(judgement.comparison.output_pass),
        ),
        _ => (None, None),
    };
    TestRecord {
        id: report.case.id.clone(),
        instruction: report.case.instruction_tag.clone(),
        verdict: report.verdict(),
        author: report.case.metadata.author.clone(),
        description: report.case.metadata.description.clone(),
        exit_code_pass,
        output_pass,
        duration_ms: report.elapsed.as_millis() as u64,
    }
}
