//! Result comparison.
//!
//! Judges one [`ExecutionResult`] against its [`ExpectedResult`]:
//! 1. **Sub-checks:** `exit_code_pass` and `output_pass` are always computed for diagnostics.
//! 2. **Verdict:** `Pass` requires every sub-check enabled by the [`CompareConfig`] policy;
//!    the default policy requires both. A timed-out run is `Timeout`, never `Pass`.
//!
//! Output comparison is exact byte equality. The only normalization is the trailing-NUL
//! strip the harness already applied to captured stdout.

use std::fmt;

use serde::Serialize;

use crate::config::CompareConfig;
use crate::exec::ExecutionResult;
use crate::fixture::ExpectedResult;

/// Categorical outcome of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    /// Exit code and output matched the fixture.
    Pass,
    /// Exit code and/or output differed from the fixture.
    Fail,
    /// The toolchain produced no binary; the test never ran.
    BuildError,
    /// The simulator exceeded its deadline and was killed.
    Timeout,
    /// The test could not be judged: missing or corrupt fixture, unreadable file,
    /// or a simulator that could not be started.
    Error,
}

impl Verdict {
    /// Whether this verdict counts towards the pass total.
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }

    /// Label used in report lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::BuildError => "BuildError",
            Self::Timeout => "Timeout",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained sub-check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Exit codes agree modulo 256.
    pub exit_code_pass: bool,
    /// Standard output agrees byte for byte.
    pub output_pass: bool,
}

impl Comparison {
    /// Computes both sub-checks. A timed-out run fails both.
    pub fn evaluate(expected: &ExpectedResult, actual: &ExecutionResult) -> Self {
        if actual.timed_out {
            return Self {
                exit_code_pass: false,
                output_pass: false,
            };
        }
        Self {
            exit_code_pass: actual.exit_code == expected.exit_code,
            output_pass: actual.output == expected.output,
        }
    }

    /// Whether the checks required by `policy` all pass.
    pub fn passes(self, policy: CompareConfig) -> bool {
        (!policy.exit_code || self.exit_code_pass) && (!policy.output || self.output_pass)
    }
}

/// A verdict together with the sub-checks that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Judgement {
    /// `Pass`, `Fail` or `Timeout`.
    pub verdict: Verdict,
    /// The sub-checks.
    pub comparison: Comparison,
}

/// Judges `actual` against `expected` under `policy`.
pub fn judge(
    expected: &ExpectedResult,
    actual: &ExecutionResult,
    policy: CompareConfig,
) -> Judgement {
    let comparison = Comparison::evaluate(expected, actual);
    let verdict = if actual.timed_out {
        Verdict::Timeout
    } else if comparison.passes(policy) {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    Judgement {
        verdict,
        comparison,
    }
}
