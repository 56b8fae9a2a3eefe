//! # Reporter Tests
//!
//! Report line format, diagnostics on the error stream, duplicate rejection,
//! summary arithmetic and the JSON run report.

use std::time::Duration;

use pretty_assertions::assert_eq;
use simbench_core::Verdict;
use simbench_core::common::{FixtureError, TestbenchError};
use simbench_core::compare::judge;
use simbench_core::config::CompareConfig;
use simbench_core::exec::ExecutionResult;
use simbench_core::fixture::{ExpectedResult, SourceMetadata, TestCase};
use simbench_core::report::{CaseReport, Outcome, Reporter, Summary};

use crate::common::mocks::exited;

fn case(id: &str) -> TestCase {
    let mut case = TestCase::new(id, format!("/nowhere/src/{id}.s"));
    case.metadata = SourceMetadata {
        author: "jdoe".to_string(),
        description: "checks things".to_string(),
    };
    case
}

fn judged(id: &str, expected: (u8, &[u8]), actual: ExecutionResult) -> CaseReport {
    let expected = ExpectedResult {
        exit_code: expected.0,
        output: expected.1.to_vec(),
    };
    let judgement = judge(&expected, &actual, CompareConfig::default());
    CaseReport::new(
        case(id),
        Outcome::Judged {
            expected,
            actual,
            judgement,
        },
    )
}

fn text(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap()
}

#[test]
fn test_report_lines_and_summary() {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut reporter = Reporter::new(&mut out, &mut err);

    let pass = judged(
        "addiu.2",
        (0, b"5\n"),
        ExecutionResult::completed(0, b"5\n".to_vec(), Vec::new()),
    );
    assert_eq!(reporter.record(pass).unwrap(), Verdict::Pass);
    let built = CaseReport::new(case("add"), Outcome::BuildFailed(exited("bad opcode")));
    assert_eq!(reporter.record(built).unwrap(), Verdict::BuildError);
    let timeout = judged("loop", (3, b"done\n"), ExecutionResult::timed_out())
        .with_elapsed(Duration::from_millis(5000));
    assert_eq!(reporter.record(timeout).unwrap(), Verdict::Timeout);

    let report = reporter.finish().unwrap();
    assert_eq!(
        text(&out),
        "addiu.2, ADDIU, Pass, jdoe, checks things\n\
         add, ADD, BuildError, jdoe, checks things\n\
         loop, LOOP, Timeout, jdoe, checks things\n\
         Test cases passed: 1/3 -- 33%\n"
    );
    assert_eq!(
        text(&err),
        "ERROR FROM add: Build failed: toolchain exited with exit status: 2: bad opcode\n\
         ERROR FROM loop: Timed out after 5000 ms; exit code and output discarded, expected 3 and \"done\n\"\n"
    );
    assert_eq!(report.summary.count, 3);
    assert_eq!(report.summary.pass_count, 1);
    assert_eq!(report.summary.build_errors, 1);
    assert_eq!(report.summary.timeouts, 1);
    assert_eq!(report.tests.len(), 3);
    assert_eq!(report.tests[2].exit_code_pass, None);
}

#[test]
fn test_fail_diagnostic_shows_both_sides() {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut reporter = Reporter::new(&mut out, &mut err);

    let fail = judged(
        "sub",
        (0, b"5\n"),
        ExecutionResult::completed(0, b"6\n".to_vec(), b"sim: warning\n".to_vec()),
    );
    assert_eq!(reporter.record(fail).unwrap(), Verdict::Fail);
    let _ = reporter.finish().unwrap();

    assert_eq!(
        text(&err),
        "sim: warning\n\
         ERROR FROM sub: Exit code was 0 and expected 0; Output was \"6\n\" and expected \"5\n\" (exitCodePass=true, outputPass=false)\n"
    );
}

#[test]
fn test_error_outcome_names_the_cause() {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut reporter = Reporter::new(&mut out, &mut err);

    let missing = FixtureError::Missing {
        path: "output/jr.mips.out".into(),
    };
    let report = CaseReport::new(case("jr"), Outcome::Errored(TestbenchError::from(missing)));
    assert_eq!(reporter.record(report).unwrap(), Verdict::Error);
    let run = reporter.finish().unwrap();

    assert_eq!(
        text(&err),
        "ERROR FROM jr: no expected-result fixture at output/jr.mips.out\n"
    );
    assert_eq!(run.summary.errors, 1);
    assert!(!run.summary.all_passed());
}

#[test]
fn test_duplicate_report_is_rejected() {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut reporter = Reporter::new(&mut out, &mut err);
    let ok = || {
        judged(
            "jal",
            (0, b""),
            ExecutionResult::completed(0, Vec::new(), Vec::new()),
        )
    };

    let _ = reporter.record(ok()).unwrap();
    let err_dup = reporter.record(ok()).unwrap_err();
    assert!(matches!(err_dup, TestbenchError::DuplicateReport { ref id } if id == "jal"));
    assert_eq!(reporter.summary().count, 1);
    let _ = reporter.finish().unwrap();
    assert_eq!(text(&out).lines().count(), 2);
}

#[test]
fn test_zero_test_summary_has_placeholder() {
    let mut out = Vec::new();
    let report = Reporter::new(&mut out, std::io::sink()).finish().unwrap();
    assert_eq!(text(&out), "Test cases passed: 0/0 -- N/A\n");
    assert_eq!(report.summary, Summary::default());
    assert!(report.summary.all_passed());
}

#[test]
fn test_percentage_truncates() {
    let mut summary = Summary::default();
    for verdict in [Verdict::Pass, Verdict::Pass, Verdict::Fail] {
        summary.add(verdict);
    }
    assert_eq!(summary.percentage(), Some(66));
    assert_eq!(summary.to_string(), "Test cases passed: 2/3 -- 66%");
    assert!(summary.pass_count <= summary.count);
}

#[test]
fn test_json_report_is_written() {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut reporter = Reporter::new(&mut out, &mut err);
    let _ = reporter
        .record(judged(
            "or",
            (1, b""),
            ExecutionResult::completed(1, Vec::new(), Vec::new()),
        ))
        .unwrap();
    let report = reporter.finish().unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("reports/run.json");
    report.write_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["summary"]["count"], 1);
    assert_eq!(json["summary"]["pass_count"], 1);
    assert_eq!(json["tests"][0]["id"], "or");
    assert_eq!(json["tests"][0]["verdict"], "Pass");
    assert_eq!(json["tests"][0]["exit_code_pass"], true);
    assert!(json.get("discovery_error").is_none());
}
