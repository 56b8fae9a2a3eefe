//! # Comparator Tests
//!
//! Verdict rules, comparison policies and the modulo-256 exit-code invariant.

use proptest::prelude::*;
use rstest::rstest;

use simbench_core::Verdict;
use simbench_core::compare::{Comparison, judge};
use simbench_core::config::CompareConfig;
use simbench_core::exec::{ExecutionResult, strip_trailing_nul};
use simbench_core::fixture::ExpectedResult;
use simbench_core::fixture::expected::reduce_exit_code;

fn expected(exit_code: u8, output: &[u8]) -> ExpectedResult {
    ExpectedResult {
        exit_code,
        output: output.to_vec(),
    }
}

fn exit_only() -> CompareConfig {
    CompareConfig {
        output: false,
        ..CompareConfig::default()
    }
}

#[rstest]
#[case::exact_match(0, b"5\n", 0, b"5\n", Verdict::Pass)]
#[case::exit_code_wraps(2, b"", 258, b"", Verdict::Pass)]
#[case::negative_wraps(255, b"", -1, b"", Verdict::Pass)]
#[case::output_differs(0, b"5\n", 0, b"6\n", Verdict::Fail)]
#[case::exit_code_differs(1, b"5\n", 0, b"5\n", Verdict::Fail)]
#[case::no_whitespace_normalization(0, b"5\n", 0, b"5", Verdict::Fail)]
#[case::empty_matches_empty(0, b"", 0, b"", Verdict::Pass)]
fn test_default_policy(
    #[case] expected_code: u8,
    #[case] expected_out: &[u8],
    #[case] raw_exit: i64,
    #[case] actual_out: &[u8],
    #[case] verdict: Verdict,
) {
    let actual = ExecutionResult::completed(raw_exit, actual_out.to_vec(), Vec::new());
    let judgement = judge(
        &expected(expected_code, expected_out),
        &actual,
        CompareConfig::default(),
    );
    assert_eq!(judgement.verdict, verdict);
}

#[test]
fn test_sub_checks_are_reported_independently() {
    let actual = ExecutionResult::completed(1, b"6\n".to_vec(), Vec::new());
    let comparison = Comparison::evaluate(&expected(1, b"5\n"), &actual);
    assert!(comparison.exit_code_pass);
    assert!(!comparison.output_pass);
}

#[test]
fn test_exit_only_policy_ignores_output() {
    let actual = ExecutionResult::completed(0, b"garbage".to_vec(), Vec::new());
    let judgement = judge(&expected(0, b""), &actual, exit_only());
    assert_eq!(judgement.verdict, Verdict::Pass);
    assert!(!judgement.comparison.output_pass);
}

#[test]
fn test_timeout_never_passes() {
    let timed_out = ExecutionResult::timed_out();
    for policy in [CompareConfig::default(), exit_only()] {
        let judgement = judge(&expected(0, b""), &timed_out, policy);
        assert_eq!(judgement.verdict, Verdict::Timeout);
        assert!(!judgement.comparison.exit_code_pass);
    }
}

#[test]
fn test_stderr_is_never_judged() {
    let actual = ExecutionResult::completed(0, b"5\n".to_vec(), b"noise".to_vec());
    assert_eq!(
        judge(&expected(0, b"5\n"), &actual, CompareConfig::default()).verdict,
        Verdict::Pass
    );
}

#[test]
fn test_verdict_labels() {
    assert_eq!(Verdict::Pass.to_string(), "Pass");
    assert_eq!(Verdict::BuildError.to_string(), "BuildError");
    assert!(Verdict::Pass.is_pass());
    assert!(!Verdict::Timeout.is_pass());
}

proptest! {
    #[test]
    fn prop_exit_code_invariant_under_multiples_of_256(raw in -1_000_000i64..1_000_000, k in -1_000i64..1_000) {
        prop_assert_eq!(reduce_exit_code(raw), reduce_exit_code(raw + 256 * k));
        let expected = expected(reduce_exit_code(raw), b"");
        let actual = ExecutionResult::completed(raw + 256 * k, Vec::new(), Vec::new());
        prop_assert!(Comparison::evaluate(&expected, &actual).exit_code_pass);
    }

    #[test]
    fn prop_nul_padding_is_ignored(body in proptest::collection::vec(1u8..=255, 0..64), pad in 0usize..16) {
        let mut padded = body.clone();
        padded.extend(std::iter::repeat_n(0u8, pad));
        prop_assert_eq!(strip_trailing_nul(padded), body);
    }
}
