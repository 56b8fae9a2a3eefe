//! # Build Stage Tests
//!
//! Placeholder substitution, failure diagnostics, prebuilt mode and the
//! concurrent driver's ordering guarantees.

use std::sync::Arc;

use simbench_core::build::{BuildDriver, CommandToolchain, Toolchain};
use simbench_core::common::BuildFailure;
use simbench_core::config::LayoutConfig;
use simbench_core::fixture::{FixtureStore, TestCase};

use crate::common::mocks::{MockToolchain, copy_source, exited};
use crate::common::tree::TestTree;

fn discover(tree: &TestTree) -> (FixtureStore, Vec<TestCase>) {
    let store = FixtureStore::new(tree.root(), LayoutConfig::default());
    let cases = store.discover().unwrap();
    (store, cases)
}

#[test]
fn test_argv_substitutes_placeholders() {
    let toolchain = CommandToolchain::new(
        vec![
            "mips-cc".into(),
            "-o".into(),
            "{binary}".into(),
            "{source}".into(),
            "-DTEST={id}".into(),
        ],
        None,
    );
    let case = TestCase::new("add", "/t/src/add.s");
    let argv = toolchain.argv(&case, std::path::Path::new("/t/bin/add.mips.bin"));
    assert_eq!(
        argv,
        vec!["mips-cc", "-o", "/t/bin/add.mips.bin", "/t/src/add.s", "-DTEST=add"]
    );
}

#[cfg(unix)]
#[test]
fn test_command_toolchain_builds_and_reports_failures() {
    let tree = TestTree::new();
    let _ = tree.source("ok.s", "a", "b", "exit 0");
    let (store, cases) = discover(&tree);
    store.ensure_binary_dir().unwrap();
    let binary = store.binary_path(&cases[0]);

    let copy = CommandToolchain::new(vec!["cp".into(), "{source}".into(), "{binary}".into()], None);
    copy.build(&cases[0], &binary).unwrap();
    assert!(binary.is_file());

    let failing = CommandToolchain::new(
        vec!["sh".into(), "-c".into(), "echo 'add.s:3: bad opcode' >&2; exit 2".into()],
        None,
    );
    match failing.build(&cases[0], &binary) {
        Err(BuildFailure::Exited { diagnostic, .. }) => {
            assert_eq!(diagnostic, "add.s:3: bad opcode");
        }
        other => panic!("expected Exited, got {other:?}"),
    }

    let missing = CommandToolchain::new(vec!["/no/such/assembler".into()], None);
    assert!(matches!(
        missing.build(&cases[0], &binary),
        Err(BuildFailure::Spawn { .. })
    ));
    let empty = CommandToolchain::new(Vec::new(), None);
    assert!(matches!(
        empty.build(&cases[0], &binary),
        Err(BuildFailure::EmptyCommand)
    ));
}

#[test]
fn test_driver_keeps_input_order_across_workers() {
    let tree = TestTree::new();
    for i in 0..12 {
        let _ = tree.source(&format!("t{i:02}.s"), "a", "b", "exit 0");
    }
    let (store, cases) = discover(&tree);

    let mut mock = MockToolchain::new();
    let _ = mock.expect_build().times(12).returning(|case, binary| {
        if case.id == "t05" {
            Err(exited("t05 is broken"))
        } else {
            copy_source(case, binary)
        }
    });

    let driver = BuildDriver::new(store.clone(), Arc::new(mock), 4);
    let outcomes = driver.build_all(&cases);

    assert_eq!(outcomes.len(), cases.len());
    for (case, outcome) in cases.iter().zip(&outcomes) {
        if case.id == "t05" {
            assert!(matches!(outcome, Err(BuildFailure::Exited { .. })));
        } else {
            assert_eq!(outcome.as_ref().unwrap().binary_path, store.binary_path(case));
        }
    }
}

#[test]
fn test_success_without_binary_is_a_failure() {
    let tree = TestTree::new();
    let _ = tree.source("ghost.s", "a", "b", "exit 0");
    let (store, cases) = discover(&tree);

    let mut mock = MockToolchain::new();
    let _ = mock.expect_build().times(1).returning(|_, _| Ok(()));

    let outcomes = BuildDriver::new(store, Arc::new(mock), 1).build_all(&cases);
    assert!(matches!(outcomes[0], Err(BuildFailure::MissingBinary { .. })));
}

#[test]
fn test_prebuilt_mode_never_calls_toolchain() {
    let tree = TestTree::new();
    let _ = tree
        .source("built.s", "a", "b", "exit 0")
        .source("unbuilt.s", "a", "b", "exit 0")
        .binary("built", "exit 0");
    let (store, cases) = discover(&tree);

    let mut mock = MockToolchain::new();
    let _ = mock.expect_build().never();

    let outcomes = BuildDriver::new(store, Arc::new(mock), 0)
        .prebuilt()
        .build_all(&cases);
    assert_eq!(outcomes[0].as_ref().unwrap().binary_path, tree.binary_path("built"));
    assert!(matches!(outcomes[1], Err(BuildFailure::NotBuilt { .. })));
}

#[test]
fn test_empty_case_list_builds_nothing() {
    let tree = TestTree::new();
    let (store, cases) = discover(&tree);
    let mut mock = MockToolchain::new();
    let _ = mock.expect_build().never();

    let outcomes = BuildDriver::new(store.clone(), Arc::new(mock), 2).build_all(&cases);
    assert!(outcomes.is_empty());
    assert!(!store.binary_dir().exists());
}
