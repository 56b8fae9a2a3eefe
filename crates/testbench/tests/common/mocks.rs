use mockall::mock;
use simbench_core::build::Toolchain;
use simbench_core::common::BuildFailure;
use simbench_core::fixture::TestCase;
use std::path::Path;

mock! {
    pub Toolchain {}
    impl Toolchain for Toolchain {
        fn build(&self, case: &TestCase, binary: &Path) -> Result<(), BuildFailure>;
    }
}

/// A toolchain "build" that copies the source to the binary path, so shell-script
/// sources become shell-script binaries.
pub fn copy_source(case: &TestCase, binary: &Path) -> Result<(), BuildFailure> {
    let _ = std::fs::copy(&case.source_path, binary).unwrap();
    Ok(())
}

/// A build failure as a real toolchain would report it.
pub fn exited(diagnostic: &str) -> BuildFailure {
    BuildFailure::Exited {
        status: "exit status: 2".to_string(),
        diagnostic: diagnostic.to_string(),
    }
}
