//! Fixture store: the on-disk layout of a test tree.
//!
//! This module knows where everything lives. It provides:
//! 1. **Discovery:** Enumerates test sources and derives canonical test ids.
//! 2. **Resolution:** Maps a test id to its binary, expected-result and stdin fixture paths.
//! 3. **Loading:** Parses expected-result fixtures and opens stdin fixtures on demand.
//!
//! ```text
//! <root>/src/add.s            source (author / description in the first two lines)
//! <root>/bin/add.mips.bin     binary, produced by the build stage
//! <root>/output/add.mips.out  expected exit code + stdout
//! <root>/input/add.in         optional stdin
//! ```

/// Test case identity and source metadata.
pub mod case;
/// Expected-result fixture parsing.
pub mod expected;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub use case::{SourceMetadata, TestCase};
pub use expected::ExpectedResult;

use crate::common::{FixtureError, Result, TestbenchError};
use crate::config::LayoutConfig;

/// Resolves and reads the files of one test tree.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    root: PathBuf,
    layout: LayoutConfig,
}

impl FixtureStore {
    /// Creates a store rooted at `root` with the given layout.
    pub fn new(root: impl Into<PathBuf>, layout: LayoutConfig) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// The test root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The source directory.
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.layout.source_dir)
    }

    /// The binary output directory.
    pub fn binary_dir(&self) -> PathBuf {
        self.root.join(&self.layout.binary_dir)
    }

    /// Enumerates every test source, sorted by id.
    ///
    /// Files without a recognized extension are skipped. When two sources map to the
    /// same id (`add.c` and `add.s`), the first file name wins and the other is logged.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::Io`] if the source directory cannot be listed.
    pub fn discover(&self) -> Result<Vec<TestCase>> {
        let dir = self.source_dir();
        let entries = fs::read_dir(&dir).map_err(|e| TestbenchError::io(&dir, e))?;

        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TestbenchError::io(&dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping source with non UTF-8 name");
                continue;
            };
            files.push((name.to_string(), path));
        }
        files.sort();

        let mut by_id: BTreeMap<String, TestCase> = BTreeMap::new();
        for (name, path) in files {
            let Some(id) = case::test_id_from_file_name(&name, &self.layout.source_extensions)
            else {
                tracing::debug!(file = %name, "not a test source");
                continue;
            };
            if let Some(kept) = by_id.get(&id) {
                tracing::warn!(
                    id = %id,
                    kept = %kept.source_path.display(),
                    ignored = %path.display(),
                    "duplicate test id, ignoring later source"
                );
                continue;
            }
            let _ = by_id.insert(id.clone(), TestCase::new(id, path));
        }

        let cases: Vec<TestCase> = by_id.into_values().collect();
        tracing::info!(count = cases.len(), dir = %dir.display(), "discovered test sources");
        Ok(cases)
    }

    /// Where the build stage writes the binary of `case`.
    pub fn binary_path(&self, case: &TestCase) -> PathBuf {
        self.binary_dir()
            .join(expand_template(&self.layout.binary_name, &case.id))
    }

    /// Where the expected-result fixture of `case` lives.
    pub fn expected_path(&self, case: &TestCase) -> PathBuf {
        self.root
            .join(&self.layout.expected_dir)
            .join(expand_template(&self.layout.expected_name, &case.id))
    }

    /// The stdin fixture of `case`, if one exists.
    pub fn input_path(&self, case: &TestCase) -> Option<PathBuf> {
        let path = self
            .root
            .join(&self.layout.input_dir)
            .join(expand_template(&self.layout.input_name, &case.id));
        path.is_file().then_some(path)
    }

    /// Fails fast when `case` has no expected-result fixture.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Missing`] if the fixture file does not exist.
    pub fn check_fixtures(&self, case: &TestCase) -> Result<(), FixtureError> {
        let path = self.expected_path(case);
        if path.is_file() {
            Ok(())
        } else {
            Err(FixtureError::Missing { path })
        }
    }

    /// Reads and parses the expected-result fixture of `case`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Missing`], [`FixtureError::Io`] or [`FixtureError::Corrupt`].
    pub fn load_expected(&self, case: &TestCase) -> Result<ExpectedResult, FixtureError> {
        let path = self.expected_path(case);
        let bytes = fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FixtureError::Missing { path: path.clone() }
            } else {
                FixtureError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        ExpectedResult::parse(&bytes, &path)
    }

    /// Opens the stdin fixture of `case`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Io`] if the fixture exists but cannot be opened.
    pub fn open_input(&self, case: &TestCase) -> Result<Option<File>, FixtureError> {
        self.input_path(case)
            .map(|path| File::open(&path).map_err(|source| FixtureError::Io { path, source }))
            .transpose()
    }

    /// Creates the binary output directory if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::Io`] if the directory cannot be created.
    pub fn ensure_binary_dir(&self) -> Result<()> {
        let dir = self.binary_dir();
        fs::create_dir_all(&dir).map_err(|e| TestbenchError::io(&dir, e))
    }
}

/// Substitutes `{id}` in a name template.
pub fn expand_template(template: &str, id: &str) -> String {
    template.replace("{id}", id)
}
