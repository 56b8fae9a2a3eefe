//! Test case identity and source metadata.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Characters trimmed from both ends of a metadata line: comment markers and separators.
const METADATA_TRIM: &[char] = &['#', '/', ','];

/// One conformance test, discovered once per run and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Canonical name; every stage addresses the test by it.
    pub id: String,
    /// The `.s`/`.c` source file.
    pub source_path: PathBuf,
    /// Instruction or feature under test (`addiu.2` → `ADDIU`).
    pub instruction_tag: String,
    /// Author and description read from the source header.
    pub metadata: SourceMetadata,
}

impl TestCase {
    /// Builds a test case from its id and source path, reading metadata best-effort.
    pub fn new(id: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        let id = id.into();
        let source_path = source_path.into();
        let metadata = SourceMetadata::read(&source_path);
        Self {
            instruction_tag: instruction_tag(&id),
            id,
            source_path,
            metadata,
        }
    }
}

/// Author and description taken from the first two lines of a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceMetadata {
    /// First line, stripped of comment markers.
    pub author: String,
    /// Second line, stripped of comment markers.
    pub description: String,
}

impl SourceMetadata {
    /// Reads the header of `path`. Missing lines and unreadable files yield empty strings.
    pub fn read(path: &Path) -> Self {
        let Ok(file) = File::open(path) else {
            tracing::debug!(path = %path.display(), "source unreadable, metadata left empty");
            return Self::default();
        };
        let mut lines = BufReader::new(file).split(b'\n');
        let mut next_line = || {
            lines
                .next()
                .and_then(std::result::Result::ok)
                .map(|raw| clean_metadata_line(&String::from_utf8_lossy(&raw)))
                .unwrap_or_default()
        };
        let author = next_line();
        let description = next_line();
        Self {
            author,
            description,
        }
    }
}

/// Trims comment markers, commas and whitespace from both ends of a header line.
pub fn clean_metadata_line(line: &str) -> String {
    line.trim_matches(|c: char| c.is_whitespace() || METADATA_TRIM.contains(&c))
        .to_string()
}

/// Derives the test id from a file name by removing the first matching extension suffix.
///
/// Extensions are tried longest first so `.mips.s` wins over `.s`. Only an exact
/// suffix is removed; a bare extension (empty stem) is not a test.
pub fn test_id_from_file_name(file_name: &str, extensions: &[String]) -> Option<String> {
    let mut by_length: Vec<&String> = extensions.iter().collect();
    by_length.sort_by_key(|ext| std::cmp::Reverse(ext.len()));
    by_length
        .into_iter()
        .filter(|ext| !ext.is_empty())
        .find_map(|ext| file_name.strip_suffix(ext.as_str()))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Instruction tag: the id up to its first `.`, upper-cased.
pub fn instruction_tag(id: &str) -> String {
    id.split('.').next().unwrap_or(id).to_uppercase()
}
