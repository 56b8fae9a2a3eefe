//! Configuration system for the testbench.
//!
//! This module defines all configuration structures used to parameterize a run. It provides:
//! 1. **Defaults:** The conventional fixture layout and a five second simulator timeout.
//! 2. **Structures:** Hierarchical config for layout, build, execution and comparison.
//! 3. **Loading:** JSON deserialization where every field is optional and falls back to its default.
//!
//! The CLI loads an optional JSON file and then applies its own flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::common::{Result, TestbenchError};

/// Default configuration constants for the testbench.
mod defaults {
    /// Directory holding test sources, relative to the test root.
    pub const SOURCE_DIR: &str = "src";

    /// Directory receiving compiled binaries, relative to the test root.
    pub const BINARY_DIR: &str = "bin";

    /// Directory holding expected-result fixtures, relative to the test root.
    pub const EXPECTED_DIR: &str = "output";

    /// Directory holding optional stdin fixtures, relative to the test root.
    pub const INPUT_DIR: &str = "input";

    /// Recognized source file extensions.
    pub const SOURCE_EXTENSIONS: &[&str] = &[".s", ".c"];

    /// Binary file name template.
    pub const BINARY_NAME: &str = "{id}.mips.bin";

    /// Expected-result fixture name template.
    pub const EXPECTED_NAME: &str = "{id}.mips.out";

    /// Stdin fixture name template.
    pub const INPUT_NAME: &str = "{id}.in";

    /// Toolchain argv template. The makefile knows how to produce `{binary}`.
    pub const BUILD_COMMAND: &[&str] = &["make", "{binary}"];

    /// Simulator wall-clock limit per test (5 seconds).
    pub const TIMEOUT_MS: u64 = 5_000;

    /// Execution workers. One keeps the simulator runs sequential.
    pub const EXEC_JOBS: usize = 1;
}

/// Root configuration for a testbench run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Where sources and fixtures live and how files are named.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Toolchain invocation.
    #[serde(default)]
    pub build: BuildConfig,

    /// Simulator invocation.
    #[serde(default)]
    pub exec: ExecConfig,

    /// Which checks decide a pass.
    #[serde(default)]
    pub compare: CompareConfig,

    /// Only run tests whose id contains this substring.
    #[serde(default)]
    pub filter: Option<String>,
}

impl RunnerConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::Config`] if the JSON is malformed or has unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| TestbenchError::Config {
            origin: "<inline>".to_string(),
            source,
        })
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`TestbenchError::Io`] if the file cannot be read and
    /// [`TestbenchError::Config`] if it cannot be parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TestbenchError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| TestbenchError::Config {
            origin: path.display().to_string(),
            source,
        })
    }
}

/// On-disk layout of a test tree.
///
/// Directories are relative to the test root. Name templates substitute `{id}`
/// with the canonical test id.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Source directory
    #[serde(default = "LayoutConfig::default_source_dir")]
    pub source_dir: PathBuf,

    /// Binary output directory (created on demand)
    #[serde(default = "LayoutConfig::default_binary_dir")]
    pub binary_dir: PathBuf,

    /// Expected-result fixture directory
    #[serde(default = "LayoutConfig::default_expected_dir")]
    pub expected_dir: PathBuf,

    /// Stdin fixture directory
    #[serde(default = "LayoutConfig::default_input_dir")]
    pub input_dir: PathBuf,

    /// Source file suffixes; the matched suffix is removed to form the test id.
    #[serde(default = "LayoutConfig::default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Binary name template
    #[serde(default = "LayoutConfig::default_binary_name")]
    pub binary_name: String,

    /// Expected-result fixture name template
    #[serde(default = "LayoutConfig::default_expected_name")]
    pub expected_name: String,

    /// Stdin fixture name template
    #[serde(default = "LayoutConfig::default_input_name")]
    pub input_name: String,
}

impl LayoutConfig {
    fn default_source_dir() -> PathBuf {
        PathBuf::from(defaults::SOURCE_DIR)
    }

    fn default_binary_dir() -> PathBuf {
        PathBuf::from(defaults::BINARY_DIR)
    }

    fn default_expected_dir() -> PathBuf {
        PathBuf::from(defaults::EXPECTED_DIR)
    }

    fn default_input_dir() -> PathBuf {
        PathBuf::from(defaults::INPUT_DIR)
    }

    fn default_source_extensions() -> Vec<String> {
        defaults::SOURCE_EXTENSIONS
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    fn default_binary_name() -> String {
        defaults::BINARY_NAME.to_string()
    }

    fn default_expected_name() -> String {
        defaults::EXPECTED_NAME.to_string()
    }

    fn default_input_name() -> String {
        defaults::INPUT_NAME.to_string()
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            source_dir: Self::default_source_dir(),
            binary_dir: Self::default_binary_dir(),
            expected_dir: Self::default_expected_dir(),
            input_dir: Self::default_input_dir(),
            source_extensions: Self::default_source_extensions(),
            binary_name: Self::default_binary_name(),
            expected_name: Self::default_expected_name(),
            input_name: Self::default_input_name(),
        }
    }
}

/// Toolchain settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// When false, binaries must already exist (prebuilt mode).
    #[serde(default = "BuildConfig::default_enabled")]
    pub enabled: bool,

    /// Argv template; `{source}`, `{binary}` and `{id}` are substituted per test.
    #[serde(default = "BuildConfig::default_command")]
    pub command: Vec<String>,

    /// Directory the toolchain runs in. Defaults to the current directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Concurrent builds; 0 picks the available parallelism.
    #[serde(default)]
    pub jobs: usize,
}

impl BuildConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_command() -> Vec<String> {
        defaults::BUILD_COMMAND
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: Self::default_command(),
            working_dir: None,
            jobs: 0,
        }
    }
}

/// Simulator execution settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecConfig {
    /// Wall-clock limit per simulator run, in milliseconds.
    #[serde(
        default = "ExecConfig::default_timeout_ms",
        deserialize_with = "nonzero_ms"
    )]
    pub timeout_ms: u64,

    /// Concurrent simulator runs; 0 picks the available parallelism.
    #[serde(default = "ExecConfig::default_jobs")]
    pub jobs: usize,
}

impl ExecConfig {
    fn default_timeout_ms() -> u64 {
        defaults::TIMEOUT_MS
    }

    fn default_jobs() -> usize {
        defaults::EXEC_JOBS
    }

    /// The timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn nonzero_ms<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    if ms == 0 {
        return Err(serde::de::Error::custom("timeout_ms must be at least 1"));
    }
    Ok(ms)
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::TIMEOUT_MS,
            jobs: defaults::EXEC_JOBS,
        }
    }
}

/// Comparison policy.
///
/// Both sub-checks are always computed and reported; these switches only decide
/// which of them a pass requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareConfig {
    /// Require the exit code (mod 256) to match.
    #[serde(default = "CompareConfig::default_true")]
    pub exit_code: bool,

    /// Require standard output to match exactly.
    #[serde(default = "CompareConfig::default_true")]
    pub output: bool,

    /// Strip trailing NUL bytes from captured standard output.
    #[serde(default = "CompareConfig::default_true")]
    pub strip_trailing_nul: bool,
}

impl CompareConfig {
    fn default_true() -> bool {
        true
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            exit_code: true,
            output: true,
            strip_trailing_nul: true,
        }
    }
}

/// Resolves a worker count where 0 means "use the machine".
pub(crate) fn resolve_jobs(jobs: usize) -> usize {
    if jobs > 0 {
        return jobs;
    }
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
