//! Expected-result fixture format.
//!
//! A fixture is a text file whose first line is a decimal exit code and whose
//! remaining bytes are the exact standard output the simulator must produce:
//!
//! ```text
//! 2
//! hello
//! ```
//!
//! The exit code is reduced modulo 256 because process exit statuses are 8 bits wide.
//! The output section is taken verbatim and may be empty.

use std::path::Path;

use crate::common::FixtureError;

/// The fixture a run is judged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedResult {
    /// Expected exit code, already reduced modulo 256.
    pub exit_code: u8,
    /// Expected standard output, byte for byte.
    pub output: Vec<u8>,
}

impl ExpectedResult {
    /// Parses fixture bytes. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Corrupt`] if the file is empty or its first line is not an integer.
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self, FixtureError> {
        let corrupt = |reason: String| FixtureError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let (first, rest) = match bytes.iter().position(|&b| b == b'\n') {
            Some(nl) => (&bytes[..nl], &bytes[nl + 1..]),
            None => (bytes, &[][..]),
        };
        let first = std::str::from_utf8(first)
            .map_err(|_| corrupt("exit code line is not UTF-8".to_string()))?
            .trim();
        if first.is_empty() {
            return Err(corrupt("missing exit code line".to_string()));
        }
        let raw: i64 = first
            .parse()
            .map_err(|_| corrupt(format!("exit code `{first}` is not an integer")))?;

        Ok(Self {
            exit_code: reduce_exit_code(raw),
            output: rest.to_vec(),
        })
    }
}

/// Folds an exit status into the 8-bit range (`257 → 1`, `-1 → 255`).
pub fn reduce_exit_code(raw: i64) -> u8 {
    raw.rem_euclid(256) as u8
}
