//! Build stage.
//!
//! Every discovered source is handed to the [`Toolchain`] on a pool of worker threads.
//! Builds share no state besides the binary directory, and every test writes its own
//! uniquely named file there, so completion order does not matter. Outcomes are
//! returned in input order.

/// Toolchain trait and the command-template implementation.
pub mod toolchain;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

pub use toolchain::{CommandToolchain, Toolchain};

use crate::common::BuildFailure;
use crate::config::resolve_jobs;
use crate::fixture::{FixtureStore, TestCase};

/// The compiled binary of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Location of the binary image.
    pub binary_path: PathBuf,
}

/// Result of building one test.
pub type BuildOutcome = Result<BuildArtifact, BuildFailure>;

/// Drives the toolchain over a set of tests.
pub struct BuildDriver {
    store: FixtureStore,
    toolchain: Arc<dyn Toolchain>,
    enabled: bool,
    jobs: usize,
}

impl std::fmt::Debug for BuildDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildDriver")
            .field("store", &self.store)
            .field("enabled", &self.enabled)
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

impl BuildDriver {
    /// Creates a driver that builds with `toolchain` on `jobs` workers (0 = auto).
    pub fn new(store: FixtureStore, toolchain: Arc<dyn Toolchain>, jobs: usize) -> Self {
        Self {
            store,
            toolchain,
            enabled: true,
            jobs,
        }
    }

    /// Prebuilt mode: never invoke the toolchain, only check that binaries exist.
    #[must_use]
    pub fn prebuilt(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Builds every case and returns one outcome per case, in input order.
    ///
    /// Failures are per test; this never aborts the whole stage.
    pub fn build_all(&self, cases: &[TestCase]) -> Vec<BuildOutcome> {
        if !self.enabled {
            return cases.iter().map(|case| self.find_prebuilt(case)).collect();
        }
        if cases.is_empty() {
            return Vec::new();
        }

        if let Err(e) = self.store.ensure_binary_dir() {
            tracing::error!(error = %e, "cannot create binary directory");
            let path = self.store.binary_dir();
            return cases
                .iter()
                .map(|_| {
                    Err(BuildFailure::OutputDir {
                        path: path.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect();
        }

        let jobs = resolve_jobs(self.jobs).min(cases.len());
        let next = AtomicUsize::new(0);
        let next = &next;
        tracing::info!(count = cases.len(), jobs, "building tests");

        let mut slots: Vec<Option<BuildOutcome>> = (0..cases.len()).map(|_| None).collect();
        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(jobs);
            for _ in 0..jobs {
                workers.push(scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(case) = cases.get(idx) else {
                            return done;
                        };
                        done.push((idx, self.build_one(case)));
                    }
                }));
            }
            for worker in workers {
                match worker.join() {
                    Ok(done) => {
                        for (idx, outcome) in done {
                            slots[idx] = Some(outcome);
                        }
                    }
                    Err(_) => tracing::error!("build worker panicked"),
                }
            }
        });

        let outcomes: Vec<BuildOutcome> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(BuildFailure::Aborted)))
            .collect();
        let built = outcomes.iter().filter(|o| o.is_ok()).count();
        tracing::info!(built, failed = outcomes.len() - built, "build stage finished");
        outcomes
    }

    fn build_one(&self, case: &TestCase) -> BuildOutcome {
        let binary_path = self.store.binary_path(case);
        let outcome = self
            .toolchain
            .build(case, &binary_path)
            .and_then(|()| {
                if binary_path.is_file() {
                    Ok(())
                } else {
                    Err(BuildFailure::MissingBinary {
                        path: binary_path.clone(),
                    })
                }
            })
            .map(|()| BuildArtifact {
                binary_path: binary_path.clone(),
            });
        if let Err(failure) = &outcome {
            tracing::warn!(id = %case.id, %failure, "build failed");
        }
        outcome
    }

    fn find_prebuilt(&self, case: &TestCase) -> BuildOutcome {
        let binary_path = self.store.binary_path(case);
        if binary_path.is_file() {
            Ok(BuildArtifact { binary_path })
        } else {
            Err(BuildFailure::NotBuilt { path: binary_path })
        }
    }
}
