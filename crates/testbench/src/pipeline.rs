//! End-to-end orchestration.
//!
//! A run moves every test through `Discovered -> Built -> Executed -> Compared -> Reported`:
//! 1. **Discovery:** Lists the source directory and applies the optional id filter.
//! 2. **Fixture check:** Tests without an expected-result fixture are reported as `Error` up front.
//! 3. **Build:** The [`BuildDriver`] produces binaries; failures are reported as `BuildError`.
//! 4. **Execution:** A pool of `exec.jobs` workers runs and judges the remaining tests.
//! 5. **Reporting:** Workers send [`CaseReport`]s over a channel to the reporter, which stays
//!    on the calling thread and is the only owner of the counters.
//!
//! Tests that short-circuit (fixture or build problems) are reported before any
//! simulator runs. No per-test failure aborts the run; the summary is always written.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::build::{BuildArtifact, BuildDriver, CommandToolchain, Toolchain};
use crate::common::{Result, TestbenchError};
use crate::compare::judge;
use crate::config::{RunnerConfig, resolve_jobs};
use crate::exec::ExecutionHarness;
use crate::fixture::{FixtureStore, TestCase};
use crate::report::{CaseReport, Outcome, Reporter, RunReport};

/// The testbench: one configured pipeline over one test tree and one simulator.
pub struct Testbench {
    config: RunnerConfig,
    simulator: PathBuf,
    store: FixtureStore,
    toolchain: Arc<dyn Toolchain>,
}

impl std::fmt::Debug for Testbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Testbench")
            .field("config", &self.config)
            .field("simulator", &self.simulator)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Testbench {
    /// Creates a testbench for `simulator` over the test tree at `test_root`.
    ///
    /// The toolchain is a [`CommandToolchain`] built from `config.build`.
    pub fn new(
        config: RunnerConfig,
        simulator: impl Into<PathBuf>,
        test_root: impl Into<PathBuf>,
    ) -> Self {
        let store = FixtureStore::new(test_root, config.layout.clone());
        let toolchain = Arc::new(CommandToolchain::from_config(&config.build));
        Self {
            config,
            simulator: simulator.into(),
            store,
            toolchain,
        }
    }

    /// Replaces the toolchain.
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The fixture store of the test tree.
    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    /// Runs every test and reports through `reporter`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the reporter's streams fail. Per-test problems
    /// become verdicts, and a source directory that cannot be listed yields a
    /// zero-test run with [`RunReport::discovery_error`] set.
    pub fn run<O: Write, E: Write>(&self, mut reporter: Reporter<O, E>) -> Result<RunReport> {
        let started = Instant::now();
        let mut cases = match self.store.discover() {
            Ok(cases) => cases,
            Err(e) => {
                tracing::error!(error = %e, "test discovery failed");
                let mut report = reporter.finish()?;
                report.discovery_error = Some(e.to_string());
                return Ok(report);
            }
        };
        if let Some(filter) = &self.config.filter {
            cases.retain(|case| case.id.contains(filter.as_str()));
            tracing::info!(filter = %filter, selected = cases.len(), "applied id filter");
        }

        let mut with_fixtures = Vec::with_capacity(cases.len());
        for case in cases {
            match self.store.check_fixtures(&case) {
                Ok(()) => with_fixtures.push(case),
                Err(e) => {
                    let _ = reporter.record(CaseReport::new(case, Outcome::Errored(e.into())))?;
                }
            }
        }

        let mut driver = BuildDriver::new(
            self.store.clone(),
            Arc::clone(&self.toolchain),
            self.config.build.jobs,
        );
        if !self.config.build.enabled {
            driver = driver.prebuilt();
        }
        let outcomes = driver.build_all(&with_fixtures);

        let mut runnable = Vec::with_capacity(with_fixtures.len());
        for (case, outcome) in with_fixtures.into_iter().zip(outcomes) {
            match outcome {
                Ok(artifact) => runnable.push((case, artifact)),
                Err(failure) => {
                    let _ = reporter.record(CaseReport::new(case, Outcome::BuildFailed(failure)))?;
                }
            }
        }

        self.execute_all(&runnable, &mut reporter)?;

        let report = reporter.finish()?;
        tracing::info!(
            count = report.summary.count,
            passed = report.summary.pass_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        Ok(report)
    }

    fn execute_all<O: Write, E: Write>(
        &self,
        runnable: &[(TestCase, BuildArtifact)],
        reporter: &mut Reporter<O, E>,
    ) -> Result<()> {
        if runnable.is_empty() {
            return Ok(());
        }
        let harness = ExecutionHarness::new(&self.simulator, self.config.exec.timeout())
            .strip_trailing_nul(self.config.compare.strip_trailing_nul);
        let harness = &harness;
        let jobs = resolve_jobs(self.config.exec.jobs).min(runnable.len());
        let next = AtomicUsize::new(0);
        let next = &next;
        tracing::info!(count = runnable.len(), jobs, "executing tests");

        let mut reported = vec![false; runnable.len()];
        let streamed = thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, CaseReport)>();
            let mut workers = Vec::with_capacity(jobs);
            for _ in 0..jobs {
                let tx = tx.clone();
                workers.push(scope.spawn(move || {
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some((case, artifact)) = runnable.get(idx) else {
                            return;
                        };
                        let report = self.execute_one(harness, case, &artifact.binary_path);
                        if tx.send((idx, report)).is_err() {
                            return;
                        }
                    }
                }));
            }
            drop(tx);

            let mut streamed = Ok(());
            for (idx, report) in rx {
                reported[idx] = true;
                if streamed.is_ok() {
                    streamed = reporter.record(report).map(|_verdict| ());
                }
            }
            for worker in workers {
                if worker.join().is_err() {
                    tracing::error!("execution worker panicked");
                }
            }
            streamed
        });
        streamed?;

        for ((case, _), _) in runnable.iter().zip(reported).filter(|(_, done)| !done) {
            let error = TestbenchError::WorkerPanicked { stage: "execution" };
            let _ = reporter.record(CaseReport::new(case.clone(), Outcome::Errored(error)))?;
        }
        Ok(())
    }

    fn execute_one(&self, harness: &ExecutionHarness, case: &TestCase, binary: &Path) -> CaseReport {
        let mut elapsed = Duration::ZERO;
        let outcome = self
            .judge_case(harness, case, binary, &mut elapsed)
            .unwrap_or_else(Outcome::Errored);
        tracing::debug!(
            id = %case.id,
            verdict = %outcome.verdict(),
            elapsed_ms = elapsed.as_millis() as u64,
            "test finished"
        );
        CaseReport::new(case.clone(), outcome).with_elapsed(elapsed)
    }

    fn judge_case(
        &self,
        harness: &ExecutionHarness,
        case: &TestCase,
        binary: &Path,
        elapsed: &mut Duration,
    ) -> Result<Outcome> {
        let expected = self.store.load_expected(case)?;
        let stdin = self.store.open_input(case)?;
        tracing::debug!(id = %case.id, binary = %binary.display(), "running simulator");
        let start = Instant::now();
        let actual = harness.run(binary, stdin);
        *elapsed = start.elapsed();
        let actual = actual?;
        let judgement = judge(&expected, &actual, self.config.compare);
        Ok(Outcome::Judged {
            expected,
            actual,
            judgement,
        })
    }
}
