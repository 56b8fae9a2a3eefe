//! Conformance test runner CLI.
//!
//! This binary runs a simulator-under-test through a test tree. It performs:
//! 1. **Setup:** Loads the optional JSON configuration and applies command-line overrides.
//! 2. **Run:** Builds, executes, judges and reports every test; report lines go to stdout,
//!    diagnostics and simulator stderr go to stderr.
//! 3. **Exit:** 0 after a completed run (1 with `--strict-exit` when a test did not pass),
//!    2 on fatal setup or reporting errors.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use simbench_core::report::RunReport;
use simbench_core::{Reporter, RunnerConfig, Testbench};

#[derive(Parser, Debug)]
#[command(
    name = "runner",
    author,
    version,
    about = "Conformance test runner for instruction-set simulators",
    long_about = "Build every test source, run the simulator on each binary with a timeout, and compare exit code and output against the fixtures.\n\nExamples:\n  runner ./bin/mips_simulator\n  runner ./bin/mips_simulator test --jobs 4 --report-out report.json\n  runner ./sim fixtures --no-build --filter addiu"
)]
struct Cli {
    /// Simulator executable; invoked as `<SIMULATOR> <binary>`.
    simulator: PathBuf,

    /// Test root holding the source, binary, expected-output and input directories.
    #[arg(default_value = "test")]
    test_root: PathBuf,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulator wall-clock limit per test, in seconds.
    #[arg(short, long, value_parser = parse_seconds)]
    timeout: Option<Duration>,

    /// Concurrent simulator runs (0 = available parallelism).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Concurrent builds (0 = available parallelism).
    #[arg(long)]
    build_jobs: Option<usize>,

    /// Run prebuilt binaries only; never invoke the toolchain.
    #[arg(long)]
    no_build: bool,

    /// Toolchain command template, split on whitespace ({source}, {binary}, {id}).
    #[arg(long)]
    build_cmd: Option<String>,

    /// Only run tests whose id contains this substring.
    #[arg(long)]
    filter: Option<String>,

    /// Write a JSON run report to this file.
    #[arg(long)]
    report_out: Option<PathBuf>,

    /// Exit with status 1 when any test did not pass.
    #[arg(long)]
    strict_exit: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::from(2);
        }
    };
    if let Err(message) = check_simulator(&cli.simulator) {
        eprintln!("Error: {message}");
        return ExitCode::from(2);
    }

    let testbench = Testbench::new(config, &cli.simulator, &cli.test_root);
    let reporter = Reporter::new(io::stdout().lock(), io::stderr());
    let report = match testbench.run(reporter) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    exit_code(&cli, &report)
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the `warn` default.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Loads the configuration file, if any, and applies the command-line overrides.
fn load_config(cli: &Cli) -> Result<RunnerConfig, String> {
    let mut config = match &cli.config {
        Some(path) => RunnerConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => RunnerConfig::default(),
    };

    if let Some(timeout) = cli.timeout {
        config.exec.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }
    if let Some(jobs) = cli.jobs {
        config.exec.jobs = jobs;
    }
    if let Some(jobs) = cli.build_jobs {
        config.build.jobs = jobs;
    }
    if cli.no_build {
        config.build.enabled = false;
    }
    if let Some(cmd) = &cli.build_cmd {
        let command: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
        if command.is_empty() {
            return Err("--build-cmd must not be empty".to_string());
        }
        config.build.command = command;
    }
    if let Some(filter) = &cli.filter {
        config.filter = Some(filter.clone());
    }
    Ok(config)
}

/// A simulator given as a path must exist; a bare name is resolved through `PATH` at spawn time.
fn check_simulator(simulator: &Path) -> Result<(), String> {
    let is_bare_name = simulator.components().count() == 1 && !simulator.is_absolute();
    if is_bare_name || simulator.is_file() {
        Ok(())
    } else {
        Err(format!("simulator not found: {}", simulator.display()))
    }
}

fn exit_code(cli: &Cli, report: &RunReport) -> ExitCode {
    if let Some(path) = &cli.report_out {
        if let Err(e) = report.write_json(path) {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    }
    if let Some(reason) = &report.discovery_error {
        eprintln!("Error: test discovery failed: {reason}");
        return ExitCode::from(2);
    }
    if cli.strict_exit && !report.summary.all_passed() {
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    let timeout =
        Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid timeout `{value}`: {e}"))?;
    if timeout.as_millis() == 0 {
        return Err(format!("timeout `{value}` must be at least one millisecond"));
    }
    if u64::try_from(timeout.as_millis()).is_err() {
        return Err(format!("timeout `{value}` is too large"));
    }
    Ok(timeout)
}
