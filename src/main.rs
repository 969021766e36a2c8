//! test262-runner CLI
//!
//! Runs Test262 tests through an external compiler and runtime and prints a
//! summary report.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use test262_runner::{Runner, RunnerConfig, VERSION};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "test262-runner")]
#[command(
    author,
    version,
    about = "Run Test262 through an ahead-of-time JavaScript toolchain",
    long_about = None
)]
struct Cli {
    /// Test files or directories to run
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Directory containing the compiler and runtime binaries
    #[arg(short, long, value_name = "DIR")]
    binary_path: PathBuf,

    /// Maximum number of tests to run at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Timeout in seconds for each compile and execute step
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Directory for preprocessed sources and compiled artifacts
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// JSON skip list (defaults to the built-in list)
    #[arg(long, value_name = "FILE")]
    skip_list: Option<PathBuf>,

    /// Compiler executable name inside the binary directory
    #[arg(long, value_name = "NAME")]
    compiler: Option<String>,

    /// Runtime executable name inside the binary directory
    #[arg(long, value_name = "NAME")]
    runtime: Option<String>,

    /// Also write the report as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Print the result of every test
    #[arg(long)]
    verbose_results: bool,

    /// Verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> RunnerConfig {
        let mut config = RunnerConfig {
            binary_path: self.binary_path.clone(),
            verbose: self.verbose_results,
            skip_list: self.skip_list.clone(),
            ..Default::default()
        };
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(name) = &self.compiler {
            config.compiler_name = name.clone();
        }
        if let Some(name) = &self.runtime {
            config.runtime_name = name.clone();
        }
        config
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = cli.config();
    tracing::info!(version = VERSION, ?config, "test262-runner");

    let runner = Runner::new(config)?;
    let report = runner.run(&cli.paths)?;

    print!("{}", report);

    if let Some(path) = &cli.json {
        let json = serde_json::to_string_pretty(&report.to_json())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write JSON report to '{}'", path.display()))?;
    }

    Ok(report.is_pass())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("\x1b[31merror:\x1b[0m {:#}", e);
            ExitCode::from(2)
        }
    }
}
