use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use proctor_core::{RunContext, TestOutcome};
use proctor_launch::{doctor, LaunchConfig, LaunchOptions, LaunchPack, Launcher, RunnerKind};

#[derive(Parser)]
#[command(name = "proctor", version, about = "Run tests and capture the results in an attestation")]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the test runner and write the result document
    Run(RunArgs),

    /// Check that a launch in the directory has what it needs
    Doctor(Target),

    /// Print the version
    Version,
}

#[derive(Args)]
struct Target {
    /// Path to the codebase
    #[arg(value_name = "DIR")]
    path: Option<PathBuf>,

    /// Path to the codebase (wins over the positional argument)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Configuration file, defaults to .proctor.toml or .proctor.yaml in the codebase
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Test runner: auto, go or command
    #[arg(short, long)]
    runner: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    target: Target,

    /// Output the entire in-toto statement instead of the predicate
    #[arg(short, long, value_name = "BOOL")]
    attest: Option<bool>,

    /// File to write the predicate or attestation to, `-` for stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Exit non-zero when any test failed
    #[arg(long)]
    fail_on_test_failure: bool,
}

impl Target {
    fn work_dir(&self) -> PathBuf {
        self.dir.clone().or_else(|| self.path.clone()).unwrap_or_else(|| PathBuf::from("."))
    }

    /// Config file values with the command line flags applied on top.
    fn load(&self) -> Result<(PathBuf, LaunchConfig)> {
        let work_dir = self.work_dir();
        let mut cfg = match &self.config {
            Some(path) => LaunchConfig::load_from(path)?,
            None => LaunchConfig::discover(&work_dir)?,
        };
        if let Some(kind) = &self.runner {
            cfg.runner.kind = kind.parse::<RunnerKind>()?;
        }
        Ok((work_dir, cfg))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match dispatch(cli.cmd) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("proctor: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cmd: Command) -> Result<ExitCode> {
    match cmd {
        Command::Run(args) => run(args),
        Command::Doctor(target) => {
            let (work_dir, cfg) = target.load()?;
            for check in doctor(&work_dir, &cfg)? {
                println!("ok  {:<10} {}", check.name, check.detail);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Version => {
            println!("proctor {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let (work_dir, mut cfg) = args.target.load()?;
    if let Some(attest) = args.attest {
        cfg.output.attest = attest;
    }
    if let Some(output) = args.output {
        cfg.output.path = output;
    }
    cfg.validate(&work_dir).context("invalid options")?;

    let pack = LaunchPack::from_config(&work_dir, &cfg.runner).context("building launchpack")?;

    let output_path = cfg.output_path();
    let writer: Box<dyn Write + Send> = match &output_path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("opening file {}", path.display()))?;
            info!(path = %path.display(), "writing results");
            Box::new(file)
        }
        None => Box::new(std::io::stdout()),
    };

    let mut launcher = Launcher::new(LaunchOptions::from_config(&work_dir, &cfg, Some(writer)));
    let launched = launcher.test(&RunContext::new(), &pack);
    // Closes the file before it is removed.
    drop(launcher);
    let result = match launched {
        Ok(result) => result,
        Err(e) => {
            if let Some(path) = &output_path {
                if let Err(rm) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), "removing output file: {rm}");
                }
            }
            return Err(e);
        }
    };

    if args.fail_on_test_failure && result.result == TestOutcome::Fail {
        warn!(failed = result.failed_tests.len(), "tests failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
