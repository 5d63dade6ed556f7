#![warn(missing_docs)]
//! Performic CLI Library
//!
//! Command-line driver for benchmark sessions. Wires the external kernel
//! programs, the host temperature probe and the configured hooks into the
//! orchestration engine, then renders the report.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     performic_cli::run()
//! }
//! ```

mod config;
mod executor;
mod gpu_kernel;
mod hooks;
mod kernel;
mod probe;
mod supervisor;

pub use config::*;
pub use executor::{
    GpuPlan, HEADLESS_SURFACE, SessionOutcome, SessionPlan, build_report, collect_system_info,
    execute_session, format_human_output, format_result,
};
pub use gpu_kernel::{CommandGpuKernel, GpuLine, SURFACE_ENV, parse_gpu_line};
pub use hooks::CommandHooks;
pub use kernel::CommandKernel;
pub use probe::SysinfoProbe;
pub use supervisor::{ProcessHandle, SupervisorError, TERMINATE_DRAIN};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use performic_core::OrchestratorConfig;
use performic_payload::try_decode;
use performic_report::{OutputFormat, Report, generate_csv_report, generate_json_report};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Performic CLI arguments
#[derive(Parser, Debug)]
#[command(name = "performic")]
#[command(author, version, about = "Performic - device benchmark orchestrator")]
pub struct Cli {
    /// Optional subcommand (Run, Decode, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: performic.toml discovered upward from the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format: human, json, csv
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Thermal sampling interval (e.g. "500ms")
    #[arg(long, global = true)]
    pub interval: Option<String>,

    /// Use this GPU score instead of running the GPU kernel
    #[arg(long, global = true)]
    pub gpu_score: Option<f64>,

    /// Refuse to start at or above this temperature (°C)
    #[arg(long, global = true)]
    pub max_start_temperature: Option<f32>,

    /// Compute kernel command, overriding [kernel] command
    #[arg(long, global = true, num_args = 1.., allow_hyphen_values = true)]
    pub kernel: Option<Vec<String>>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a benchmark session (default)
    Run,
    /// Decode a saved kernel payload and print the structured result
    Decode {
        /// Payload file
        #[arg(name = "FILE")]
        file: PathBuf,
    },
    /// Print a default performic.toml
    Init,
}

/// Run the Performic CLI with process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong. A failed
/// benchmark run exits the process with status 1.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Performic CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        "performic=debug"
    } else {
        "performic=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Init) = cli.command {
        print!("{}", PerformicConfig::default_toml());
        return Ok(());
    }

    // Explicit --config wins, then discovery, then defaults
    let config = match &cli.config {
        Some(path) => PerformicConfig::load(path)?,
        None => PerformicConfig::discover()?.unwrap_or_default(),
    };

    let format = resolve_format(&cli, &config);

    let success = match cli.command {
        Some(Commands::Decode { ref file }) => decode_payload(&cli, &config, file, format)?,
        Some(Commands::Run) | None => run_benchmark(&cli, &config, format)?,
        Some(Commands::Init) => true,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn resolve_format(cli: &Cli, config: &PerformicConfig) -> OutputFormat {
    let requested = cli.format.as_deref().unwrap_or(&config.output.format);
    requested.parse().unwrap_or_else(|e| {
        warn!("{}; using human output", e);
        OutputFormat::Human
    })
}

/// Build the orchestrator settings from performic.toml plus CLI overrides
fn build_orchestrator_config(
    cli: &Cli,
    config: &PerformicConfig,
) -> anyhow::Result<OrchestratorConfig> {
    let sample_interval = match &cli.interval {
        Some(interval) => parse_duration(interval).context("--interval")?,
        None => config.sample_interval()?,
    };
    if sample_interval.is_zero() {
        anyhow::bail!("sampling interval must be greater than zero");
    }

    Ok(OrchestratorConfig {
        sample_interval,
        join_grace: config.join_grace()?,
        max_start_temperature: cli
            .max_start_temperature
            .or(config.gate.max_start_temperature),
    })
}

fn build_gpu_plan(cli: &Cli, config: &PerformicConfig) -> anyhow::Result<GpuPlan> {
    if let Some(score) = cli.gpu_score {
        if !score.is_finite() || score < 0.0 {
            anyhow::bail!("--gpu-score must be a non-negative number");
        }
        return Ok(GpuPlan::Fixed(score));
    }
    if config.gpu.command.is_empty() {
        return Ok(GpuPlan::Skip);
    }
    Ok(GpuPlan::Kernel(Arc::new(CommandGpuKernel::new(
        config.gpu.command.clone(),
        config.gpu_timeout()?,
    ))))
}

fn run_benchmark(
    cli: &Cli,
    config: &PerformicConfig,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let kernel_argv = cli
        .kernel
        .clone()
        .filter(|argv| !argv.is_empty())
        .unwrap_or_else(|| config.kernel.command.clone());
    if kernel_argv.is_empty() {
        anyhow::bail!(
            "no compute kernel configured; set [kernel] command in performic.toml or pass --kernel"
        );
    }

    let plan = SessionPlan {
        orchestrator: build_orchestrator_config(cli, config)?,
        kernel: Arc::new(CommandKernel::new(kernel_argv, config.kernel_timeout()?)),
        probe: Arc::new(SysinfoProbe::new(config.sampler.sensor.clone())),
        hooks: Arc::new(CommandHooks::new(
            config.hooks.prepare.clone(),
            config.hooks.cleanup.clone(),
            config.hook_timeout()?,
        )),
        gpu: build_gpu_plan(cli, config)?,
    };

    info!(
        interval_ms = plan.orchestrator.sample_interval.as_millis() as u64,
        "starting benchmark session"
    );

    let progress = ProgressBar::new_spinner();
    let outcome = execute_session(plan, &progress)?;
    let report = build_report(outcome, &config.reference);

    let output = render(&report, format)?;
    write_output(cli, config, &output)?;

    if !report.is_success() {
        eprintln!("\nBenchmark failed: {}", report.result.message());
    }
    Ok(report.is_success())
}

fn render(report: &Report, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Csv => generate_csv_report(report),
        OutputFormat::Human => format_human_output(report),
    })
}

fn decode_payload(
    cli: &Cli,
    config: &PerformicConfig,
    file: &Path,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let payload = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let result = match try_decode(&payload) {
        Ok(result) => result,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "payload rejected");
            performic_payload::decode(&payload)
        }
    };

    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)? + "\n",
        OutputFormat::Csv | OutputFormat::Human => format_result(&result),
    };
    write_output(cli, config, &output)?;
    Ok(result.is_success())
}

fn write_output(cli: &Cli, config: &PerformicConfig, output: &str) -> anyhow::Result<()> {
    match cli.output.as_ref().or(config.output.path.as_ref()) {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            file.write_all(output.as_bytes())?;
            println!("Report written to: {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}
