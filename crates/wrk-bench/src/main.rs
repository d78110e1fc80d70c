// Numan Thabit 2025
mod config;
mod report;
mod runner;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{BenchConfig, TestCase, BOTH};
use humantime::format_duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(author, version, about = "wrk load-test orchestrator and reporter")]
struct Cli {
    /// Optional TOML file with wrk settings and the test catalog.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for results envelopes and generated reports.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Overrides the wrk binary from the config.
    #[arg(long)]
    wrk_bin: Option<PathBuf>,

    /// Overrides the per-run load duration (e.g. `5m`).
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Overrides the maximum time a single wrk run may take.
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Overrides the pause between consecutive runs.
    #[arg(long, value_parser = humantime::parse_duration)]
    cooldown: Option<Duration>,

    /// When set, only print the actions that would be taken.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the selected test cases and persist a results envelope.
    Run {
        /// Case key from the catalog, or `both`.
        #[arg(default_value = BOTH)]
        case: String,
    },
    /// Render the text report and HTML dashboard for a results envelope.
    Report {
        /// Envelope to report on; defaults to the newest one in the output directory.
        #[arg(long)]
        results: Option<PathBuf>,
    },
    /// Run the selected cases, then report on the fresh envelope.
    Suite {
        #[arg(default_value = BOTH)]
        case: String,
    },
    /// Print the configured test catalog.
    List,
}

impl Cli {
    async fn bench_config(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path).await?,
            None => BenchConfig::default(),
        };
        if let Some(bin) = &self.wrk_bin {
            config.wrk_bin = bin.clone();
        }
        if self.duration.is_some() {
            config.duration = self.duration;
        }
        if self.timeout.is_some() {
            config.timeout = self.timeout;
        }
        if self.cooldown.is_some() {
            config.cooldown = self.cooldown;
        }
        config.validate()?;
        Ok(config)
    }
}

fn log_dry_run(config: &BenchConfig, cases: &[&TestCase]) {
    info!(
        bin = %config.wrk_bin.display(),
        threads = config.threads,
        connections = config.connections,
        duration = %format_duration(config.duration()),
        timeout = %format_duration(config.timeout()),
        cooldown = %format_duration(config.cooldown()),
        "dry run: wrk settings"
    );
    for case in cases {
        info!(
            test = %case.name,
            script = %case.script.display(),
            exists = case.script.exists(),
            command = %runner::command_line(config, case),
            "dry run: would execute wrk"
        );
    }
}

fn print_catalog(config: &BenchConfig) {
    println!("Available test cases:");
    for case in &config.cases {
        println!("  {:<6} {} - {}", case.key, case.name, case.description);
        println!("         url:    {}", case.url);
        println!("         script: {}", case.script.display());
    }
    println!("  {BOTH:<6} every case above, in order");
}

async fn run(cli: &Cli, config: &BenchConfig, selector: &str) -> Result<Option<PathBuf>> {
    let cases = config.select(selector)?;
    if cli.dry_run {
        log_dry_run(config, &cases);
        return Ok(None);
    }
    let envelope = runner::run_cases(config, &cases).await?;
    let path = runner::persist(&envelope, &cli.output_dir)?;
    info!(path = %path.display(), runs = envelope.len(), "results saved");
    Ok(Some(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = cli.bench_config().await?;

    match &cli.command {
        Command::List => print_catalog(&config),
        Command::Run { case } => {
            run(&cli, &config, case).await?;
        }
        Command::Report { results } => {
            let results = report::resolve_results(results.as_deref(), &cli.output_dir)?;
            if cli.dry_run {
                info!(path = %results.display(), "dry run: would render reports");
                return Ok(());
            }
            report::generate(&results, &cli.output_dir).await?;
        }
        Command::Suite { case } => {
            if let Some(results) = run(&cli, &config, case).await? {
                let generated = report::generate(&results, &cli.output_dir).await?;
                info!(
                    report = %generated.text.display(),
                    dashboard = %generated.dashboard.display(),
                    "suite complete"
                );
            }
        }
    }

    Ok(())
}
