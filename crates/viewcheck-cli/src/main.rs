//! viewcheck CLI - report view verification probe
//!
//! Usage:
//!   viewcheck run               Load the report view and print a verdict
//!   viewcheck init [path]       Write .viewcheck/config.toml with defaults
//!
//! Exit codes: 0 when the data is visible, 1 when it is not, 2 when the run
//! could not reach a verdict.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use viewcheck_browser::Probe;
use viewcheck_core::ProbeConfig;

#[derive(Parser, Debug)]
#[command(name = "viewcheck")]
#[command(author, version, about = "Verify that a report view renders its data")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the report view once and judge it
    Run(RunArgs),

    /// Write the default configuration file
    Init {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Full view URL (overrides base URL and report id)
    #[arg(long)]
    url: Option<String>,

    /// Report server base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Report identifier
    #[arg(long)]
    report_id: Option<String>,

    /// Configuration file (defaults to .viewcheck/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Save a full-page screenshot, optionally to PATH
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    screenshot: Option<Option<PathBuf>>,

    /// Delay after the network goes quiet, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Navigation timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    /// Flags win over file and environment
    fn apply(&self, config: &mut ProbeConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
            config.url = None;
        }
        if let Some(id) = &self.report_id {
            config.report_id = id.clone();
            config.url = None;
        }
        // A full URL from the environment must not shadow explicit URL parts
        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(path) = &self.screenshot {
            config.screenshot.enabled = true;
            if let Some(path) = path {
                config.screenshot.path = path.clone();
            }
        }
        if let Some(ms) = self.settle_ms {
            config.timing.settle_delay_ms = ms;
        }
        if let Some(secs) = self.timeout_secs {
            config.timing.navigation_timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to set up logging: {}", e);
    }

    let outcome = match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Init { path } => cmd_init(path).map(|()| true),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr; stdout is reserved for the report
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = builder.with_env_filter(EnvFilter::from_default_env()).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_config(args: &RunArgs) -> Result<ProbeConfig> {
    let mut config = match &args.config {
        Some(path) => ProbeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            ProbeConfig::load_or_default(&cwd).context("Failed to load .viewcheck/config.toml")?
        }
    };
    config.apply_env(|key| std::env::var(key).ok());
    args.apply(&mut config);
    Ok(config)
}

/// Returns whether the verdict passed
async fn cmd_run(args: RunArgs) -> Result<bool> {
    let config = load_config(&args)?;
    let probe = Probe::new(config).context("Invalid configuration")?;

    let report = probe
        .run()
        .await
        .with_context(|| format!("Probe of {} did not reach a verdict", probe.config().target_url()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    info!("Verdict: {}", report.verdict());
    Ok(report.passed())
}

fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Initializing viewcheck in {:?}", path);

    let written = ProbeConfig::write_default(&path)
        .with_context(|| format!("Failed to write config under {}", path.display()))?;

    println!("Initialized viewcheck in {:?}", path);
    println!("Created:");
    println!("  {}", written.display());
    println!("\nNext steps:");
    println!("  1. Set base_url and report_id in the config");
    println!("  2. Run: viewcheck run");

    Ok(())
}
