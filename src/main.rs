mod pipeline;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pulse_core::config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::pipeline::RunOptions;

#[derive(Parser)]
#[command(
    name = "slack-pulse",
    about = "Channel and member engagement statistics for a Slack workspace",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/slack-pulse/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the workspace, write the snapshot, and export statistics (default)
    Run(WindowArgs),

    /// Recompute statistics from the last snapshot without calling the API
    Report(WindowArgs),

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Args, Default)]
struct WindowArgs {
    /// First day included in the statistics (local date, inclusive)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Last day included in the statistics (local date, inclusive; default: now)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Also export a per-day timeline starting at this date
    #[arg(long)]
    timeline_since: Option<NaiveDate>,
}

impl From<WindowArgs> for RunOptions {
    fn from(args: WindowArgs) -> Self {
        Self {
            since: args.since,
            until: args.until,
            timeline_since: args.timeline_since,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "slack_pulse=info,pulse_core=info,pulse_analytics=info,warn".into()
        }))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // The token may live in a .env file next to the data directory.
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }

    match cli.command {
        Some(Commands::Run(args)) => pipeline::run(&config, args.into()).await?,
        None => pipeline::run(&config, RunOptions::default()).await?,
        Some(Commands::Report(args)) => pipeline::report(&config, args.into())?,
        Some(Commands::Config { action }) => handle_config_command(action, &config)?,
    }

    Ok(())
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let mut shown = config.clone();
            if shown.slack.token.is_some() {
                shown.slack.token = Some("********".into());
            }
            let toml_str = toml::to_string_pretty(&shown)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
