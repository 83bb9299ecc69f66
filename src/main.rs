use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bums_runner::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "bums-runner",
    version,
    about = "Multi-account automation for the Bums game API",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to bums.toml, then config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every account in batches, pass after pass
    Run {
        /// Account credentials, one per line
        #[arg(short, long, default_value = "data.txt")]
        accounts: PathBuf,

        /// Proxy URIs, one per line, matched to accounts by position
        #[arg(short, long, default_value = "proxy.txt")]
        proxies: PathBuf,

        /// Complete pending tasks (asked interactively when omitted)
        #[arg(long)]
        tasks: Option<bool>,

        /// Buy upgrades (asked interactively when omitted)
        #[arg(long)]
        upgrades: Option<bool>,

        /// Accounts per batch; 1 runs accounts one at a time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Run a single pass and exit
        #[arg(long, default_value = "false")]
        once: bool,
    },

    /// List parsed accounts and their proxy binding
    Accounts {
        #[arg(short, long, default_value = "data.txt")]
        accounts: PathBuf,

        #[arg(short, long, default_value = "proxy.txt")]
        proxies: PathBuf,
    },

    /// Resolve the external IP of every proxy
    Proxies {
        #[arg(short, long, default_value = "proxy.txt")]
        proxies: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("bums-runner starting");

    match cli.command {
        Commands::Run {
            accounts,
            proxies,
            tasks,
            upgrades,
            concurrency,
            once,
        } => {
            tracing::info!(
                accounts = %accounts.display(),
                proxies = %proxies.display(),
                concurrency = ?concurrency,
                once = %once,
                "Starting run command"
            );
            commands::run(
                config,
                commands::RunParams {
                    accounts,
                    proxies,
                    tasks,
                    upgrades,
                    concurrency,
                    once,
                },
            )
            .await?;
        }

        Commands::Accounts { accounts, proxies } => {
            commands::accounts(&accounts, &proxies)?;
        }

        Commands::Proxies { proxies } => {
            commands::proxies(&config, &proxies).await?;
        }
    }

    tracing::info!("bums-runner finished");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("bums_runner=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("bums_runner={level},warn")))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
