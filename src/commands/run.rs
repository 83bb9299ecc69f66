use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio_util::sync::CancellationToken;

use bums_runner::client::{BumsClient, ClientConfig};
use bums_runner::config::{load_accounts, load_proxies, Config, Roster};
use bums_runner::pipeline::{AccountPipeline, PipelineSettings};
use bums_runner::scheduler::{BatchScheduler, SchedulerSettings};
use bums_runner::tasks::EpisodeCodes;
use bums_runner::utils::parse_yes_no;

pub struct RunParams {
    pub accounts: PathBuf,
    pub proxies: PathBuf,
    pub tasks: Option<bool>,
    pub upgrades: Option<bool>,
    pub concurrency: Option<usize>,
    pub once: bool,
}

pub async fn run(mut config: Config, params: RunParams) -> Result<()> {
    let accounts = load_accounts(&params.accounts)
        .with_context(|| format!("Cannot start without accounts from {}", params.accounts.display()))?;
    let proxies = load_proxies(&params.proxies)?;
    let roster = Roster::new(accounts, proxies);

    tracing::info!(
        accounts = roster.len(),
        proxies = roster.proxies().len(),
        "Inputs loaded"
    );

    let mut prompt = Prompt::terminal();
    let sweep_tasks = match params.tasks {
        Some(choice) => choice,
        None => prompt.ask("Do you want to do tasks? (y/n): ").await?,
    };
    let plan_upgrades = match params.upgrades {
        Some(choice) => choice,
        None => prompt.ask("Do you want to upgrade cards? (y/n): ").await?,
    };

    if let Some(concurrency) = params.concurrency {
        config.scheduler.concurrency = concurrency;
        config.validate()?;
    }

    let client = Arc::new(BumsClient::new(ClientConfig::from(&config)).context("Failed to build HTTP client")?);
    let codes = Arc::new(EpisodeCodes::with_overrides(&config.tasks.episode_codes));
    let pipeline = AccountPipeline::new(
        client,
        PipelineSettings::from_config(&config, sweep_tasks, plan_upgrades),
        codes,
    );
    let scheduler = BatchScheduler::new(pipeline, SchedulerSettings::from(&config));

    tracing::info!(
        tasks = sweep_tasks,
        upgrades = plan_upgrades,
        concurrency = scheduler.settings().concurrency,
        max_upgrade_cost = config.upgrades.max_upgrade_cost,
        "Scheduler configured"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown requested, finishing current batch");
            signal_token.cancel();
        }
    });

    let max_passes = params.once.then_some(1);
    scheduler.run(&roster, max_passes, &shutdown).await;

    Ok(())
}

/// Yes/no questions sharing one buffered input
struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<BufReader<Stdin>, Stdout> {
    fn terminal() -> Self {
        Self {
            input: BufReader::new(tokio::io::stdin()),
            output: tokio::io::stdout(),
        }
    }
}

impl<R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin> Prompt<R, W> {
    async fn ask(&mut self, question: &str) -> Result<bool> {
        self.output.write_all(question.as_bytes()).await?;
        self.output.flush().await?;

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .await
            .context("Failed to read answer")?;

        Ok(parse_yes_no(&answer))
    }
}
