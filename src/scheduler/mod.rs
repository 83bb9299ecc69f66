//! Batch scheduler
//!
//! Runs the account roster in fixed-width batches. Accounts inside a batch
//! run concurrently, each under its own timeout and cancellation token; the
//! next batch starts only after every member of the current one has finished
//! or timed out.
//!
//! ```text
//! pass N
//!   ├─ batch [0..c)   ──join──▶ cooldown (batch)
//!   ├─ batch [c..2c)  ──join──▶ cooldown (batch)
//!   └─ batch [.. n)   ──join──▶ report
//! cooldown (pass) ──▶ pass N+1
//! ```
//!
//! A triggered shutdown token stops the loop before the next batch and wakes
//! any cooldown early. In-flight accounts see the cancellation through their
//! child tokens.

use async_trait::async_trait;
use futures::future::join_all;
use std::ops::Range;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, Roster};
use crate::error::{ClassifiedError, ErrorCategory};
use crate::pipeline::{AccountJob, AccountPipeline, PipelineResult};
use crate::utils::error::PipelineError;
use crate::utils::format_duration;

/// Anything that can process one account
#[async_trait]
pub trait AccountRunner: Send + Sync {
    /// Process `job`, observing `cancel` for every remote call
    async fn run_account(&self, job: AccountJob<'_>, cancel: CancellationToken) -> PipelineResult;
}

#[async_trait]
impl AccountRunner for AccountPipeline {
    async fn run_account(&self, job: AccountJob<'_>, cancel: CancellationToken) -> PipelineResult {
        self.run(job, cancel).await
    }
}

/// Scheduler timing and width
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Accounts per batch
    pub concurrency: usize,

    /// Per-account wall-clock limit
    pub account_timeout: Duration,

    /// Pause between batches of one pass
    pub batch_cooldown: Duration,

    /// Pause between passes
    pub pass_cooldown: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.scheduler.concurrency,
            account_timeout: config.account_timeout(),
            batch_cooldown: config.batch_cooldown(),
            pass_cooldown: config.pass_cooldown(),
        }
    }
}

impl SchedulerSettings {
    /// Width 1 gives the sequential variant
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Consecutive index ranges of at most `width` accounts
pub fn batch_ranges(len: usize, width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    (0..len)
        .step_by(width)
        .map(|start| start..(start + width).min(len))
        .collect()
}

/// Summary of one pass over the roster
#[derive(Debug, Clone)]
pub struct PassReport {
    /// 1-based pass number
    pub pass: u64,

    /// Accounts per batch, in execution order
    pub batch_sizes: Vec<usize>,

    /// One result per executed account, in roster order
    pub results: Vec<PipelineResult>,

    pub elapsed: Duration,

    /// Shutdown stopped the pass before every batch ran
    pub interrupted: bool,
}

impl PassReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn timed_out(&self) -> usize {
        self.results.iter().filter(|r| r.is_timeout()).count()
    }

    pub fn log_summary(&self) {
        info!(
            pass = self.pass,
            accounts = self.results.len(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            timed_out = self.timed_out(),
            elapsed = %format_duration(self.elapsed),
            interrupted = self.interrupted,
            "Pass complete"
        );
    }
}

/// Drives passes over the roster with a fixed concurrency width
pub struct BatchScheduler<R> {
    runner: R,
    settings: SchedulerSettings,
}

impl<R: AccountRunner> BatchScheduler<R> {
    pub fn new(runner: R, settings: SchedulerSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run passes until `shutdown` fires or `max_passes` have completed.
    /// Returns the number of passes started.
    pub async fn run(&self, roster: &Roster, max_passes: Option<u64>, shutdown: &CancellationToken) -> u64 {
        let mut pass = 0;

        loop {
            pass += 1;
            let report = self.run_pass(roster, pass, shutdown).await;
            report.log_summary();

            if shutdown.is_cancelled() || max_passes.is_some_and(|max| pass >= max) {
                break;
            }

            info!(
                wait = %format_duration(self.settings.pass_cooldown),
                "Waiting before next pass"
            );
            if !sleep_or_shutdown(self.settings.pass_cooldown, shutdown).await {
                break;
            }
        }

        info!(passes = pass, "Scheduler stopped");
        pass
    }

    /// Run every account once, batch by batch
    pub async fn run_pass(&self, roster: &Roster, pass: u64, shutdown: &CancellationToken) -> PassReport {
        let started = Instant::now();
        let ranges = batch_ranges(roster.len(), self.settings.concurrency);
        let batch_count = ranges.len();

        let mut report = PassReport {
            pass,
            batch_sizes: Vec::with_capacity(batch_count),
            results: Vec::with_capacity(roster.len()),
            elapsed: Duration::ZERO,
            interrupted: false,
        };

        info!(pass, accounts = roster.len(), batches = batch_count, "Starting pass");

        for (n, range) in ranges.into_iter().enumerate() {
            if shutdown.is_cancelled() {
                warn!(pass, batch = n + 1, "Shutdown requested, stopping pass");
                report.interrupted = true;
                break;
            }

            info!(batch = n + 1, of = batch_count, accounts = range.len(), "Starting batch");
            report.batch_sizes.push(range.len());
            let results = self.run_batch(roster, range, shutdown).await;
            report.results.extend(results);

            if n + 1 < batch_count && !sleep_or_shutdown(self.settings.batch_cooldown, shutdown).await {
                report.interrupted = true;
                break;
            }
        }

        report.elapsed = started.elapsed();
        report
    }

    async fn run_batch(&self, roster: &Roster, range: Range<usize>, shutdown: &CancellationToken) -> Vec<PipelineResult> {
        let runs = range.map(|index| self.run_with_timeout(roster, index, shutdown));
        join_all(runs).await
    }

    /// Run one account under the per-account timeout. A timed-out account is
    /// cancelled and dropped; its batch peers are unaffected.
    async fn run_with_timeout(&self, roster: &Roster, index: usize, shutdown: &CancellationToken) -> PipelineResult {
        let credential = &roster.accounts()[index];
        let job = AccountJob {
            index,
            credential,
            proxy: roster.proxy_for(index),
        };
        let cancel = shutdown.child_token();
        let limit = self.settings.account_timeout;

        let result = match tokio::time::timeout(limit, self.runner.run_account(job, cancel.clone())).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                PipelineResult::failed(index, credential.display_name(), PipelineError::Timeout(limit))
            }
        };

        match result.error() {
            None => info!(account = index + 1, name = %result.account, stage = %result.stage, "Account succeeded"),
            Some(e) if e.category() == ErrorCategory::Cancelled => {
                warn!(account = index + 1, name = %result.account, stage = %result.stage, "Account interrupted")
            }
            Some(e) => error!(
                account = index + 1,
                name = %result.account,
                kind = e.kind(),
                category = e.category().description(),
                retry_next_pass = e.is_recoverable(),
                error = %e,
                "Account failed"
            ),
        }
        result
    }
}

/// Sleep for `duration`; `false` if shutdown fired first
async fn sleep_or_shutdown(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.cancelled() => false,
    }
}
