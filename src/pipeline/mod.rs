//! Per-account step sequencer
//!
//! Drives one account through the fixed step order, owning its session for
//! the whole run:
//!
//! ```text
//! Start ──login──▶ Authenticated ──sign──▶ SignedIn ──gang──▶ GroupAffiliated
//!   │                                                              │
//!   └─ login failed: stop                                        energy
//!                                                                  ▼
//! Done ◀──── UpgradesPlanned ◀──upgrades── TasksSwept ◀──tasks── EnergyCollected
//! ```
//!
//! Only an authentication failure ends the run early. Every later step logs
//! its own failures and hands control to the next step.

mod result;

pub use result::{PipelineResult, PipelineStage, StepRecord, StepStatus};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

use crate::client::{BumsApi, RemoteClient};
use crate::config::Config;
use crate::energy::{EnergyChunkPlan, EnergyCollector};
use crate::models::{AccountCredential, ProxyBinding, Session};
use crate::planner::{Budget, UpgradePlanner};
use crate::tasks::EpisodeCodes;
use crate::utils::error::{PipelineError, RemoteError};

/// Label used in logs when an account runs without a proxy
pub const NO_PROXY: &str = "No Proxy";

// ============================================================================
// Configuration
// ============================================================================

/// Settings shared by every account pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub invitation_code: String,
    pub secret_key: String,

    /// Gang joined by accounts that have none
    pub default_gang: String,

    /// Cooldown between remote-affecting steps
    pub step_delay: Duration,

    pub sweep_tasks: bool,
    pub plan_upgrades: bool,
    pub max_upgrade_cost: i64,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, sweep_tasks: bool, plan_upgrades: bool) -> Self {
        Self {
            invitation_code: config.api.invitation_code.clone(),
            secret_key: config.api.secret_key.clone(),
            default_gang: config.api.default_gang.clone(),
            step_delay: config.step_delay(),
            sweep_tasks,
            plan_upgrades,
            max_upgrade_cost: config.upgrades.max_upgrade_cost,
        }
    }
}

/// One account scheduled for a pass
#[derive(Debug, Clone, Copy)]
pub struct AccountJob<'a> {
    /// Position in the account list
    pub index: usize,
    pub credential: &'a AccountCredential,
    pub proxy: Option<&'a ProxyBinding>,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs the step sequence for one account at a time
#[derive(Clone)]
pub struct AccountPipeline {
    client: Arc<dyn RemoteClient>,
    settings: Arc<PipelineSettings>,
    codes: Arc<EpisodeCodes>,
}

impl AccountPipeline {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        settings: PipelineSettings,
        codes: Arc<EpisodeCodes>,
    ) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            codes,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run every step for `job`. All remote calls observe `cancel`.
    pub async fn run(&self, job: AccountJob<'_>, cancel: CancellationToken) -> PipelineResult {
        let span = tracing::info_span!(
            "account",
            n = job.index + 1,
            name = %job.credential.display_name(),
            ip = tracing::field::Empty,
        );

        async move {
            let api = BumsApi::new(self.client.as_ref(), job.proxy, &cancel);
            let ip = self.resolve_proxy_ip(&api).await;
            tracing::Span::current().record("ip", ip.as_str());

            self.run_steps(job, &api).await
        }
        .instrument(span)
        .await
    }

    /// External IP of the account's proxy, for logging only
    async fn resolve_proxy_ip(&self, api: &BumsApi<'_>) -> String {
        let Some(proxy) = api.proxy() else {
            return NO_PROXY.to_string();
        };

        match api.external_ip().await {
            Some(Ok(ip)) => ip,
            Some(Err(e)) => {
                let err = PipelineError::ProxyResolution(e);
                warn!(error = %err, proxy = %proxy, "Could not resolve proxy IP");
                proxy.display_host()
            }
            None => NO_PROXY.to_string(),
        }
    }

    async fn run_steps(&self, job: AccountJob<'_>, api: &BumsApi<'_>) -> PipelineResult {
        let mut result = PipelineResult::new(job.index, job.credential.display_name());
        info!("Starting account");

        let token = match api
            .login(job.credential.init_data(), &self.settings.invitation_code)
            .await
        {
            Ok(token) => token,
            Err(RemoteError::Cancelled) => {
                warn!("Login interrupted by shutdown");
                result.outcome = Err(PipelineError::Cancelled);
                return result;
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                result.outcome = Err(PipelineError::Auth(e));
                return result;
            }
        };
        info!("Login successful");
        let mut session = Session::new(token);
        result.advance(PipelineStage::Authenticated, StepStatus::Completed);
        self.cooldown().await;

        let status = self.daily_sign_in(api, &session).await;
        result.advance(PipelineStage::SignedIn, status);
        self.cooldown().await;

        let status = self.ensure_gang(api, &session).await;
        result.advance(PipelineStage::GroupAffiliated, status);
        self.cooldown().await;

        let status = self.collect_energy(api, &mut session, &mut result).await;
        result.advance(PipelineStage::EnergyCollected, status);
        self.cooldown().await;

        let status = self.sweep_tasks(api, &session, &mut result).await;
        result.advance(PipelineStage::TasksSwept, status);

        let status = self.plan_upgrades(api, &session, &mut result).await;
        result.advance(PipelineStage::UpgradesPlanned, status);

        result.finish();
        info!(
            energy = result.energy_collected,
            tasks = result.tasks_completed,
            upgrades = result.upgrades_purchased,
            failed_steps = result.failed_steps(),
            "Account finished"
        );
        result
    }

    async fn cooldown(&self) {
        tokio::time::sleep(self.settings.step_delay).await;
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    /// Sign the first available calendar day, if any
    async fn daily_sign_in(&self, api: &BumsApi<'_>, session: &Session) -> StepStatus {
        let days = match api.sign_list(session.token()).await {
            Ok(days) => days,
            Err(e) => {
                error!(error = %e, "Could not read sign-in calendar");
                return StepStatus::Failed(e);
            }
        };

        let Some(day) = days.iter().find(|d| d.is_available()) else {
            info!("No sign-in day available");
            return StepStatus::Skipped("no available day");
        };

        match api.sign(session.token()).await {
            Ok(()) => {
                info!(day = day.days, reward = %day.normal, "Signed in");
                StepStatus::Completed
            }
            Err(e) => {
                error!(error = %e, day = day.days, "Sign-in failed");
                StepStatus::Failed(e)
            }
        }
    }

    /// Join the default gang unless already affiliated
    async fn ensure_gang(&self, api: &BumsApi<'_>, session: &Session) -> StepStatus {
        let membership = match api.gang_membership(session.token()).await {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, "Could not read gang membership");
                return StepStatus::Failed(e);
            }
        };

        if membership.is_affiliated() {
            info!(gang = %membership.name, "Already in a gang");
            return StepStatus::Skipped("already affiliated");
        }

        let gang = &self.settings.default_gang;
        match api.join_gang(session.token(), gang).await {
            Ok(()) => {
                info!(gang = %gang, "Joined gang");
                StepStatus::Completed
            }
            Err(e) => {
                error!(error = %e, gang = %gang, "Could not join gang");
                StepStatus::Failed(e)
            }
        }
    }

    /// Snapshot the game state, then spend the stored energy
    async fn collect_energy(
        &self,
        api: &BumsApi<'_>,
        session: &mut Session,
        result: &mut PipelineResult,
    ) -> StepStatus {
        let game = match api.game_info(session.token()).await {
            Ok(game) => game,
            Err(e) => {
                error!(error = %e, "Could not read game info");
                return StepStatus::Failed(e);
            }
        };
        info!(coin = game.coin, energy = game.energy_surplus, "Game state");
        session.set_game(game);

        if game.energy_surplus <= 0 {
            warn!("Not enough energy to collect");
            return StepStatus::Skipped("no energy");
        }

        let plan = {
            let mut rng = rand::thread_rng();
            EnergyChunkPlan::generate(game.energy_surplus as u64, &mut rng)
        };

        let collector = EnergyCollector::new(*api, &self.settings.secret_key, self.settings.step_delay);
        let outcome = collector
            .run(session.token(), &plan, game.collect_seq_no)
            .await;

        session.record_collection(outcome.collected, outcome.next_seq_no);
        result.energy_collected = outcome.collected;

        match outcome.error {
            None => {
                info!(collected = outcome.collected, "Energy collected");
                StepStatus::Completed
            }
            Some(e) => {
                warn!(
                    collected = outcome.collected,
                    of = plan.total(),
                    "Energy collection stopped early"
                );
                StepStatus::Failed(e)
            }
        }
    }

    /// Finish every pending task, answering hidden-code tasks when the code is known
    async fn sweep_tasks(
        &self,
        api: &BumsApi<'_>,
        session: &Session,
        result: &mut PipelineResult,
    ) -> StepStatus {
        if !self.settings.sweep_tasks {
            return StepStatus::Skipped("disabled");
        }

        let tasks = match api.unfinished_tasks(session.token()).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "Could not read task list");
                return StepStatus::Failed(e);
            }
        };

        if tasks.is_empty() {
            warn!("No pending tasks");
            return StepStatus::Skipped("no pending tasks");
        }

        let mut failed = 0;
        for task in &tasks {
            let code = self.codes.code_for(task);
            if let Some((episode, _)) = code {
                info!(task = %task.name, episode, "Sending hidden code");
            }

            match api
                .finish_task(session.token(), task.id, code.map(|(_, c)| c))
                .await
            {
                Ok(()) => {
                    result.tasks_completed += 1;
                    info!(task = %task.name, reward = %task.reward, "Task completed");
                }
                Err(e) => {
                    failed += 1;
                    error!(task = %task.name, error = %e, "Task failed");
                }
            }

            self.cooldown().await;
        }

        StepStatus::from_counts(result.tasks_completed, failed)
    }

    /// Buy the best-yield upgrades the pre-collection balance allows
    async fn plan_upgrades(
        &self,
        api: &BumsApi<'_>,
        session: &Session,
        result: &mut PipelineResult,
    ) -> StepStatus {
        if !self.settings.plan_upgrades {
            return StepStatus::Skipped("disabled");
        }

        let Some(balance) = session.game().map(|g| g.coin) else {
            warn!("Balance unknown, skipping upgrades");
            return StepStatus::Skipped("balance unknown");
        };

        let catalog = match api.mine_list(session.token()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(error = %e, "Could not read upgrade catalog");
                return StepStatus::Failed(e);
            }
        };

        let planner = UpgradePlanner::new(self.settings.max_upgrade_cost);
        let candidates = planner.candidates(balance, &catalog);
        if candidates.is_empty() {
            warn!(balance, "No affordable upgrades");
            return StepStatus::Skipped("no affordable upgrades");
        }

        let mut budget = Budget::new(balance);
        let mut failed = 0;
        for option in candidates {
            if !budget.affords(option.cost) {
                continue;
            }

            match api.upgrade_mine(session.token(), option.id).await {
                Ok(()) => {
                    budget.spend(option.cost);
                    result.upgrades_purchased += 1;
                    info!(
                        mine = option.id,
                        cost = option.cost,
                        hourly_yield = option.hourly_yield,
                        remaining = budget.remaining(),
                        "Upgrade purchased"
                    );
                }
                Err(e) => {
                    failed += 1;
                    error!(mine = option.id, error = %e, "Upgrade failed");
                }
            }

            self.cooldown().await;
        }

        StepStatus::from_counts(result.upgrades_purchased, failed)
    }
}
