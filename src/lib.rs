//! bums-runner - multi-account automation for the Bums game API
//!
//! Logs a roster of accounts into the game backend and runs a fixed daily
//! routine for each of them: sign-in, gang membership, energy collection,
//! task completion and upgrade purchases. Accounts run in concurrent batches,
//! optionally each behind its own proxy, and the whole roster is processed
//! again after a cooldown.
//!
//! # Architecture
//!
//! - [`config`] - Configuration, account and proxy inputs
//! - [`client`] - HTTP transport and the typed endpoint facade
//! - [`energy`] - Energy split and checksummed collection protocol
//! - [`tasks`] - Task sweep support and the hidden-code table
//! - [`planner`] - Greedy upgrade selection
//! - [`pipeline`] - Per-account step sequencer
//! - [`scheduler`] - Batched, timed, cancellable execution of the roster
//! - [`models`] - Core data structures
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use bums_runner::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let roster = Roster::new(
//!         load_accounts(Path::new("data.txt"))?,
//!         load_proxies(Path::new("proxy.txt"))?,
//!     );
//!
//!     let client = Arc::new(BumsClient::new(ClientConfig::from(&config))?);
//!     let pipeline = AccountPipeline::new(
//!         client,
//!         PipelineSettings::from_config(&config, true, true),
//!         Arc::new(EpisodeCodes::with_overrides(&config.tasks.episode_codes)),
//!     );
//!
//!     let scheduler = BatchScheduler::new(pipeline, SchedulerSettings::from(&config));
//!     scheduler.run(&roster, Some(1), &CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod energy;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod scheduler;
pub mod tasks;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{BumsApi, BumsClient, ClientConfig, RemoteClient};
    pub use crate::config::{load_accounts, load_proxies, Config, Roster};
    pub use crate::error::{ClassifiedError, ErrorCategory, PipelineError, RemoteError};
    pub use crate::models::{AccountCredential, GameInfo, ProxyBinding, Session};
    pub use crate::pipeline::{AccountPipeline, PipelineResult, PipelineSettings, PipelineStage};
    pub use crate::scheduler::{AccountRunner, BatchScheduler, PassReport, SchedulerSettings};
    pub use crate::tasks::EpisodeCodes;
}

// Direct re-exports for convenience
pub use models::{AccountCredential, ProxyBinding};
