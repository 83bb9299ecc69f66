//! Per-account pipeline outcome

use std::fmt;

use crate::utils::error::{PipelineError, RemoteError};

/// Pipeline states in forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Start,
    Authenticated,
    SignedIn,
    GroupAffiliated,
    EnergyCollected,
    TasksSwept,
    UpgradesPlanned,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Authenticated => "authenticated",
            Self::SignedIn => "signed_in",
            Self::GroupAffiliated => "group_affiliated",
            Self::EnergyCollected => "energy_collected",
            Self::TasksSwept => "tasks_swept",
            Self::UpgradesPlanned => "upgrades_planned",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Remote work done
    Completed,
    /// Nothing to do (no available day, already in a gang, no energy, disabled)
    Skipped(&'static str),
    /// Item-wise step where some items failed
    Partial { succeeded: usize, failed: usize },
    /// The step's remote work failed; later steps still run
    Failed(RemoteError),
}

impl StepStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Partial { .. })
    }

    /// Item-wise status from success and failure counts
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        if failed == 0 {
            Self::Completed
        } else {
            Self::Partial { succeeded, failed }
        }
    }
}

/// Record of one executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub stage: PipelineStage,
    pub status: StepStatus,
}

/// Outcome of one account pipeline run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Position of the account in the input list
    pub index: usize,

    /// Display name of the account
    pub account: String,

    /// `Err` only for authentication failure or timeout
    pub outcome: Result<(), PipelineError>,

    /// Furthest stage reached
    pub stage: PipelineStage,

    /// Steps after authentication, in execution order
    pub steps: Vec<StepRecord>,

    pub energy_collected: u64,
    pub tasks_completed: usize,
    pub upgrades_purchased: usize,
}

impl PipelineResult {
    pub fn new(index: usize, account: impl Into<String>) -> Self {
        Self {
            index,
            account: account.into(),
            outcome: Ok(()),
            stage: PipelineStage::Start,
            steps: Vec::new(),
            energy_collected: 0,
            tasks_completed: 0,
            upgrades_purchased: 0,
        }
    }

    /// Result for an account that never got past `Start`
    pub fn failed(index: usize, account: impl Into<String>, error: PipelineError) -> Self {
        let mut result = Self::new(index, account);
        result.outcome = Err(error);
        result
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&PipelineError> {
        self.outcome.as_ref().err()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.outcome, Err(PipelineError::Timeout(_)))
    }

    /// Move to `stage`, recording how the step that reached it ended
    pub fn advance(&mut self, stage: PipelineStage, status: StepStatus) {
        self.stage = stage;
        self.steps.push(StepRecord { stage, status });
    }

    pub fn finish(&mut self) {
        self.stage = PipelineStage::Done;
    }

    /// Status of the step that reached `stage`, if it ran
    pub fn step(&self, stage: PipelineStage) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|record| record.stage == stage)
            .map(|record| &record.status)
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|r| r.status.is_failure()).count()
    }
}
