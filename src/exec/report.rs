//! Per-step outcomes and the run report.

use serde::Serialize;

use crate::error::JaavisError;
use crate::plan::CommandStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub step: CommandStep,
    pub status: StepStatus,
    /// Exit code of the last attempt; `None` when nothing was launched.
    pub exit_code: Option<i32>,
    /// Wall time across all attempts.
    pub duration_ms: u64,
    pub attempts: u32,
}

impl ExecutionOutcome {
    #[must_use]
    pub const fn was_attempted(&self) -> bool {
        self.attempts > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub aborted: bool,
}

/// Ordered outcomes of one run. Steps after an abort have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub outcomes: Vec<ExecutionOutcome>,
    pub aborted: bool,
}

impl ExecutionReport {
    /// Outcomes for steps that launched at least one process.
    pub fn attempted(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.outcomes.iter().filter(|o| o.was_attempted())
    }

    /// Steps worth keeping when a run is harvested into a skill:
    /// everything that was attempted and not skipped.
    #[must_use]
    pub fn harvestable_steps(&self) -> Vec<&CommandStep> {
        self.attempted()
            .filter(|o| o.status != StepStatus::Skipped)
            .map(|o| &o.step)
            .collect()
    }

    #[must_use]
    pub const fn has_hard_failure(&self) -> bool {
        self.aborted
    }

    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let count = |status| self.outcomes.iter().filter(|o| o.status == status).count();
        ReportSummary {
            succeeded: count(StepStatus::Success),
            failed: count(StepStatus::Failed),
            skipped: count(StepStatus::Skipped),
            aborted: self.aborted,
        }
    }

    /// `Execution` error for an aborted run, naming the step that stopped it.
    /// The report itself stays with the caller.
    #[must_use]
    pub fn abort_error(&self) -> Option<JaavisError> {
        if !self.aborted {
            return None;
        }
        let (step, exit_code) = self
            .outcomes
            .last()
            .map(|o| (o.step.label.clone(), o.exit_code.unwrap_or(-1)))
            .unwrap_or_default();
        Some(JaavisError::Execution { step, exit_code })
    }
}
