//! The retry/skip/abort execution loop.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::plan::{CommandPlan, CommandStep};

use super::observer::{ExecutionObserver, NoopObserver};
use super::policy::{FailureAction, FailurePolicy};
use super::report::{ExecutionOutcome, ExecutionReport, StepStatus};
use super::runner::{LAUNCH_FAILURE_EXIT, StepRunner};

/// Runs a plan step by step.
///
/// A non-zero exit hands the decision to the failure policy. Retry launches
/// the same step again with no limit, Skip records the step and moves on,
/// Abort records the step as failed and ends the run. Abort is only
/// evaluated between launches; a running process is never interrupted.
pub struct ExecutionEngine<'a> {
    runner: &'a mut dyn StepRunner,
    policy: &'a mut dyn FailurePolicy,
    observer: Box<dyn ExecutionObserver + 'a>,
    dry_run: bool,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(runner: &'a mut dyn StepRunner, policy: &'a mut dyn FailurePolicy) -> Self {
        Self {
            runner,
            policy,
            observer: Box::new(NoopObserver),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl ExecutionObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// In dry-run mode every step is recorded as skipped and nothing launches.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn execute(&mut self, plan: &CommandPlan) -> ExecutionReport {
        let total = plan.len();
        let mut report = ExecutionReport::default();
        self.observer.plan_started(total);
        info!(steps = total, dry_run = self.dry_run, "execution started");

        for (index, step) in plan.iter().enumerate() {
            self.observer.step_started(index, total, step);

            if self.dry_run {
                let outcome = ExecutionOutcome {
                    step: step.clone(),
                    status: StepStatus::Skipped,
                    exit_code: None,
                    duration_ms: 0,
                    attempts: 0,
                };
                self.observer.step_finished(&outcome, true);
                report.outcomes.push(outcome);
                continue;
            }

            let outcome = self.run_step(step);
            let stop = outcome.status == StepStatus::Failed;
            self.observer.step_finished(&outcome, false);
            report.outcomes.push(outcome);
            if stop {
                report.aborted = true;
                warn!(step = %step.label, "execution aborted");
                break;
            }
        }

        self.observer.run_finished(&report);
        let summary = report.summary();
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            aborted = report.aborted,
            "execution finished"
        );
        report
    }

    fn run_step(&mut self, step: &CommandStep) -> ExecutionOutcome {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let exit_code = match self.runner.run(step) {
                Ok(code) => code,
                Err(err) => {
                    warn!(step = %step.label, error = %err, "failed to launch step");
                    LAUNCH_FAILURE_EXIT
                }
            };
            debug!(step = %step.label, exit_code, attempt = attempts, "step exited");

            let status = if exit_code == 0 {
                StepStatus::Success
            } else {
                self.observer.step_failed(step, exit_code);
                match self.policy.on_failure(step, exit_code, attempts) {
                    FailureAction::Retry => {
                        self.observer.step_retrying(step);
                        continue;
                    }
                    FailureAction::Skip => StepStatus::Skipped,
                    FailureAction::Abort => StepStatus::Failed,
                }
            };

            return ExecutionOutcome {
                step: step.clone(),
                status,
                exit_code: Some(exit_code),
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                attempts,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::policy::{AlwaysAbort, AlwaysSkip, ScriptedPolicy};
    use crate::plan::{PlanContext, StepOrigin, build_plan};
    use crate::test_utils::fakes::FakeRunner;

    fn plan(commands: &[&str]) -> CommandPlan {
        let pairs: Vec<(String, String)> = commands
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("Step {}", i + 1), (*c).to_string()))
            .collect();
        CommandPlan::from_commands(&pairs, StepOrigin::Manual)
    }

    fn statuses(report: &ExecutionReport) -> Vec<StepStatus> {
        report.outcomes.iter().map(|o| o.status).collect()
    }

    #[test]
    fn empty_plan_reports_nothing() {
        let mut runner = FakeRunner::new();
        let mut policy = AlwaysAbort;
        let empty = build_plan::<String>(&[], &PlanContext::new());
        let report = ExecutionEngine::new(&mut runner, &mut policy).execute(&empty);
        assert!(report.outcomes.is_empty());
        assert!(!report.aborted);
    }

    #[test]
    fn abort_truncates_remaining_steps() {
        let mut runner = FakeRunner::new().failing("two", [1]);
        let mut policy = AlwaysAbort;
        let report = ExecutionEngine::new(&mut runner, &mut policy).execute(&plan(&["one", "two", "three"]));
        assert_eq!(statuses(&report), vec![StepStatus::Success, StepStatus::Failed]);
        assert!(report.aborted);
        assert_eq!(runner.launched(), vec!["one", "two"]);
        let err = report.abort_error().unwrap();
        assert_eq!(err.code(), "execution_failure");
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn skip_leaves_a_gap_and_continues() {
        let mut runner = FakeRunner::new().failing("two", [2]);
        let mut policy = AlwaysSkip;
        let report = ExecutionEngine::new(&mut runner, &mut policy).execute(&plan(&["one", "two", "three"]));
        assert_eq!(
            statuses(&report),
            vec![StepStatus::Success, StepStatus::Skipped, StepStatus::Success]
        );
        assert!(!report.aborted);
        assert_eq!(report.outcomes[1].exit_code, Some(2));
        let harvested: Vec<_> = report.harvestable_steps().iter().map(|s| s.command.clone()).collect();
        assert_eq!(harvested, vec!["one".to_string(), "three".to_string()]);
    }

    #[test]
    fn retry_relaunches_until_success() {
        let mut runner = FakeRunner::new().failing("flaky", [1, 1]);
        let mut policy = ScriptedPolicy::new([FailureAction::Retry, FailureAction::Retry]);
        let report = ExecutionEngine::new(&mut runner, &mut policy).execute(&plan(&["flaky", "after"]));
        assert_eq!(statuses(&report), vec![StepStatus::Success, StepStatus::Success]);
        assert_eq!(report.outcomes[0].attempts, 3);
        assert_eq!(runner.launched(), vec!["flaky", "flaky", "flaky", "after"]);
        assert_eq!(policy.asked(), 2);
    }

    #[test]
    fn dry_run_launches_nothing() {
        let mut runner = FakeRunner::new();
        let mut policy = AlwaysAbort;
        let report = ExecutionEngine::new(&mut runner, &mut policy)
            .dry_run(true)
            .execute(&plan(&["one", "two"]));
        assert_eq!(statuses(&report), vec![StepStatus::Skipped, StepStatus::Skipped]);
        assert!(runner.launched().is_empty());
        assert_eq!(report.attempted().count(), 0);
        assert!(report.harvestable_steps().is_empty());
    }

    #[test]
    fn launch_error_goes_through_policy() {
        let mut runner = FakeRunner::new().unlaunchable("missing-tool");
        let mut policy = AlwaysSkip;
        let report = ExecutionEngine::new(&mut runner, &mut policy).execute(&plan(&["missing-tool"]));
        assert_eq!(report.outcomes[0].status, StepStatus::Skipped);
        assert_eq!(report.outcomes[0].exit_code, Some(LAUNCH_FAILURE_EXIT));
    }

    #[test]
    fn summary_counts() {
        let mut runner = FakeRunner::new().failing("b", [1]);
        let mut policy = AlwaysSkip;
        let report = ExecutionEngine::new(&mut runner, &mut policy).execute(&plan(&["a", "b", "c"]));
        let summary = report.summary();
        assert_eq!((summary.succeeded, summary.skipped, summary.failed), (2, 1, 0));
        assert!(!report.has_hard_failure());
    }
}
