//! Display boundary for a run.

use colored::Colorize;

use crate::plan::CommandStep;

use super::report::{ExecutionOutcome, ExecutionReport, StepStatus};

/// Receives progress events. Every method defaults to doing nothing.
pub trait ExecutionObserver {
    fn plan_started(&mut self, _total: usize) {}
    fn step_started(&mut self, _index: usize, _total: usize, _step: &CommandStep) {}
    fn step_failed(&mut self, _step: &CommandStep, _exit_code: i32) {}
    fn step_retrying(&mut self, _step: &CommandStep) {}
    fn step_finished(&mut self, _outcome: &ExecutionOutcome, _dry_run: bool) {}
    fn run_finished(&mut self, _report: &ExecutionReport) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Human progress on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl ExecutionObserver for ConsoleObserver {
    fn plan_started(&mut self, total: usize) {
        eprintln!("{}", format!("Prepared {total} commands to execute").blue().bold());
    }

    fn step_started(&mut self, index: usize, total: usize, step: &CommandStep) {
        eprintln!(
            "\n{} {}",
            format!("Step {}/{total}:", index + 1).yellow().bold(),
            step.command.green()
        );
    }

    fn step_failed(&mut self, _step: &CommandStep, exit_code: i32) {
        eprintln!("{}", format!("Failed (exit code {exit_code})").red().bold());
    }

    fn step_retrying(&mut self, _step: &CommandStep) {
        eprintln!("{}", "Retrying...".yellow());
    }

    fn step_finished(&mut self, outcome: &ExecutionOutcome, dry_run: bool) {
        match outcome.status {
            StepStatus::Success => eprintln!("  {}", "Success".green()),
            StepStatus::Skipped if dry_run => eprintln!("  {}", "(dry run: skipped)".dimmed()),
            StepStatus::Skipped => eprintln!("  {}", "Skipping step...".yellow()),
            StepStatus::Failed => eprintln!("{}", "Aborted by operator.".red().bold()),
        }
    }

    fn run_finished(&mut self, report: &ExecutionReport) {
        let summary = report.summary();
        let line = format!(
            "{} succeeded, {} skipped, {} failed",
            summary.succeeded, summary.skipped, summary.failed
        );
        if report.aborted {
            eprintln!("\n{} {line}", "Run aborted:".red().bold());
        } else {
            eprintln!("\n{} {line}", "Run complete:".green().bold());
        }
    }
}
