//! What to do when a step exits non-zero.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::error::JaavisError;
use crate::plan::CommandStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// Launch the same step again.
    Retry,
    /// Record the step as skipped and move on.
    Skip,
    /// Record the step as failed and stop the run.
    Abort,
}

impl FromStr for FailureAction {
    type Err = JaavisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "retry" | "reset" => Ok(Self::Retry),
            "s" | "skip" => Ok(Self::Skip),
            "a" | "abort" => Ok(Self::Abort),
            other => Err(JaavisError::Parse(format!("unknown failure action {other:?}"))),
        }
    }
}

pub trait FailurePolicy {
    /// Decide after `attempt` (1-based) of `step` exited with `exit_code`.
    fn on_failure(&mut self, step: &CommandStep, exit_code: i32, attempt: u32) -> FailureAction;
}

/// Stop at the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAbort;

impl FailurePolicy for AlwaysAbort {
    fn on_failure(&mut self, _step: &CommandStep, _exit_code: i32, _attempt: u32) -> FailureAction {
        FailureAction::Abort
    }
}

/// Skip every failing step.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSkip;

impl FailurePolicy for AlwaysSkip {
    fn on_failure(&mut self, _step: &CommandStep, _exit_code: i32, _attempt: u32) -> FailureAction {
        FailureAction::Skip
    }
}

/// Answers from a queue; aborts once the queue is empty.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPolicy {
    answers: VecDeque<FailureAction>,
    asked: u32,
}

impl ScriptedPolicy {
    pub fn new(answers: impl IntoIterator<Item = FailureAction>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// Number of decisions requested so far.
    #[must_use]
    pub const fn asked(&self) -> u32 {
        self.asked
    }
}

impl FailurePolicy for ScriptedPolicy {
    fn on_failure(&mut self, _step: &CommandStep, _exit_code: i32, _attempt: u32) -> FailureAction {
        self.asked += 1;
        self.answers.pop_front().unwrap_or(FailureAction::Abort)
    }
}

/// Asks the operator. Empty input, unreadable input and EOF all mean Abort.
pub struct InteractivePolicy<R> {
    input: R,
}

impl InteractivePolicy<io::StdinLock<'static>> {
    #[must_use]
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> InteractivePolicy<R> {
    pub const fn new(input: R) -> Self {
        Self { input }
    }

    fn ask(&mut self) -> FailureAction {
        loop {
            eprint!(
                "{} What to do? [r]etry / [s]kip / [a]bort (default: abort): ",
                "Error!".red().bold()
            );
            let _ = io::stderr().flush();
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return FailureAction::Abort,
                Ok(_) => {}
            }
            if line.trim().is_empty() {
                return FailureAction::Abort;
            }
            match line.parse() {
                Ok(action) => return action,
                Err(_) => eprintln!("{}", "Please answer r, s or a.".yellow()),
            }
        }
    }
}

impl<R: BufRead> FailurePolicy for InteractivePolicy<R> {
    fn on_failure(&mut self, _step: &CommandStep, _exit_code: i32, _attempt: u32) -> FailureAction {
        self.ask()
    }
}
