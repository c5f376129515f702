//! Operator decisions during reconciliation.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// How to deal with uncommitted work before pulling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyStrategy {
    /// Stash, pull, then pop the stash.
    Stash,
    /// Commit everything, then pull.
    Commit,
    /// Leave the library alone.
    Abort,
}

pub trait ReconcilePrompt {
    /// A remote URL for `library`; `None` when the operator declines.
    fn remote_url(&mut self, library: &str) -> Option<String>;
    /// Whether to put an unversioned library under version control.
    fn confirm_init(&mut self, library: &str) -> bool;
    fn dirty_strategy(&mut self, library: &str, pending: usize) -> DirtyStrategy;
    /// Commit message, defaulting to `default`.
    fn commit_message(&mut self, library: &str, default: &str) -> String;
}

/// Fixed answers, for `--yes`, robot mode and tests.
#[derive(Debug, Clone)]
pub struct AutoPrompt {
    pub remote_url: Option<String>,
    pub init: bool,
    pub strategy: DirtyStrategy,
    pub commit_message: Option<String>,
}

impl Default for AutoPrompt {
    fn default() -> Self {
        Self {
            remote_url: None,
            init: false,
            strategy: DirtyStrategy::Stash,
            commit_message: None,
        }
    }
}

impl ReconcilePrompt for AutoPrompt {
    fn remote_url(&mut self, _library: &str) -> Option<String> {
        self.remote_url.clone()
    }

    fn confirm_init(&mut self, _library: &str) -> bool {
        self.init
    }

    fn dirty_strategy(&mut self, _library: &str, _pending: usize) -> DirtyStrategy {
        self.strategy
    }

    fn commit_message(&mut self, _library: &str, default: &str) -> String {
        self.commit_message.clone().unwrap_or_else(|| default.to_string())
    }
}

/// Line-based prompts on stderr. EOF and read errors take the safe answer.
pub struct InteractivePrompt<R> {
    input: R,
}

impl InteractivePrompt<io::StdinLock<'static>> {
    #[must_use]
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> InteractivePrompt<R> {
    pub const fn new(input: R) -> Self {
        Self { input }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        eprint!("{} ", question.cyan());
        let _ = io::stderr().flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead> ReconcilePrompt for InteractivePrompt<R> {
    fn remote_url(&mut self, library: &str) -> Option<String> {
        self.ask(&format!("? Remote Git URL for '{library}' (empty to skip):"))
            .filter(|url| !url.is_empty())
    }

    fn confirm_init(&mut self, library: &str) -> bool {
        eprintln!(
            "{}",
            format!("Library '{library}' is not under version control.").yellow()
        );
        self.ask("? Initialize it and link a remote? (y/N):")
            .is_some_and(|answer| answer.eq_ignore_ascii_case("y"))
    }

    fn dirty_strategy(&mut self, library: &str, pending: usize) -> DirtyStrategy {
        eprintln!(
            "{}",
            format!("Library '{library}' has {pending} uncommitted change(s).").yellow()
        );
        loop {
            let question = "? [s]tash and sync / [c]ommit then sync / [a]bort (default: abort):";
            let Some(answer) = self.ask(question) else {
                return DirtyStrategy::Abort;
            };
            match answer.to_ascii_lowercase().as_str() {
                "s" | "stash" => return DirtyStrategy::Stash,
                "c" | "commit" => return DirtyStrategy::Commit,
                "" | "a" | "abort" => return DirtyStrategy::Abort,
                _ => eprintln!("{}", "Please answer s, c or a.".yellow()),
            }
        }
    }

    fn commit_message(&mut self, _library: &str, default: &str) -> String {
        self.ask(&format!("? Commit message [{default}]:"))
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn interactive_answers() {
        let mut prompt = InteractivePrompt::new(Cursor::new(
            "https://example.com/lib.git\ny\nwhat\nc\n\n",
        ));
        assert_eq!(
            prompt.remote_url("programmer").as_deref(),
            Some("https://example.com/lib.git")
        );
        assert!(prompt.confirm_init("programmer"));
        assert_eq!(prompt.dirty_strategy("programmer", 2), DirtyStrategy::Commit);
        assert_eq!(prompt.commit_message("programmer", "default msg"), "default msg");
    }

    #[test]
    fn eof_takes_the_safe_answer() {
        let mut prompt = InteractivePrompt::new(Cursor::new(""));
        assert!(prompt.remote_url("x").is_none());
        assert!(!prompt.confirm_init("x"));
        assert_eq!(prompt.dirty_strategy("x", 1), DirtyStrategy::Abort);
    }

    #[test]
    fn auto_prompt_uses_defaults() {
        let mut prompt = AutoPrompt::default();
        assert_eq!(prompt.commit_message("x", "sync"), "sync");
        assert_eq!(prompt.dirty_strategy("x", 3), DirtyStrategy::Stash);
        assert!(!prompt.confirm_init("x"));
    }
}
