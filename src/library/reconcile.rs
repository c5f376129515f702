//! Bringing libraries into agreement with their remotes.
//!
//! Pull direction:
//!
//! | local copy | git metadata | remote | action                                   |
//! |------------|--------------|--------|------------------------------------------|
//! | no         | -            | yes    | clone                                    |
//! | no         | -            | no     | ask for a URL; clone, or report Missing  |
//! | yes        | no           | -      | offer init + remote                      |
//! | yes        | yes          | -      | dirty: stash/commit/abort, then pull     |
//!
//! A pull that fails for lack of upstream tracking sets the upstream to the
//! current branch and retries exactly once. Push mirrors pull: commit when
//! dirty, then push the primary branch, falling back to the secondary one.

use std::path::Path;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::VcsError;

use super::prompt::{DirtyStrategy, ReconcilePrompt};
use super::record::{LibraryRecord, LibraryStore};
use super::vcs::VersionControlClient;

/// Transient per-library snapshot driving the decision table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncState {
    pub has_local_copy: bool,
    pub has_git_metadata: bool,
    pub has_remote: bool,
    pub is_dirty: bool,
    pub pending_count: usize,
    /// `None` when there is no upstream to compare against.
    pub behind_remote: Option<usize>,
}

/// One operation issued against a library, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LibraryAction {
    Clone { url: String },
    Init,
    SetRemote { url: String },
    Fetch,
    Stash,
    Commit { message: String },
    Pull,
    SetUpstream { branch: String },
    PopStash,
    Push { branch: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    Cloned,
    /// Freshly put under version control; nothing pulled yet.
    Initialized,
    UpToDate,
    Synced,
    Pushed { branch: String },
    /// No local copy and no remote to clone from.
    Missing,
    /// Under version control but no remote to talk to.
    NoRemote,
    /// The operator declined to continue.
    Aborted,
    Failed { error: String },
}

impl RecordStatus {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Stopped short without an error: the operator declined, or there was
    /// nothing to reconcile from. Still a non-zero outcome for the batch.
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::Aborted | Self::Missing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub name: String,
    pub actions: Vec<LibraryAction>,
    pub status: RecordStatus,
    /// Problems that did not decide the status, such as a stash that could
    /// not be popped after a failed pull.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl RecordReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            actions: Vec::new(),
            status: RecordStatus::Aborted,
            notes: Vec::new(),
        }
    }

    fn finish(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    fn fail(self, err: &VcsError) -> Self {
        self.finish(RecordStatus::Failed {
            error: err.to_string(),
        })
    }
}

/// Aggregate over a batch; one report per record in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<RecordReport>,
}

impl BatchSummary {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(|r| r.status.is_failure())
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.status.is_failure()).count()
    }

    #[must_use]
    pub fn has_aborts(&self) -> bool {
        self.reports.iter().any(|r| r.status.is_incomplete())
    }

    /// Records that failed or stopped short.
    #[must_use]
    pub fn unfinished(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status.is_failure() || r.status.is_incomplete())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    One(String),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Pull,
    Push,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub primary_branch: String,
    pub secondary_branch: String,
    pub fetch_timeout: Duration,
    pub commit_message_prefix: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            primary_branch: "main".to_string(),
            secondary_branch: "master".to_string(),
            fetch_timeout: Duration::from_secs(5),
            commit_message_prefix: "Jaavis sync:".to_string(),
        }
    }
}

pub struct Reconciler<'a> {
    vcs: &'a dyn VersionControlClient,
    prompt: &'a mut dyn ReconcilePrompt,
    settings: SyncSettings,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        vcs: &'a dyn VersionControlClient,
        prompt: &'a mut dyn ReconcilePrompt,
        settings: SyncSettings,
    ) -> Self {
        Self {
            vcs,
            prompt,
            settings,
        }
    }

    /// Compute a fresh snapshot for `record`.
    pub fn sync_state(&self, record: &LibraryRecord) -> Result<SyncState, VcsError> {
        let path = record.path.as_path();
        let mut state = SyncState {
            has_local_copy: path.exists(),
            ..SyncState::default()
        };
        if !state.has_local_copy {
            state.has_remote = record.remote_url.is_some();
            return Ok(state);
        }
        state.has_git_metadata = self.vcs.has_metadata(path);
        state.has_remote = record.remote_url.is_some()
            || (state.has_git_metadata && self.vcs.remote_url(path).is_some());
        if state.has_git_metadata {
            let status = self.vcs.status(path)?;
            state.is_dirty = status.is_dirty();
            state.pending_count = status.pending;
            state.behind_remote = status.behind;
        }
        Ok(state)
    }

    /// Reconcile every selected record. Each record is independent: a
    /// failure is recorded and the next record still runs.
    pub fn reconcile_batch(
        &mut self,
        store: &mut dyn LibraryStore,
        selection: &Selection,
        direction: Direction,
        push_message: Option<&str>,
    ) -> BatchSummary {
        let names = match selection {
            Selection::One(name) => vec![name.clone()],
            Selection::All => store.names(),
        };
        let mut summary = BatchSummary::default();
        for name in names {
            let report = match direction {
                Direction::Pull => self.sync(store, &name),
                Direction::Push => self.push(store, &name, push_message),
            };
            if report.status.is_failure() {
                warn!(library = %name, status = ?report.status, "reconciliation failed");
            } else {
                info!(library = %name, status = ?report.status, "reconciled");
            }
            summary.reports.push(report);
        }
        summary
    }

    /// Pull direction for one record.
    pub fn sync(&mut self, store: &mut dyn LibraryStore, name: &str) -> RecordReport {
        let mut report = RecordReport::new(name);
        let record = match store.record(name) {
            Ok(record) => record,
            Err(err) => {
                return report.finish(RecordStatus::Failed {
                    error: err.to_string(),
                });
            }
        };
        let state = match self.sync_state(&record) {
            Ok(state) => state,
            Err(err) => return report.fail(&err),
        };
        let path = record.path.as_path();

        if !state.has_local_copy {
            return self.clone_missing(store, &record, report);
        }

        if !state.has_git_metadata {
            return match self.initialize(store, &record, &mut report) {
                Ok(true) => report.finish(RecordStatus::Initialized),
                Ok(false) => report.finish(RecordStatus::Aborted),
                Err(err) => report.fail(&err),
            };
        }

        match self.ensure_remote(store, &record, &mut report) {
            Ok(true) => {}
            Ok(false) => return report.finish(RecordStatus::NoRemote),
            Err(err) => return report.fail(&err),
        }

        report.actions.push(LibraryAction::Fetch);
        if let Err(err) = self.vcs.fetch(path, self.settings.fetch_timeout) {
            return report.fail(&err);
        }
        // Fetch moves the upstream ref, so look again.
        let status = match self.vcs.status(path) {
            Ok(status) => status,
            Err(err) => return report.fail(&err),
        };

        if !status.is_dirty() {
            if status.behind == Some(0) {
                return report.finish(RecordStatus::UpToDate);
            }
            return match self.pull_with_upstream_fix(path, &mut report) {
                Ok(()) => report.finish(RecordStatus::Synced),
                Err(err) => report.fail(&err),
            };
        }

        match self.prompt.dirty_strategy(name, status.pending) {
            DirtyStrategy::Abort => report.finish(RecordStatus::Aborted),
            DirtyStrategy::Commit => {
                if let Err(err) = self.commit_all(name, path, None, &mut report) {
                    return report.fail(&err);
                }
                match self.pull_with_upstream_fix(path, &mut report) {
                    Ok(()) => report.finish(RecordStatus::Synced),
                    Err(err) => report.fail(&err),
                }
            }
            DirtyStrategy::Stash => self.stash_and_pull(path, report),
        }
    }

    /// Push direction for one record.
    pub fn push(
        &mut self,
        store: &mut dyn LibraryStore,
        name: &str,
        message: Option<&str>,
    ) -> RecordReport {
        let report = RecordReport::new(name);
        let record = match store.record(name) {
            Ok(record) => record,
            Err(err) => {
                return report.finish(RecordStatus::Failed {
                    error: err.to_string(),
                });
            }
        };
        self.push_record(store, &record, message, report)
    }

    fn push_record(
        &mut self,
        store: &mut dyn LibraryStore,
        record: &LibraryRecord,
        message: Option<&str>,
        mut report: RecordReport,
    ) -> RecordReport {
        let path = record.path.as_path();
        if !path.exists() {
            return report.finish(RecordStatus::Missing);
        }

        if !self.vcs.has_metadata(path) {
            match self.initialize(store, record, &mut report) {
                Ok(true) => {}
                Ok(false) => return report.finish(RecordStatus::Aborted),
                Err(err) => return report.fail(&err),
            }
        } else {
            match self.ensure_remote(store, record, &mut report) {
                Ok(true) => {}
                Ok(false) => return report.finish(RecordStatus::NoRemote),
                Err(err) => return report.fail(&err),
            }
        }
        if self.vcs.remote_url(path).is_none() {
            return report.finish(RecordStatus::NoRemote);
        }

        let status = match self.vcs.status(path) {
            Ok(status) => status,
            Err(err) => return report.fail(&err),
        };
        if status.is_dirty() {
            if let Err(err) = self.commit_all(&record.name, path, message, &mut report) {
                return report.fail(&err);
            }
        }

        let primary = self.settings.primary_branch.clone();
        let secondary = self.settings.secondary_branch.clone();
        report.actions.push(LibraryAction::Push {
            branch: primary.clone(),
        });
        let first = match self.vcs.push(path, &primary) {
            Ok(()) => return report.finish(RecordStatus::Pushed { branch: primary }),
            Err(err) => err,
        };
        if primary == secondary {
            return report.fail(&first);
        }

        warn!(
            library = %record.name,
            branch = %primary,
            error = %first,
            "push rejected, trying fallback branch"
        );
        report.notes.push(first.to_string());
        report.actions.push(LibraryAction::Push {
            branch: secondary.clone(),
        });
        match self.vcs.push(path, &secondary) {
            Ok(()) => report.finish(RecordStatus::Pushed { branch: secondary }),
            Err(err) => report.fail(&err),
        }
    }

    fn clone_missing(
        &mut self,
        store: &mut dyn LibraryStore,
        record: &LibraryRecord,
        mut report: RecordReport,
    ) -> RecordReport {
        let url = match &record.remote_url {
            Some(url) => url.clone(),
            None => match self.prompt.remote_url(&record.name) {
                Some(url) => {
                    if let Err(err) = store.set_remote(&record.name, &url) {
                        report.notes.push(format!("remote not saved: {err}"));
                    }
                    url
                }
                None => return report.finish(RecordStatus::Missing),
            },
        };

        report.actions.push(LibraryAction::Clone { url: url.clone() });
        match self.vcs.clone_repo(&url, &record.path) {
            Ok(()) => report.finish(RecordStatus::Cloned),
            Err(err) => report.fail(&err),
        }
    }

    /// Offer to put the library under version control and attach a remote.
    /// `Ok(false)` when the operator declines.
    fn initialize(
        &mut self,
        store: &mut dyn LibraryStore,
        record: &LibraryRecord,
        report: &mut RecordReport,
    ) -> Result<bool, VcsError> {
        if !self.prompt.confirm_init(&record.name) {
            return Ok(false);
        }
        report.actions.push(LibraryAction::Init);
        self.vcs.init(&record.path)?;
        self.ensure_remote(store, record, report)?;
        Ok(true)
    }

    /// Make sure `origin` exists, using the stored URL or asking for one.
    /// `Ok(false)` when no remote could be found.
    fn ensure_remote(
        &mut self,
        store: &mut dyn LibraryStore,
        record: &LibraryRecord,
        report: &mut RecordReport,
    ) -> Result<bool, VcsError> {
        let path = record.path.as_path();
        let current = self.vcs.remote_url(path);

        if let Some(url) = &current {
            if record.remote_url.is_none() {
                if let Err(err) = store.set_remote(&record.name, url) {
                    report.notes.push(format!("remote not saved: {err}"));
                }
            }
            return Ok(true);
        }

        let url = match &record.remote_url {
            Some(url) => url.clone(),
            None => match self.prompt.remote_url(&record.name) {
                Some(url) => {
                    if let Err(err) = store.set_remote(&record.name, &url) {
                        report.notes.push(format!("remote not saved: {err}"));
                    }
                    url
                }
                None => return Ok(false),
            },
        };
        report.actions.push(LibraryAction::SetRemote { url: url.clone() });
        self.vcs.set_remote(path, &url)?;
        Ok(true)
    }

    fn commit_all(
        &mut self,
        name: &str,
        path: &Path,
        message: Option<&str>,
        report: &mut RecordReport,
    ) -> Result<(), VcsError> {
        let message = match message {
            Some(message) => message.to_string(),
            None => {
                let default = format!(
                    "{} {}",
                    self.settings.commit_message_prefix,
                    Local::now().format("%Y-%m-%d %H:%M")
                );
                self.prompt.commit_message(name, &default)
            }
        };
        self.vcs.add_all(path)?;
        report.actions.push(LibraryAction::Commit {
            message: message.clone(),
        });
        self.vcs.commit(path, &message)
    }

    /// Stash, pull, pop. The pop is attempted even when the pull fails so
    /// stashed work is never left behind silently.
    fn stash_and_pull(&mut self, path: &Path, mut report: RecordReport) -> RecordReport {
        report.actions.push(LibraryAction::Stash);
        if let Err(err) = self.vcs.stash_push(path) {
            return report.fail(&err);
        }

        let pulled = self.pull_with_upstream_fix(path, &mut report);

        report.actions.push(LibraryAction::PopStash);
        let popped = self.vcs.stash_pop(path);

        match (pulled, popped) {
            (Ok(()), Ok(())) => report.finish(RecordStatus::Synced),
            (Err(pull_err), Ok(())) => report.fail(&pull_err),
            (Ok(()), Err(pop_err)) => {
                report
                    .notes
                    .push("stashed changes are still in `git stash list`".to_string());
                report.fail(&pop_err)
            }
            (Err(pull_err), Err(pop_err)) => {
                report.notes.push(pop_err.to_string());
                report
                    .notes
                    .push("stashed changes are still in `git stash list`".to_string());
                report.fail(&pull_err)
            }
        }
    }

    /// Pull; on a missing upstream set it to the current branch and retry once.
    fn pull_with_upstream_fix(
        &mut self,
        path: &Path,
        report: &mut RecordReport,
    ) -> Result<(), VcsError> {
        report.actions.push(LibraryAction::Pull);
        let err = match self.vcs.pull_rebase(path) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        if !err.is_no_upstream() {
            return Err(err);
        }

        let branch = self.vcs.current_branch(path)?;
        report.actions.push(LibraryAction::SetUpstream {
            branch: branch.clone(),
        });
        self.vcs.set_upstream(path, &branch)?;
        report.actions.push(LibraryAction::Pull);
        self.vcs.pull_rebase(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VcsErrorKind;
    use crate::library::prompt::AutoPrompt;
    use crate::test_utils::fakes::{FakeVcs, MemoryStore};
    use crate::test_utils::fixtures::UnitTestFixture;

    fn settings() -> SyncSettings {
        SyncSettings::default()
    }

    fn store_with(record: LibraryRecord) -> MemoryStore {
        let mut store = MemoryStore::default();
        store.insert(record);
        store
    }

    fn pull_actions(report: &RecordReport) -> Vec<&LibraryAction> {
        report
            .actions
            .iter()
            .filter(|a| matches!(a, LibraryAction::Pull | LibraryAction::Push { .. }))
            .collect()
    }

    #[test]
    fn missing_copy_with_remote_clones_once() {
        let fixture = UnitTestFixture::new();
        let record = LibraryRecord::new("programmer", fixture.path("library"))
            .with_remote("https://example.com/lib.git");
        let mut store = store_with(record);
        let vcs = FakeVcs::new();
        let mut prompt = AutoPrompt::default();

        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");

        assert_eq!(report.status, RecordStatus::Cloned);
        assert_eq!(vcs.calls(), vec!["clone https://example.com/lib.git".to_string()]);
        assert!(pull_actions(&report).is_empty());
    }

    #[test]
    fn missing_copy_without_remote_asks_then_reports_missing() {
        let fixture = UnitTestFixture::new();
        let mut store = store_with(LibraryRecord::new("contractor", fixture.path("gone")));
        let vcs = FakeVcs::new();
        let mut prompt = AutoPrompt::default();

        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "contractor");
        assert_eq!(report.status, RecordStatus::Missing);
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn prompted_remote_is_saved_and_cloned() {
        let fixture = UnitTestFixture::new();
        let mut store = store_with(LibraryRecord::new("contractor", fixture.path("gone")));
        let vcs = FakeVcs::new();
        let mut prompt = AutoPrompt {
            remote_url: Some("git@example.com:me/lib.git".to_string()),
            ..AutoPrompt::default()
        };

        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "contractor");
        assert_eq!(report.status, RecordStatus::Cloned);
        assert_eq!(
            store.record("contractor").unwrap().remote_url.as_deref(),
            Some("git@example.com:me/lib.git")
        );
    }

    #[test]
    fn unversioned_library_is_initialized_when_confirmed() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file("library/skills/ui/card.md", "# Card");
        let record = LibraryRecord::new("programmer", fixture.path("library"))
            .with_remote("https://example.com/lib.git");
        let mut store = store_with(record);
        let vcs = FakeVcs::new();
        let mut prompt = AutoPrompt {
            init: true,
            ..AutoPrompt::default()
        };

        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert_eq!(report.status, RecordStatus::Initialized);
        assert_eq!(
            vcs.calls(),
            vec!["init".to_string(), "set_remote https://example.com/lib.git".to_string()]
        );
    }

    #[test]
    fn unversioned_library_declined_is_aborted() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file("library/a.md", "a");
        let mut store = store_with(LibraryRecord::new("programmer", fixture.path("library")));
        let vcs = FakeVcs::new();
        let mut prompt = AutoPrompt::default();
        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert_eq!(report.status, RecordStatus::Aborted);
        assert!(!report.status.is_failure());
        assert!(vcs.calls().is_empty());
    }

    fn tracked(fixture: &UnitTestFixture) -> (MemoryStore, FakeVcs) {
        let _ = fixture.create_file("library/skills/ui/card.md", "# Card");
        let record = LibraryRecord::new("programmer", fixture.path("library"))
            .with_remote("https://example.com/lib.git");
        let vcs = FakeVcs::new().tracked("https://example.com/lib.git");
        (store_with(record), vcs)
    }

    #[test]
    fn dirty_stash_runs_stash_pull_pop_in_order() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let vcs = vcs.dirty(2).behind(1);
        let mut prompt = AutoPrompt::default();

        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert_eq!(report.status, RecordStatus::Synced);
        assert_eq!(vcs.calls(), vec!["fetch", "stash_push", "pull", "stash_pop"]);
    }

    #[test]
    fn stash_is_popped_even_when_pull_fails() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let vcs = vcs
            .dirty(1)
            .fail_pull(VcsError::new("pull", VcsErrorKind::Other, "conflict"));
        let mut prompt = AutoPrompt::default();

        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert!(report.status.is_failure());
        assert_eq!(vcs.calls(), vec!["fetch", "stash_push", "pull", "stash_pop"]);
    }

    #[test]
    fn dirty_abort_leaves_library_untouched() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let vcs = vcs.dirty(1);
        let mut prompt = AutoPrompt {
            strategy: DirtyStrategy::Abort,
            ..AutoPrompt::default()
        };
        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert_eq!(report.status, RecordStatus::Aborted);
        assert_eq!(vcs.calls(), vec!["fetch"]);
    }

    #[test]
    fn dirty_commit_commits_before_pulling() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let vcs = vcs.dirty(1);
        let mut prompt = AutoPrompt {
            strategy: DirtyStrategy::Commit,
            commit_message: Some("wip".to_string()),
            ..AutoPrompt::default()
        };
        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert_eq!(report.status, RecordStatus::Synced);
        assert_eq!(vcs.calls(), vec!["fetch", "add_all", "commit wip", "pull"]);
    }

    #[test]
    fn clean_and_current_is_up_to_date() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let vcs = vcs.behind(0);
        let mut prompt = AutoPrompt::default();
        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert_eq!(report.status, RecordStatus::UpToDate);
        assert_eq!(vcs.calls(), vec!["fetch"]);
    }

    #[test]
    fn missing_upstream_is_fixed_and_retried_once() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let no_upstream = VcsError::new("pull", VcsErrorKind::NoUpstream, "no tracking information");
        let vcs = vcs.fail_pull(no_upstream.clone()).fail_pull(no_upstream);
        let mut prompt = AutoPrompt::default();

        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "programmer");
        assert!(report.status.is_failure());
        assert_eq!(
            vcs.calls(),
            vec!["fetch", "pull", "set_upstream main", "pull"]
        );
    }

    #[test]
    fn push_commits_and_falls_back_to_secondary_branch() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let vcs = vcs
            .dirty(3)
            .fail_push("main", VcsError::new("push", VcsErrorKind::Rejected, "src refspec main does not match any"));
        let mut prompt = AutoPrompt::default();

        let report = Reconciler::new(&vcs, &mut prompt, settings()).push(&mut store, "programmer", Some("update skills"));
        assert_eq!(
            report.status,
            RecordStatus::Pushed {
                branch: "master".to_string()
            }
        );
        assert_eq!(
            vcs.calls(),
            vec!["add_all", "commit update skills", "push main", "push master"]
        );
    }

    #[test]
    fn push_default_message_is_timestamped() {
        let fixture = UnitTestFixture::new();
        let (mut store, vcs) = tracked(&fixture);
        let vcs = vcs.dirty(1);
        let mut prompt = AutoPrompt::default();
        let report = Reconciler::new(&vcs, &mut prompt, settings()).push(&mut store, "programmer", None);
        let message = report
            .actions
            .iter()
            .find_map(|a| match a {
                LibraryAction::Commit { message } => Some(message.clone()),
                _ => None,
            })
            .unwrap();
        assert!(message.starts_with("Jaavis sync: "));
    }

    #[test]
    fn locked_library_still_syncs() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file("library/a.md", "a");
        let mut record = LibraryRecord::new("librarian", fixture.path("library"))
            .with_remote("https://example.com/lib.git");
        record.locked = true;
        let mut store = store_with(record);
        let vcs = FakeVcs::new().tracked("https://example.com/lib.git");
        let mut prompt = AutoPrompt::default();
        let report = Reconciler::new(&vcs, &mut prompt, settings()).push(&mut store, "librarian", Some("m"));
        assert!(matches!(report.status, RecordStatus::Pushed { .. }));
    }

    #[test]
    fn batch_isolates_failures() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file("a/x.md", "x");
        let mut store = MemoryStore::default();
        store.insert(LibraryRecord::new("alpha", fixture.path("a")).with_remote("https://example.com/a.git"));
        store.insert(LibraryRecord::new("beta", fixture.path("missing")).with_remote("https://example.com/b.git"));
        let vcs = FakeVcs::new()
            .tracked("https://example.com/a.git")
            .fail_fetch(VcsError::new("fetch", VcsErrorKind::Timeout, "timed out after 5s"));
        let mut prompt = AutoPrompt::default();

        let summary = Reconciler::new(&vcs, &mut prompt, settings()).reconcile_batch(
            &mut store,
            &Selection::All,
            Direction::Pull,
            None,
        );
        assert_eq!(summary.reports.len(), 2);
        assert!(summary.reports[0].status.is_failure());
        assert_eq!(summary.reports[1].status, RecordStatus::Cloned);
        assert!(summary.has_failures());
        assert_eq!(summary.failed(), 1);
        assert!(!summary.has_aborts());
    }

    #[test]
    fn declined_and_missing_records_count_as_unfinished() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file("plain/x.md", "x");
        let mut store = MemoryStore::default();
        store.insert(LibraryRecord::new("alpha", fixture.path("plain")));
        store.insert(LibraryRecord::new("beta", fixture.path("gone")));
        let vcs = FakeVcs::new();
        let mut prompt = AutoPrompt::default();

        let summary = Reconciler::new(&vcs, &mut prompt, settings()).reconcile_batch(
            &mut store,
            &Selection::All,
            Direction::Pull,
            None,
        );
        assert_eq!(summary.reports[0].status, RecordStatus::Aborted);
        assert_eq!(summary.reports[1].status, RecordStatus::Missing);
        assert!(!summary.has_failures());
        assert!(summary.has_aborts());
        assert_eq!(summary.unfinished(), 2);
    }

    #[test]
    fn unknown_record_fails_without_touching_git() {
        let mut store = MemoryStore::default();
        let vcs = FakeVcs::new();
        let mut prompt = AutoPrompt::default();
        let report = Reconciler::new(&vcs, &mut prompt, settings()).sync(&mut store, "ghost");
        assert!(report.status.is_failure());
        assert!(vcs.calls().is_empty());
    }
}
