//! In-memory implementations of the core ports.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::deploy::EnvironmentProbe;
use crate::error::{JaavisError, Result, VcsError};
use crate::exec::StepRunner;
use crate::library::{LibraryRecord, LibraryStore, RepoStatus, VersionControlClient};
use crate::plan::CommandStep;

/// Step runner that records commands instead of launching them.
/// Commands succeed unless queued exit codes say otherwise.
#[derive(Debug, Default)]
pub struct FakeRunner {
    exit_codes: HashMap<String, VecDeque<i32>>,
    unlaunchable: HashSet<String>,
    launched: Vec<String>,
}

impl FakeRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with each of `codes` in turn before succeeding.
    #[must_use]
    pub fn failing(mut self, command: &str, codes: impl IntoIterator<Item = i32>) -> Self {
        self.exit_codes
            .entry(command.to_string())
            .or_default()
            .extend(codes);
        self
    }

    #[must_use]
    pub fn unlaunchable(mut self, command: &str) -> Self {
        self.unlaunchable.insert(command.to_string());
        self
    }

    #[must_use]
    pub fn launched(&self) -> Vec<String> {
        self.launched.clone()
    }
}

impl StepRunner for FakeRunner {
    fn run(&mut self, step: &CommandStep) -> io::Result<i32> {
        if self.unlaunchable.contains(&step.command) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: command not found", step.command),
            ));
        }
        self.launched.push(step.command.clone());
        Ok(self
            .exit_codes
            .get_mut(&step.command)
            .and_then(VecDeque::pop_front)
            .unwrap_or(0))
    }
}

/// Version control double with a log of every mutating call.
#[derive(Debug, Default)]
pub struct FakeVcs {
    metadata: Cell<bool>,
    remote: RefCell<Option<String>>,
    pending: usize,
    behind: Option<usize>,
    pull_failures: RefCell<VecDeque<VcsError>>,
    push_failures: HashMap<String, VcsError>,
    fetch_failure: Option<VcsError>,
    log: RefCell<Vec<String>>,
}

impl FakeVcs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every path is a repository with `url` as origin.
    #[must_use]
    pub fn tracked(self, url: &str) -> Self {
        self.metadata.set(true);
        *self.remote.borrow_mut() = Some(url.to_string());
        self
    }

    #[must_use]
    pub const fn dirty(mut self, pending: usize) -> Self {
        self.pending = pending;
        self
    }

    #[must_use]
    pub const fn behind(mut self, commits: usize) -> Self {
        self.behind = Some(commits);
        self
    }

    /// Fail the next pull with `err`. Calls queue up.
    #[must_use]
    pub fn fail_pull(self, err: VcsError) -> Self {
        self.pull_failures.borrow_mut().push_back(err);
        self
    }

    #[must_use]
    pub fn fail_push(mut self, branch: &str, err: VcsError) -> Self {
        self.push_failures.insert(branch.to_string(), err);
        self
    }

    #[must_use]
    pub fn fail_fetch(mut self, err: VcsError) -> Self {
        self.fetch_failure = Some(err);
        self
    }

    /// Mutating calls in order, e.g. `"commit wip"` or `"push main"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }
}

impl VersionControlClient for FakeVcs {
    fn has_metadata(&self, _path: &Path) -> bool {
        self.metadata.get()
    }

    fn init(&self, _path: &Path) -> std::result::Result<(), VcsError> {
        self.record("init");
        self.metadata.set(true);
        Ok(())
    }

    fn clone_repo(&self, url: &str, _path: &Path) -> std::result::Result<(), VcsError> {
        self.record(format!("clone {url}"));
        Ok(())
    }

    fn remote_url(&self, _path: &Path) -> Option<String> {
        if self.metadata.get() {
            self.remote.borrow().clone()
        } else {
            None
        }
    }

    fn set_remote(&self, _path: &Path, url: &str) -> std::result::Result<(), VcsError> {
        self.record(format!("set_remote {url}"));
        *self.remote.borrow_mut() = Some(url.to_string());
        Ok(())
    }

    fn fetch(&self, _path: &Path, _timeout: Duration) -> std::result::Result<(), VcsError> {
        self.record("fetch");
        self.fetch_failure.clone().map_or(Ok(()), Err)
    }

    fn status(&self, _path: &Path) -> std::result::Result<RepoStatus, VcsError> {
        Ok(RepoStatus {
            pending: self.pending,
            behind: self.behind,
        })
    }

    fn stash_push(&self, _path: &Path) -> std::result::Result<(), VcsError> {
        self.record("stash_push");
        Ok(())
    }

    fn stash_pop(&self, _path: &Path) -> std::result::Result<(), VcsError> {
        self.record("stash_pop");
        Ok(())
    }

    fn add_all(&self, _path: &Path) -> std::result::Result<(), VcsError> {
        self.record("add_all");
        Ok(())
    }

    fn commit(&self, _path: &Path, message: &str) -> std::result::Result<(), VcsError> {
        self.record(format!("commit {message}"));
        Ok(())
    }

    fn pull_rebase(&self, _path: &Path) -> std::result::Result<(), VcsError> {
        self.record("pull");
        self.pull_failures.borrow_mut().pop_front().map_or(Ok(()), Err)
    }

    fn current_branch(&self, _path: &Path) -> std::result::Result<String, VcsError> {
        Ok("main".to_string())
    }

    fn set_upstream(&self, _path: &Path, branch: &str) -> std::result::Result<(), VcsError> {
        self.record(format!("set_upstream {branch}"));
        Ok(())
    }

    fn push(&self, _path: &Path, branch: &str) -> std::result::Result<(), VcsError> {
        self.record(format!("push {branch}"));
        self.push_failures.get(branch).cloned().map_or(Ok(()), Err)
    }
}

/// Library records kept in a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, LibraryRecord>,
}

impl MemoryStore {
    pub fn insert(&mut self, record: LibraryRecord) {
        self.records.insert(record.name.clone(), record);
    }
}

impl LibraryStore for MemoryStore {
    fn record(&self, name: &str) -> Result<LibraryRecord> {
        self.records
            .get(name)
            .cloned()
            .ok_or_else(|| JaavisError::NotFound(format!("library '{name}'")))
    }

    fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    fn set_remote(&mut self, name: &str, url: &str) -> Result<()> {
        let record = self
            .records
            .get_mut(name)
            .ok_or_else(|| JaavisError::NotFound(format!("library '{name}'")))?;
        record.remote_url = Some(url.to_string());
        Ok(())
    }
}

/// Scripted machine: a set of tools, project files and cluster reachability.
#[derive(Debug, Clone, Default)]
pub struct FakeProbe {
    tools: HashSet<String>,
    files: HashSet<String>,
    cluster: bool,
}

impl FakeProbe {
    /// Everything a grade A deploy needs, with an npm lockfile.
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            tools: ["npm", "docker", "kubectl", "git", "node"]
                .into_iter()
                .map(String::from)
                .collect(),
            files: ["package.json", "package-lock.json", "supabase/config.toml"]
                .into_iter()
                .map(String::from)
                .collect(),
            cluster: true,
        }
    }

    #[must_use]
    pub fn with_file(mut self, relative: &str) -> Self {
        self.files.insert(relative.to_string());
        self
    }

    #[must_use]
    pub fn without_file(mut self, relative: &str) -> Self {
        self.files.remove(relative);
        self
    }

    #[must_use]
    pub fn with_tool(mut self, name: &str) -> Self {
        self.tools.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn without_tool(mut self, name: &str) -> Self {
        self.tools.remove(name);
        self
    }

    #[must_use]
    pub const fn with_cluster(mut self, reachable: bool) -> Self {
        self.cluster = reachable;
        self
    }
}

impl EnvironmentProbe for FakeProbe {
    fn has_tool(&self, name: &str) -> bool {
        self.tools.contains(name)
    }

    fn cluster_reachable(&self) -> bool {
        self.cluster
    }

    fn file_exists(&self, relative: &str) -> bool {
        self.files.contains(relative)
    }
}
