//! Version-control port.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::error::VcsError;

pub const DEFAULT_REMOTE: &str = "origin";

/// Working tree snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    /// Number of changed, staged or untracked paths.
    pub pending: usize,
    /// Commits the upstream has that we do not. `None` without an upstream.
    pub behind: Option<usize>,
}

impl RepoStatus {
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.pending > 0
    }
}

/// Every git operation the reconciler needs. Errors carry the raw tool
/// message so it can be shown to the operator unchanged.
pub trait VersionControlClient {
    fn has_metadata(&self, path: &Path) -> bool;
    fn init(&self, path: &Path) -> Result<(), VcsError>;
    fn clone_repo(&self, url: &str, path: &Path) -> Result<(), VcsError>;
    fn remote_url(&self, path: &Path) -> Option<String>;
    /// Point `origin` at `url`, adding it when absent.
    fn set_remote(&self, path: &Path, url: &str) -> Result<(), VcsError>;
    fn fetch(&self, path: &Path, timeout: Duration) -> Result<(), VcsError>;
    fn status(&self, path: &Path) -> Result<RepoStatus, VcsError>;
    fn stash_push(&self, path: &Path) -> Result<(), VcsError>;
    fn stash_pop(&self, path: &Path) -> Result<(), VcsError>;
    fn add_all(&self, path: &Path) -> Result<(), VcsError>;
    fn commit(&self, path: &Path, message: &str) -> Result<(), VcsError>;
    /// Pull the upstream of the current branch with rebase.
    fn pull_rebase(&self, path: &Path) -> Result<(), VcsError>;
    fn current_branch(&self, path: &Path) -> Result<String, VcsError>;
    fn set_upstream(&self, path: &Path, branch: &str) -> Result<(), VcsError>;
    /// Push `branch` to `origin` and record it as upstream.
    fn push(&self, path: &Path, branch: &str) -> Result<(), VcsError>;
}
