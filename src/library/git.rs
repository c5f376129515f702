//! Git implementation of the version-control port.
//!
//! Local inspection goes through libgit2. Anything that touches the network
//! or rewrites the working tree shells out to `git` so credential helpers,
//! hooks and user config behave exactly as on the command line.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use git2::{BranchType, Repository, StatusOptions};
use tracing::{debug, trace};

use crate::error::{VcsError, VcsErrorKind};
use crate::process::run_captured;

use super::vcs::{DEFAULT_REMOTE, RepoStatus, VersionControlClient};

#[derive(Debug, Clone, Copy, Default)]
pub struct GitClient;

impl GitClient {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open(path: &Path, operation: &str) -> Result<Repository, VcsError> {
        Repository::open(path).map_err(|err| libgit_error(operation, &err))
    }

    fn run(&self, path: Option<&Path>, operation: &str, args: &[&str]) -> Result<String, VcsError> {
        self.run_with(path, operation, args, None)
    }

    fn run_with(
        &self,
        path: Option<&Path>,
        operation: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<String, VcsError> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(path) = path {
            cmd.current_dir(path);
        }
        if timeout.is_some() {
            // A credential prompt would otherwise sit until the deadline.
            cmd.env("GIT_TERMINAL_PROMPT", "0");
        }
        trace!(?args, "git");

        let output = run_captured(&mut cmd, timeout)
            .map_err(|err| VcsError::new(operation, VcsErrorKind::Other, err.to_string()))?
            .ok_or_else(|| {
                VcsError::new(
                    operation,
                    VcsErrorKind::Timeout,
                    format!("timed out after {}s", timeout.unwrap_or_default().as_secs()),
                )
            })?;

        if output.success() {
            Ok(output.stdout)
        } else {
            let message = if output.stderr.trim().is_empty() {
                output.stdout
            } else {
                output.stderr
            };
            debug!(operation, message = %message.trim(), "git failed");
            Err(VcsError::from_output(operation, &message))
        }
    }
}

fn libgit_error(operation: &str, err: &git2::Error) -> VcsError {
    VcsError::new(operation, VcsErrorKind::Other, err.message())
}

impl VersionControlClient for GitClient {
    fn has_metadata(&self, path: &Path) -> bool {
        Repository::open(path).is_ok()
    }

    fn init(&self, path: &Path) -> Result<(), VcsError> {
        Repository::init(path)
            .map(|_| ())
            .map_err(|err| libgit_error("init", &err))
    }

    fn clone_repo(&self, url: &str, path: &Path) -> Result<(), VcsError> {
        let target = path.to_string_lossy().into_owned();
        self.run(None, "clone", &["clone", url, target.as_str()])
            .map(|_| ())
    }

    fn remote_url(&self, path: &Path) -> Option<String> {
        let repo = Repository::open(path).ok()?;
        let remote = repo.find_remote(DEFAULT_REMOTE).ok()?;
        remote.url().map(String::from)
    }

    fn set_remote(&self, path: &Path, url: &str) -> Result<(), VcsError> {
        let repo = Self::open(path, "remote")?;
        let result = if repo.find_remote(DEFAULT_REMOTE).is_ok() {
            repo.remote_set_url(DEFAULT_REMOTE, url)
        } else {
            repo.remote(DEFAULT_REMOTE, url).map(|_| ())
        };
        result.map_err(|err| libgit_error("remote", &err))
    }

    fn fetch(&self, path: &Path, timeout: Duration) -> Result<(), VcsError> {
        self.run_with(Some(path), "fetch", &["fetch", DEFAULT_REMOTE], Some(timeout))
            .map(|_| ())
    }

    fn status(&self, path: &Path) -> Result<RepoStatus, VcsError> {
        let repo = Self::open(path, "status")?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);
        let pending = repo
            .statuses(Some(&mut opts))
            .map_err(|err| libgit_error("status", &err))?
            .len();

        let behind = upstream_behind(&repo);
        Ok(RepoStatus { pending, behind })
    }

    fn stash_push(&self, path: &Path) -> Result<(), VcsError> {
        self.run(
            Some(path),
            "stash",
            &["stash", "push", "--include-untracked", "-m", "jaavis: auto-stash before sync"],
        )
        .map(|_| ())
    }

    fn stash_pop(&self, path: &Path) -> Result<(), VcsError> {
        self.run(Some(path), "stash pop", &["stash", "pop"]).map(|_| ())
    }

    fn add_all(&self, path: &Path) -> Result<(), VcsError> {
        self.run(Some(path), "add", &["add", "-A"]).map(|_| ())
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), VcsError> {
        self.run(Some(path), "commit", &["commit", "-m", message]).map(|_| ())
    }

    fn pull_rebase(&self, path: &Path) -> Result<(), VcsError> {
        self.run(Some(path), "pull", &["pull", "--rebase"]).map(|_| ())
    }

    fn current_branch(&self, path: &Path) -> Result<String, VcsError> {
        let repo = Self::open(path, "branch")?;
        let head = repo.head().map_err(|err| libgit_error("branch", &err))?;
        head.shorthand()
            .map(String::from)
            .ok_or_else(|| VcsError::new("branch", VcsErrorKind::Other, "HEAD is not a branch"))
    }

    fn set_upstream(&self, path: &Path, branch: &str) -> Result<(), VcsError> {
        let upstream = format!("--set-upstream-to={DEFAULT_REMOTE}/{branch}");
        self.run(Some(path), "branch", &["branch", upstream.as_str(), branch])
            .map(|_| ())
    }

    fn push(&self, path: &Path, branch: &str) -> Result<(), VcsError> {
        self.run(Some(path), "push", &["push", "-u", DEFAULT_REMOTE, branch])
            .map(|_| ())
    }
}

/// Commits on the upstream of HEAD that are not in HEAD.
fn upstream_behind(repo: &Repository) -> Option<usize> {
    let head = repo.head().ok()?;
    let name = head.shorthand()?;
    let local = repo.find_branch(name, BranchType::Local).ok()?;
    let upstream = local.upstream().ok()?;
    let local_oid = head.target()?;
    let upstream_oid = upstream.get().target()?;
    let (_ahead, behind) = repo.graph_ahead_behind(local_oid, upstream_oid).ok()?;
    Some(behind)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::library::prompt::AutoPrompt;
    use crate::library::reconcile::{LibraryAction, Reconciler, RecordStatus, SyncSettings};
    use crate::library::record::LibraryRecord;
    use crate::test_utils::fakes::MemoryStore;
    use crate::test_utils::fixtures::UnitTestFixture;

    fn git(dir: &Path, args: &[&str]) {
        let output = Command::new("git").args(args).current_dir(dir).output().unwrap();
        assert!(
            output.status.success(),
            "git {args:?}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn commit_file(repo: &Path, relative: &str, message: &str) {
        let path = repo.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, message).unwrap();
        git(repo, &["add", "-A"]);
        git(repo, &["commit", "-q", "-m", message]);
    }

    fn new_repo(path: &Path) {
        std::fs::create_dir_all(path).unwrap();
        git(path, &["init", "-q"]);
        git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(path, &["config", "user.name", "Jaavis Test"]);
        git(path, &["config", "user.email", "test@jaavis.local"]);
    }

    /// A bare remote with one commit, a writer clone, and a library that
    /// has the remote's history but no upstream tracking for `main`.
    fn untracked_library(fixture: &UnitTestFixture) -> (PathBuf, PathBuf) {
        let remote = fixture.path("remote.git");
        let writer = fixture.path("writer");
        let library = fixture.path("library");
        let remote_url = remote.to_string_lossy().into_owned();

        std::fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "-q", "--bare"]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        new_repo(&writer);
        commit_file(&writer, "skills/ui/card.md", "card");
        git(&writer, &["push", "-q", &remote_url, "main"]);

        new_repo(&library);
        git(&library, &["remote", "add", DEFAULT_REMOTE, &remote_url]);
        git(&library, &["fetch", "-q", DEFAULT_REMOTE]);
        git(&library, &["checkout", "-q", "--no-track", "-B", "main", "origin/main"]);

        commit_file(&writer, "skills/ui/badge.md", "badge");
        git(&writer, &["push", "-q", &remote_url, "main"]);
        (library, remote)
    }

    #[test]
    fn inspects_fresh_repository() {
        let fixture = UnitTestFixture::new();
        let client = GitClient::new();
        assert!(!client.has_metadata(&fixture.data_path));

        client.init(&fixture.data_path).unwrap();
        assert!(client.has_metadata(&fixture.data_path));
        assert!(client.remote_url(&fixture.data_path).is_none());

        client
            .set_remote(&fixture.data_path, "https://example.com/skills.git")
            .unwrap();
        client
            .set_remote(&fixture.data_path, "https://example.com/other.git")
            .unwrap();
        assert_eq!(
            client.remote_url(&fixture.data_path).as_deref(),
            Some("https://example.com/other.git")
        );
    }

    #[test]
    fn counts_untracked_files() {
        let fixture = UnitTestFixture::new();
        let client = GitClient::new();
        client.init(&fixture.data_path).unwrap();
        let _ = fixture.create_file("skills/ui/card.md", "# Card");
        let status = client.status(&fixture.data_path).unwrap();
        assert!(status.is_dirty());
        assert_eq!(status.behind, None);
    }

    #[test]
    fn status_outside_repository_fails() {
        let fixture = UnitTestFixture::new();
        let err = GitClient::new().status(&fixture.data_path).unwrap_err();
        assert_eq!(err.operation, "status");
    }

    #[test]
    fn pull_without_upstream_is_classified_then_fixed() {
        let fixture = UnitTestFixture::new();
        let (library, _remote) = untracked_library(&fixture);
        let client = GitClient::new();

        let err = client.pull_rebase(&library).unwrap_err();
        assert!(err.is_no_upstream(), "{err}");

        let branch = client.current_branch(&library).unwrap();
        assert_eq!(branch, "main");
        client.fetch(&library, Duration::from_secs(10)).unwrap();
        client.set_upstream(&library, &branch).unwrap();
        assert_eq!(client.status(&library).unwrap().behind, Some(1));

        client.pull_rebase(&library).unwrap();
        assert!(library.join("skills/ui/badge.md").is_file());
        assert_eq!(client.status(&library).unwrap().behind, Some(0));
    }

    #[test]
    fn dirty_sync_stashes_fixes_upstream_and_restores_work() {
        let fixture = UnitTestFixture::new();
        let (library, remote) = untracked_library(&fixture);
        std::fs::write(library.join("notes.md"), "work in progress").unwrap();

        let mut store = MemoryStore::default();
        store.insert(
            LibraryRecord::new("programmer", library.clone())
                .with_remote(remote.to_string_lossy().into_owned()),
        );
        let client = GitClient::new();
        let mut prompt = AutoPrompt::default();
        let report = Reconciler::new(&client, &mut prompt, SyncSettings::default())
            .sync(&mut store, "programmer");

        assert_eq!(report.status, RecordStatus::Synced, "{report:?}");
        assert!(report.actions.contains(&LibraryAction::SetUpstream {
            branch: "main".to_string()
        }));
        assert_eq!(report.actions.last(), Some(&LibraryAction::PopStash));
        assert!(library.join("skills/ui/badge.md").is_file());
        assert_eq!(
            std::fs::read_to_string(library.join("notes.md")).unwrap(),
            "work in progress"
        );
    }
}
