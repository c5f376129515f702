//! Cached "is the active library behind its remote?" check.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::VcsError;

use super::vcs::VersionControlClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCache {
    pub last_checked: Option<DateTime<Utc>>,
    pub updates_pending: bool,
    #[serde(skip)]
    pub ttl: chrono::Duration,
}

impl Default for UpdateCache {
    fn default() -> Self {
        Self {
            last_checked: None,
            updates_pending: false,
            ttl: chrono::Duration::hours(24),
        }
    }
}

impl UpdateCache {
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.last_checked
            .is_none_or(|checked| now.signed_duration_since(checked) >= self.ttl)
    }

    /// Run `check` when stale and remember its answer. A failed check keeps
    /// the previous answer and is retried next time. Returns whether the
    /// cache changed.
    pub fn refresh<F>(&mut self, now: DateTime<Utc>, check: F) -> bool
    where
        F: FnOnce() -> Result<bool, VcsError>,
    {
        if !self.is_stale(now) {
            return false;
        }
        match check() {
            Ok(pending) => {
                self.updates_pending = pending;
                self.last_checked = Some(now);
                true
            }
            Err(err) => {
                debug!(error = %err, "update check failed");
                false
            }
        }
    }

    /// Called after a successful sync.
    pub const fn clear(&mut self) {
        self.updates_pending = false;
    }
}

/// Fetch under `timeout` and report whether the upstream has new commits.
pub fn check_behind(
    vcs: &dyn VersionControlClient,
    path: &Path,
    timeout: Duration,
) -> Result<bool, VcsError> {
    if !vcs.has_metadata(path) || vcs.remote_url(path).is_none() {
        return Ok(false);
    }
    vcs.fetch(path, timeout)?;
    let status = vcs.status(path)?;
    Ok(status.behind.unwrap_or(0) > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VcsErrorKind;
    use crate::test_utils::fakes::FakeVcs;
    use crate::test_utils::fixtures::UnitTestFixture;

    fn at(hour: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2026-03-01T{hour:02}:00:00Z"))
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn fresh_cache_skips_check() {
        let mut cache = UpdateCache {
            last_checked: Some(at(1)),
            updates_pending: true,
            ..UpdateCache::default()
        };
        let changed = cache.refresh(at(5), || panic!("check must not run"));
        assert!(!changed);
        assert!(cache.updates_pending);
    }

    #[test]
    fn stale_cache_runs_check() {
        let mut cache = UpdateCache {
            last_checked: Some(at(0)),
            ttl: chrono::Duration::hours(2),
            ..UpdateCache::default()
        };
        assert!(cache.refresh(at(3), || Ok(true)));
        assert!(cache.updates_pending);
        assert_eq!(cache.last_checked, Some(at(3)));

        cache.clear();
        assert!(!cache.updates_pending);
    }

    #[test]
    fn failed_check_keeps_previous_answer() {
        let mut cache = UpdateCache::default();
        let changed = cache.refresh(at(3), || {
            Err(VcsError::new("fetch", VcsErrorKind::Timeout, "timed out"))
        });
        assert!(!changed);
        assert!(cache.last_checked.is_none());
        assert!(cache.is_stale(at(4)));
    }

    #[test]
    fn check_behind_reads_upstream() {
        let fixture = UnitTestFixture::new();
        let vcs = FakeVcs::new().tracked("https://example.com/lib.git").behind(2);
        assert!(check_behind(&vcs, &fixture.data_path, Duration::from_secs(1)).unwrap());
        assert_eq!(vcs.calls(), vec!["fetch"]);

        let untracked = FakeVcs::new();
        assert!(!check_behind(&untracked, &fixture.data_path, Duration::from_secs(1)).unwrap());
        assert!(untracked.calls().is_empty());
    }
}
