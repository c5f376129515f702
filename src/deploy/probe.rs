//! Local tooling detection.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::process::run_captured;

/// Snapshot source for what the local machine and project provide.
pub trait EnvironmentProbe {
    /// Whether an executable named `name` is on PATH.
    fn has_tool(&self, name: &str) -> bool;
    /// Whether the cluster CLI can reach a live cluster.
    fn cluster_reachable(&self) -> bool;
    /// Whether `relative` exists under the project root.
    fn file_exists(&self, relative: &str) -> bool;
}

/// Probes the real machine, rooted at a project directory.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    root: PathBuf,
    cluster_timeout: Duration,
}

impl SystemProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cluster_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn with_cluster_timeout(mut self, timeout: Duration) -> Self {
        self.cluster_timeout = timeout;
        self
    }
}

impl EnvironmentProbe for SystemProbe {
    fn has_tool(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }

    fn cluster_reachable(&self) -> bool {
        if !self.has_tool("kubectl") {
            return false;
        }
        let mut cmd = Command::new("kubectl");
        cmd.arg("cluster-info");
        match run_captured(&mut cmd, Some(self.cluster_timeout)) {
            Ok(Some(output)) => output.success(),
            Ok(None) => {
                debug!(timeout = ?self.cluster_timeout, "kubectl cluster-info timed out");
                false
            }
            Err(err) => {
                debug!(error = %err, "kubectl cluster-info failed to launch");
                false
            }
        }
    }

    fn file_exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }
}
