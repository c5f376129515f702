use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use crate::cli::Cli;
use crate::config::{Config, ConfigStore};
use crate::error::{JaavisError, Result};
use crate::library::{GitClient, LibraryRecord, check_behind};

pub struct AppContext {
    pub store: ConfigStore,
    /// Project directory commands act on.
    pub project_dir: PathBuf,
    pub robot_mode: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let store = ConfigStore::load(cli.config.as_deref())?;
        let project_dir = std::env::current_dir()?;
        debug!(
            config = %store.path().display(),
            persona = %store.current_persona(),
            "context ready"
        );
        Ok(Self {
            store,
            project_dir,
            robot_mode: cli.robot,
        })
    }

    /// Effective configuration for this run.
    #[must_use]
    pub fn config(&self) -> Config {
        self.store.config()
    }

    pub fn active_library(&self) -> Result<LibraryRecord> {
        self.store.active_record()
    }

    /// Root of the active persona's library; `NotFound` until it exists.
    pub fn library_path(&self) -> Result<PathBuf> {
        let record = self.active_library()?;
        if !record.path.is_dir() {
            return Err(JaavisError::NotFound(format!(
                "library for '{}' at {} (run `jaavis persona use {}` or `jaavis sync`)",
                record.name,
                record.path.display(),
                record.name
            )));
        }
        Ok(record.path)
    }

    /// Whether operator prompts can be shown.
    #[must_use]
    pub fn interactive(&self) -> bool {
        !self.robot_mode && std::io::stdin().is_terminal()
    }

    /// Refresh the cached "library behind remote" flag when stale and
    /// return it. Never fails the calling command.
    pub fn updates_pending(&mut self) -> bool {
        let config = self.config();
        let mut cache = config.auto_sync.cache();
        let Ok(record) = self.active_library() else {
            return false;
        };
        let timeout = config.sync.settings().fetch_timeout;
        let changed = cache.refresh(Utc::now(), || {
            check_behind(&GitClient::new(), &record.path, timeout)
        });
        if changed {
            let persisted = self.store.update(|config| {
                config.auto_sync.store_cache(&cache);
                Ok(())
            });
            if let Err(err) = persisted {
                debug!(error = %err, "update cache not saved");
            }
        }
        cache.updates_pending
    }

    /// Forget a pending-updates flag after a successful sync.
    pub fn clear_updates_pending(&mut self) -> Result<()> {
        if !self.config().auto_sync.updates_pending {
            return Ok(());
        }
        self.store.update(|config| {
            let mut cache = config.auto_sync.cache();
            cache.clear();
            config.auto_sync.store_cache(&cache);
            Ok(())
        })
    }
}
