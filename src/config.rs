use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{JaavisError, Result};
use crate::exec::default_shell;
use crate::library::{LibraryRecord, LibraryStore, SyncSettings, UpdateCache};

/// Personas every installation starts with.
pub const BUILTIN_PERSONAS: [&str; 3] = ["programmer", "contractor", "librarian"];
pub const DEFAULT_PERSONA: &str = "programmer";

/// Persisted configuration: defaults, then the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub current_persona: String,
    #[serde(default)]
    pub personas: BTreeMap<String, LibraryRecord>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub auto_sync: AutoSyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_persona: DEFAULT_PERSONA.to_string(),
            personas: BTreeMap::new(),
            execution: ExecutionConfig::default(),
            sync: SyncConfig::default(),
            auto_sync: AutoSyncConfig::default(),
        }
    }
}

impl Config {
    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(value) = patch.current_persona {
            self.current_persona = value;
        }
        if let Some(personas) = patch.personas {
            for (name, mut record) in personas {
                record.name.clone_from(&name);
                self.personas.insert(name, record);
            }
        }
        if let Some(patch) = patch.execution {
            self.execution.merge(patch);
        }
        if let Some(patch) = patch.sync {
            self.sync.merge(patch);
        }
        if let Some(patch) = patch.auto_sync {
            self.auto_sync.merge(patch);
        }
    }

    /// Add any missing built-in persona with its default library location.
    /// Returns whether anything was added.
    pub fn seed_builtin_personas(&mut self, data_dir: &Path) -> bool {
        let mut added = false;
        for name in BUILTIN_PERSONAS {
            if !self.personas.contains_key(name) {
                let record = LibraryRecord::new(name, default_library_path(data_dir, name));
                self.personas.insert(name.to_string(), record);
                added = true;
            }
        }
        added
    }
}

/// `<data_dir>/library` for the default persona, `library_<name>` otherwise.
#[must_use]
pub fn default_library_path(data_dir: &Path, persona: &str) -> PathBuf {
    if persona == DEFAULT_PERSONA {
        data_dir.join("library")
    } else {
        data_dir.join(format!("library_{persona}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Shell used for steps; detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

impl ExecutionConfig {
    fn merge(&mut self, patch: ExecutionPatch) {
        if let Some(value) = patch.shell {
            self.shell = Some(value);
        }
    }

    #[must_use]
    pub fn shell(&self) -> String {
        self.shell.clone().unwrap_or_else(default_shell)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub primary_branch: String,
    pub secondary_branch: String,
    pub fetch_timeout_secs: u64,
    pub commit_message_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let settings = SyncSettings::default();
        Self {
            primary_branch: settings.primary_branch,
            secondary_branch: settings.secondary_branch,
            fetch_timeout_secs: settings.fetch_timeout.as_secs(),
            commit_message_prefix: settings.commit_message_prefix,
        }
    }
}

impl SyncConfig {
    fn merge(&mut self, patch: SyncPatch) {
        if let Some(value) = patch.primary_branch {
            self.primary_branch = value;
        }
        if let Some(value) = patch.secondary_branch {
            self.secondary_branch = value;
        }
        if let Some(value) = patch.fetch_timeout_secs {
            self.fetch_timeout_secs = value;
        }
        if let Some(value) = patch.commit_message_prefix {
            self.commit_message_prefix = value;
        }
    }

    #[must_use]
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            primary_branch: self.primary_branch.clone(),
            secondary_branch: self.secondary_branch.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            commit_message_prefix: self.commit_message_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updates_pending: bool,
    pub ttl_hours: u32,
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self {
            last_check: None,
            updates_pending: false,
            ttl_hours: 24,
        }
    }
}

impl AutoSyncConfig {
    fn merge(&mut self, patch: AutoSyncPatch) {
        if let Some(value) = patch.last_check {
            self.last_check = Some(value);
        }
        if let Some(value) = patch.updates_pending {
            self.updates_pending = value;
        }
        if let Some(value) = patch.ttl_hours {
            self.ttl_hours = value;
        }
    }

    #[must_use]
    pub fn cache(&self) -> UpdateCache {
        UpdateCache {
            last_checked: self.last_check,
            updates_pending: self.updates_pending,
            ttl: chrono::Duration::hours(i64::from(self.ttl_hours)),
        }
    }

    pub fn store_cache(&mut self, cache: &UpdateCache) {
        self.last_check = cache.last_checked;
        self.updates_pending = cache.updates_pending;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub current_persona: Option<String>,
    pub personas: Option<BTreeMap<String, LibraryRecord>>,
    pub execution: Option<ExecutionPatch>,
    pub sync: Option<SyncPatch>,
    pub auto_sync: Option<AutoSyncPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ExecutionPatch {
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SyncPatch {
    pub primary_branch: Option<String>,
    pub secondary_branch: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub commit_message_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AutoSyncPatch {
    pub last_check: Option<DateTime<Utc>>,
    pub updates_pending: Option<bool>,
    pub ttl_hours: Option<u32>,
}

/// `JAAVIS_*` environment overrides. Applied on read, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub persona: Option<String>,
    pub shell: Option<String>,
    pub primary_branch: Option<String>,
    pub secondary_branch: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub auto_sync_ttl_hours: Option<u32>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            persona: env_string("JAAVIS_PERSONA"),
            shell: env_string("JAAVIS_SHELL"),
            primary_branch: env_string("JAAVIS_PRIMARY_BRANCH"),
            secondary_branch: env_string("JAAVIS_SECONDARY_BRANCH"),
            fetch_timeout_secs: env_u64("JAAVIS_FETCH_TIMEOUT_SECS")?,
            auto_sync_ttl_hours: env_u32("JAAVIS_AUTO_SYNC_TTL_HOURS")?,
        })
    }

    fn apply(&self, config: &mut Config) {
        if let Some(value) = &self.persona {
            config.current_persona.clone_from(value);
        }
        if let Some(value) = &self.shell {
            config.execution.shell = Some(value.clone());
        }
        if let Some(value) = &self.primary_branch {
            config.sync.primary_branch.clone_from(value);
        }
        if let Some(value) = &self.secondary_branch {
            config.sync.secondary_branch.clone_from(value);
        }
        if let Some(value) = self.fetch_timeout_secs {
            config.sync.fetch_timeout_secs = value;
        }
        if let Some(value) = self.auto_sync_ttl_hours {
            config.auto_sync.ttl_hours = value;
        }
    }
}

/// The config file plus the overrides in effect for this process.
///
/// Mutations go to the persisted form and are written out immediately.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    data_dir: PathBuf,
    persisted: Config,
    overrides: EnvOverrides,
}

impl ConfigStore {
    /// Load from `explicit_path`, `$JAAVIS_CONFIG`, or the user config dir.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path
            .map(PathBuf::from)
            .or_else(|| env_string("JAAVIS_CONFIG").map(PathBuf::from))
        {
            Some(path) => path,
            None => dirs::config_dir()
                .ok_or_else(|| JaavisError::Config("config directory not found".to_string()))?
                .join("jaavis/config.toml"),
        };
        let data_dir = data_dir()?;
        Self::open(path, data_dir, EnvOverrides::from_env()?)
    }

    /// Load from an explicit location with explicit overrides.
    pub fn open(path: PathBuf, data_dir: PathBuf, overrides: EnvOverrides) -> Result<Self> {
        let mut persisted = Config::default();
        if let Some(patch) = load_patch(&path)? {
            persisted.merge_patch(patch);
        }
        persisted.seed_builtin_personas(&data_dir);
        debug!(path = %path.display(), personas = persisted.personas.len(), "config loaded");
        Ok(Self {
            path,
            data_dir,
            persisted,
            overrides,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Effective configuration: persisted values with overrides applied.
    #[must_use]
    pub fn config(&self) -> Config {
        let mut config = self.persisted.clone();
        self.overrides.apply(&mut config);
        config
    }

    #[must_use]
    pub fn current_persona(&self) -> String {
        self.overrides
            .persona
            .clone()
            .unwrap_or_else(|| self.persisted.current_persona.clone())
    }

    /// Library record of the active persona.
    pub fn active_record(&self) -> Result<LibraryRecord> {
        self.record(&self.current_persona())
    }

    /// Apply `change` to the persisted config and save it.
    pub fn update<T>(&mut self, change: impl FnOnce(&mut Config) -> Result<T>) -> Result<T> {
        let mut next = self.persisted.clone();
        let out = change(&mut next)?;
        let previous = std::mem::replace(&mut self.persisted, next);
        if let Err(err) = self.save() {
            self.persisted = previous;
            return Err(err);
        }
        Ok(out)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&self.persisted)
            .map_err(|err| JaavisError::Serialization(format!("encode config: {err}")))?;
        std::fs::write(&self.path, raw).map_err(|err| {
            JaavisError::Config(format!("write config {}: {err}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

impl LibraryStore for ConfigStore {
    fn record(&self, name: &str) -> Result<LibraryRecord> {
        self.persisted
            .personas
            .get(name)
            .cloned()
            .map(|mut record| {
                record.name = name.to_string();
                record
            })
            .ok_or_else(|| JaavisError::NotFound(format!("persona '{name}'")))
    }

    fn names(&self) -> Vec<String> {
        self.persisted.personas.keys().cloned().collect()
    }

    fn set_remote(&mut self, name: &str, url: &str) -> Result<()> {
        self.update(|config| {
            let record = config
                .personas
                .get_mut(name)
                .ok_or_else(|| JaavisError::NotFound(format!("persona '{name}'")))?;
            record.remote_url = Some(url.to_string());
            Ok(())
        })
    }
}

fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|err| JaavisError::Config(format!("read config {}: {err}", path.display())))?;
    let patch = toml::from_str(&raw)
        .map_err(|err| JaavisError::Config(format!("parse config {}: {err}", path.display())))?;
    Ok(Some(patch))
}

/// `$JAAVIS_DATA_DIR`, else `<data_dir>/jaavis`.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = env_string("JAAVIS_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("jaavis"))
        .ok_or_else(|| JaavisError::Config("data directory not found".to_string()))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u32>().map(Some).map_err(|err| {
            JaavisError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u64>().map(Some).map_err(|err| {
            JaavisError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::UnitTestFixture;

    fn open(fixture: &UnitTestFixture, overrides: EnvOverrides) -> ConfigStore {
        ConfigStore::open(fixture.path("config.toml"), fixture.path("data"), overrides).unwrap()
    }

    #[test]
    fn defaults_seed_builtin_personas() {
        let fixture = UnitTestFixture::new();
        let store = open(&fixture, EnvOverrides::default());
        assert_eq!(store.names(), vec!["contractor", "librarian", "programmer"]);
        assert_eq!(store.current_persona(), "programmer");
        assert_eq!(store.active_record().unwrap().path, fixture.path("data/library"));
        assert_eq!(
            store.record("librarian").unwrap().path,
            fixture.path("data/library_librarian")
        );
        let config = store.config();
        assert_eq!(config.sync.primary_branch, "main");
        assert_eq!(config.auto_sync.ttl_hours, 24);
    }

    #[test]
    fn file_patch_merges_over_defaults() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file(
            "config.toml",
            r#"
current_persona = "designer"

[personas.designer]
path = "/srv/design"
remote_url = "https://example.com/design.git"
locked = true

[sync]
secondary_branch = "trunk"
"#,
        );
        let store = open(&fixture, EnvOverrides::default());
        let record = store.active_record().unwrap();
        assert_eq!(record.name, "designer");
        assert!(record.locked);
        assert_eq!(record.remote_url.as_deref(), Some("https://example.com/design.git"));
        let config = store.config();
        assert_eq!(config.sync.secondary_branch, "trunk");
        assert_eq!(config.sync.primary_branch, "main");
        assert_eq!(store.names().len(), 4);
    }

    #[test]
    fn overrides_apply_but_are_not_saved() {
        let fixture = UnitTestFixture::new();
        let overrides = EnvOverrides {
            persona: Some("librarian".to_string()),
            fetch_timeout_secs: Some(1),
            ..EnvOverrides::default()
        };
        let mut store = open(&fixture, overrides);
        assert_eq!(store.current_persona(), "librarian");
        assert_eq!(store.config().sync.settings().fetch_timeout, Duration::from_secs(1));

        store
            .set_remote("librarian", "https://example.com/lib.git")
            .unwrap();
        let reloaded = open(&fixture, EnvOverrides::default());
        assert_eq!(reloaded.current_persona(), "programmer");
        assert_eq!(reloaded.config().sync.fetch_timeout_secs, 5);
        assert_eq!(
            reloaded.record("librarian").unwrap().remote_url.as_deref(),
            Some("https://example.com/lib.git")
        );
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file("config.toml", "current_persona = [");
        let err = ConfigStore::open(fixture.path("config.toml"), fixture.path("data"), EnvOverrides::default())
            .unwrap_err();
        assert!(matches!(err, JaavisError::Config(_)));
    }

    #[test]
    fn failed_update_leaves_config_untouched() {
        let fixture = UnitTestFixture::new();
        let mut store = open(&fixture, EnvOverrides::default());
        let result: Result<()> = store.update(|config| {
            config.current_persona = "ghost".to_string();
            Err(JaavisError::NotFound("ghost".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.current_persona(), "programmer");
    }

    #[test]
    fn auto_sync_roundtrips_through_cache() {
        let mut auto_sync = AutoSyncConfig::default();
        let mut cache = auto_sync.cache();
        cache.updates_pending = true;
        cache.last_checked = Some(Utc::now());
        auto_sync.store_cache(&cache);
        assert!(auto_sync.updates_pending);
        assert!(auto_sync.last_check.is_some());
    }
}
