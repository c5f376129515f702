//! Persona management over the config store.
//!
//! Every persona owns one library record. The default persona is permanent:
//! it cannot be renamed, locked or deleted.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ConfigStore, DEFAULT_PERSONA, default_library_path};
use crate::error::{JaavisError, Result};

use super::record::{LibraryRecord, LibraryStore};

/// Subdirectories every active library carries.
pub const LIBRARY_LAYOUT: [&str; 2] = ["skills", "scripts"];

#[derive(Debug, Clone, Serialize)]
pub struct PersonaSummary {
    pub name: String,
    pub path: PathBuf,
    pub remote_url: Option<String>,
    pub locked: bool,
    pub active: bool,
    pub exists: bool,
}

/// Lower-case and keep `[a-z0-9_]`. `None` when nothing survives.
#[must_use]
pub fn normalize_persona_name(raw: &str) -> Option<String> {
    let name: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if name.is_empty() { None } else { Some(name) }
}

fn require_name(raw: &str) -> Result<String> {
    normalize_persona_name(raw)
        .ok_or_else(|| JaavisError::Config(format!("invalid persona name '{raw}'")))
}

fn ensure_mutable(record: &LibraryRecord) -> Result<()> {
    if record.name == DEFAULT_PERSONA {
        return Err(JaavisError::Locked(format!(
            "'{DEFAULT_PERSONA}' is the default persona"
        )));
    }
    if record.locked {
        return Err(JaavisError::Locked(format!(
            "persona '{}' is locked; unlock it first",
            record.name
        )));
    }
    Ok(())
}

/// Default persona first, the rest by name.
#[must_use]
pub fn list_personas(store: &ConfigStore) -> Vec<PersonaSummary> {
    let current = store.current_persona();
    let mut names = store.names();
    names.sort_by_key(|name| (name.as_str() != DEFAULT_PERSONA, name.clone()));
    names
        .into_iter()
        .filter_map(|name| store.record(&name).ok())
        .map(|record| PersonaSummary {
            active: record.name == current,
            exists: record.path.is_dir(),
            name: record.name,
            path: record.path,
            remote_url: record.remote_url,
            locked: record.locked,
        })
        .collect()
}

/// Register a persona. Its library defaults to `library_<name>` in the data dir.
pub fn add_persona(
    store: &mut ConfigStore,
    raw_name: &str,
    path: Option<&Path>,
) -> Result<LibraryRecord> {
    let name = require_name(raw_name)?;
    let path = path.map_or_else(
        || default_library_path(store.data_dir(), &name),
        Path::to_path_buf,
    );
    let mut record = LibraryRecord::new(name.clone(), path);
    record.created_at = Some(Utc::now());

    let saved = record.clone();
    store.update(move |config| {
        if config.personas.contains_key(&name) {
            return Err(JaavisError::AlreadyExists(format!("persona '{name}'")));
        }
        config.personas.insert(name, record);
        Ok(())
    })?;
    info!(persona = %saved.name, path = %saved.path.display(), "persona added");
    Ok(saved)
}

/// Rename a persona. A library at the default location moves along with it.
pub fn rename_persona(store: &mut ConfigStore, old: &str, raw_new: &str) -> Result<LibraryRecord> {
    let mut record = store.record(old)?;
    ensure_mutable(&record)?;
    let new = require_name(raw_new)?;
    if store.record(&new).is_ok() {
        return Err(JaavisError::AlreadyExists(format!("persona '{new}'")));
    }

    let data_dir = store.data_dir().to_path_buf();
    let old_path = record.path.clone();
    let mut moved = false;
    if old_path == default_library_path(&data_dir, old) {
        let new_path = default_library_path(&data_dir, &new);
        if old_path.exists() {
            std::fs::rename(&old_path, &new_path)?;
            moved = true;
        }
        record.path = new_path;
    }
    record.name.clone_from(&new);

    let saved = record.clone();
    let old_name = old.to_string();
    let updated = store.update(move |config| {
        config.personas.remove(&old_name);
        config.personas.insert(new.clone(), record);
        if config.current_persona == old_name {
            config.current_persona = new;
        }
        Ok(())
    });
    if let Err(err) = updated {
        // Config still names the old directory; put the library back there.
        if moved {
            if let Err(undo) = std::fs::rename(&saved.path, &old_path) {
                warn!(error = %undo, path = %saved.path.display(), "could not restore library");
            }
        }
        return Err(err);
    }
    info!(from = old, to = %saved.name, "persona renamed");
    Ok(saved)
}

/// Flip the lock flag; returns the new state.
pub fn toggle_lock(store: &mut ConfigStore, name: &str) -> Result<bool> {
    if name == DEFAULT_PERSONA {
        return Err(JaavisError::Locked(format!(
            "'{DEFAULT_PERSONA}' is the default persona"
        )));
    }
    let name = name.to_string();
    store.update(move |config| {
        let record = config
            .personas
            .get_mut(&name)
            .ok_or_else(|| JaavisError::NotFound(format!("persona '{name}'")))?;
        record.locked = !record.locked;
        Ok(record.locked)
    })
}

/// Forget a persona, removing its library directory when `remove_files`.
/// The active persona falls back to the default.
pub fn delete_persona(
    store: &mut ConfigStore,
    name: &str,
    remove_files: bool,
) -> Result<LibraryRecord> {
    let record = store.record(name)?;
    ensure_mutable(&record)?;

    // Forget the persona first; files are only removed once that is saved.
    let owned = name.to_string();
    store.update(move |config| {
        config.personas.remove(&owned);
        if config.current_persona == owned {
            config.current_persona = DEFAULT_PERSONA.to_string();
        }
        Ok(())
    })?;
    info!(persona = name, "persona deleted");

    if remove_files && record.path.exists() {
        std::fs::remove_dir_all(&record.path)?;
        info!(path = %record.path.display(), "library removed");
    }
    Ok(record)
}

/// Make `name` the active persona, creating its library layout.
pub fn use_persona(store: &mut ConfigStore, name: &str) -> Result<LibraryRecord> {
    let record = store.record(name)?;
    for dir in LIBRARY_LAYOUT {
        std::fs::create_dir_all(record.path.join(dir))?;
    }
    let owned = name.to_string();
    store.update(move |config| {
        config.current_persona = owned;
        Ok(())
    })?;
    info!(persona = name, path = %record.path.display(), "persona active");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvOverrides;
    use crate::test_utils::fixtures::UnitTestFixture;

    fn store(fixture: &UnitTestFixture) -> ConfigStore {
        ConfigStore::open(
            fixture.path("config.toml"),
            fixture.path("data"),
            EnvOverrides::default(),
        )
        .unwrap()
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_persona_name(" Web Dev-2 ").as_deref(), Some("webdev2"));
        assert_eq!(normalize_persona_name("ops_team").as_deref(), Some("ops_team"));
        assert_eq!(normalize_persona_name("!!!"), None);
    }

    #[test]
    fn add_uses_default_location_and_rejects_duplicates() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        let record = add_persona(&mut store, "Designer", None).unwrap();
        assert_eq!(record.name, "designer");
        assert_eq!(record.path, fixture.path("data/library_designer"));
        assert!(record.created_at.is_some());

        let err = add_persona(&mut store, "designer", None).unwrap_err();
        assert!(matches!(err, JaavisError::AlreadyExists(_)));
        assert!(store.record("designer").is_ok());
    }

    #[test]
    fn rename_moves_default_library() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        add_persona(&mut store, "designer", None).unwrap();
        use_persona(&mut store, "designer").unwrap();
        assert!(fixture.path("data/library_designer/skills").is_dir());

        let renamed = rename_persona(&mut store, "designer", "artist").unwrap();
        assert_eq!(renamed.path, fixture.path("data/library_artist"));
        assert!(fixture.path("data/library_artist/skills").is_dir());
        assert!(!fixture.path("data/library_designer").exists());
        assert_eq!(store.current_persona(), "artist");
        assert!(store.record("designer").is_err());
    }

    /// Replace the config file with a directory so the next save fails.
    fn break_config(fixture: &UnitTestFixture) {
        let path = fixture.path("config.toml");
        let _ = std::fs::remove_file(&path);
        std::fs::create_dir_all(&path).unwrap();
    }

    #[test]
    fn failed_save_puts_renamed_library_back() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        add_persona(&mut store, "designer", None).unwrap();
        use_persona(&mut store, "designer").unwrap();
        break_config(&fixture);

        assert!(rename_persona(&mut store, "designer", "artist").is_err());
        assert!(fixture.path("data/library_designer/skills").is_dir());
        assert!(!fixture.path("data/library_artist").exists());
        assert!(store.record("designer").is_ok());
        assert!(store.record("artist").is_err());
    }

    #[test]
    fn failed_save_keeps_deleted_library_on_disk() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        add_persona(&mut store, "designer", None).unwrap();
        use_persona(&mut store, "designer").unwrap();
        break_config(&fixture);

        assert!(delete_persona(&mut store, "designer", true).is_err());
        assert!(fixture.path("data/library_designer").is_dir());
        assert!(store.record("designer").is_ok());
    }

    #[test]
    fn rename_keeps_custom_location() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        let custom = fixture.path("elsewhere");
        add_persona(&mut store, "ops", Some(&custom)).unwrap();
        let renamed = rename_persona(&mut store, "ops", "infra").unwrap();
        assert_eq!(renamed.path, custom);
    }

    #[test]
    fn locked_persona_refuses_identity_changes() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        add_persona(&mut store, "legal", None).unwrap();
        assert!(toggle_lock(&mut store, "legal").unwrap());

        assert!(matches!(
            rename_persona(&mut store, "legal", "law").unwrap_err(),
            JaavisError::Locked(_)
        ));
        assert!(matches!(
            delete_persona(&mut store, "legal", true).unwrap_err(),
            JaavisError::Locked(_)
        ));

        assert!(!toggle_lock(&mut store, "legal").unwrap());
        delete_persona(&mut store, "legal", true).unwrap();
        assert!(store.record("legal").is_err());
    }

    #[test]
    fn default_persona_is_permanent() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        assert!(matches!(
            toggle_lock(&mut store, DEFAULT_PERSONA).unwrap_err(),
            JaavisError::Locked(_)
        ));
        assert!(matches!(
            delete_persona(&mut store, DEFAULT_PERSONA, false).unwrap_err(),
            JaavisError::Locked(_)
        ));
    }

    #[test]
    fn deleting_active_persona_resets_to_default() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        use_persona(&mut store, "contractor").unwrap();
        let removed = delete_persona(&mut store, "contractor", true).unwrap();
        assert!(!removed.path.exists());
        assert_eq!(store.current_persona(), DEFAULT_PERSONA);
    }

    #[test]
    fn list_puts_default_first() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        add_persona(&mut store, "alpha", None).unwrap();
        let names: Vec<_> = list_personas(&store)
            .into_iter()
            .map(|persona| persona.name)
            .collect();
        assert_eq!(names, vec!["programmer", "alpha", "contractor", "librarian"]);
        assert!(list_personas(&store)[0].active);
    }

    #[test]
    fn use_unknown_persona_is_not_found() {
        let fixture = UnitTestFixture::new();
        let mut store = store(&fixture);
        assert!(matches!(
            use_persona(&mut store, "ghost").unwrap_err(),
            JaavisError::NotFound(_)
        ));
    }
}
