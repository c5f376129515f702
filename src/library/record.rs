//! Library records and the store that owns them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A persona's skill library as persisted in the config store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRecord {
    /// Persona key. Not persisted; filled in from the map key on load.
    #[serde(skip)]
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LibraryRecord {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            remote_url: None,
            locked: false,
            created_at: None,
        }
    }

    #[must_use]
    pub fn with_remote(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }
}

/// Where library records live. The reconciler reads the current record at
/// the start of every pass and only ever writes the remote URL back.
pub trait LibraryStore {
    /// Current record for `name`; `NotFound` when there is none.
    fn record(&self, name: &str) -> Result<LibraryRecord>;

    /// All record names, sorted.
    fn names(&self) -> Vec<String>;

    /// Persist a new remote URL for `name`.
    fn set_remote(&mut self, name: &str, url: &str) -> Result<()>;
}
