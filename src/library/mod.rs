//! Persona libraries: records, version control and reconciliation.

pub mod git;
pub mod persona;
pub mod prompt;
pub mod reconcile;
pub mod record;
pub mod update_check;
pub mod vcs;

pub use git::GitClient;
pub use persona::{
    PersonaSummary, add_persona, delete_persona, list_personas, normalize_persona_name,
    rename_persona, toggle_lock, use_persona,
};
pub use prompt::{AutoPrompt, DirtyStrategy, InteractivePrompt, ReconcilePrompt};
pub use reconcile::{
    BatchSummary, Direction, LibraryAction, Reconciler, RecordReport, RecordStatus, Selection,
    SyncSettings, SyncState,
};
pub use record::{LibraryRecord, LibraryStore};
pub use update_check::{UpdateCache, check_behind};
pub use vcs::{DEFAULT_REMOTE, RepoStatus, VersionControlClient};
