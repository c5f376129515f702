//! Skill discovery inside a library directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::Result;

/// Template file kept alongside skills; never listed as a skill.
pub const TEMPLATE_FILE: &str = "TEMPLATE_SKILL.md";

/// Result of a two-phase skill lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "match", content = "path", rename_all = "snake_case")]
pub enum SkillLookup {
    /// File name equals the query (with or without `.md`).
    Exact(PathBuf),
    /// First `.md` file whose name contains the query, case-insensitively.
    Fuzzy(PathBuf),
    NotFound,
}

impl SkillLookup {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Exact(path) | Self::Fuzzy(path) => Some(path),
            Self::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillEntry {
    pub name: String,
    pub path: PathBuf,
    pub domain: String,
}

fn markdown_files(library: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(library)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Find a skill by name: exact file name across the whole library first,
/// then a case-insensitive substring match.
#[must_use]
pub fn find_skill(library: &Path, query: &str) -> SkillLookup {
    let query = query.trim();
    if query.is_empty() || !library.exists() {
        return SkillLookup::NotFound;
    }

    let with_ext = format!("{query}.md");
    let candidates: Vec<PathBuf> = markdown_files(library)
        .filter(|path| file_name(path) != TEMPLATE_FILE)
        .collect();

    if let Some(path) = candidates.iter().find(|path| {
        let name = file_name(path);
        name == query || name == with_ext
    }) {
        return SkillLookup::Exact(path.clone());
    }

    let needle = query.to_lowercase();
    candidates
        .into_iter()
        .find(|path| file_name(path).to_lowercase().contains(&needle))
        .map_or(SkillLookup::NotFound, SkillLookup::Fuzzy)
}

/// Every skill in the library, sorted by domain then name.
#[must_use]
pub fn list_skills(library: &Path) -> Vec<SkillEntry> {
    if !library.exists() {
        return Vec::new();
    }
    let mut skills: Vec<SkillEntry> = markdown_files(library)
        .filter(|path| file_name(path) != TEMPLATE_FILE)
        .map(|path| {
            let domain = match path.parent() {
                Some(parent) if parent == library => "root".to_string(),
                Some(parent) => file_name(parent),
                None => "root".to_string(),
            };
            SkillEntry {
                name: file_name(&path),
                domain,
                path,
            }
        })
        .collect();
    skills.sort_by(|a, b| (&a.domain, &a.name).cmp(&(&b.domain, &b.name)));
    skills
}

/// Skills whose content contains `query`, case-insensitively.
pub fn search_skills(library: &Path, query: &str) -> Result<Vec<PathBuf>> {
    let needle = query.to_lowercase();
    let mut matches = Vec::new();
    if !library.exists() || needle.is_empty() {
        return Ok(matches);
    }
    for path in markdown_files(library) {
        // Unreadable files are skipped, not fatal.
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if content.to_lowercase().contains(&needle) {
            matches.push(path);
        }
    }
    Ok(matches)
}
