//! Skill documents and project grades.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::JaavisError;

use super::blocks::extract_executable_blocks;
use super::frontmatter::{Frontmatter, parse_frontmatter, strip_frontmatter};

/// Ordinal quality/strictness tier. `A` is the strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
}

impl Grade {
    /// Rank used for ordering: lower is stricter.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }

    /// Campaign name shown to the operator.
    #[must_use]
    pub const fn codename(self) -> &'static str {
        match self {
            Self::A => "Fortress",
            Self::B => "Campaign",
            Self::C => "Skirmish",
        }
    }

    /// Canonical infrastructure tier for deployments.
    #[must_use]
    pub const fn infrastructure(self) -> &'static str {
        match self {
            Self::A => "Kubernetes",
            Self::B => "Docker",
            Self::C => "Local",
        }
    }
}

impl PartialOrd for Grade {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Grade {
    /// `A > B > C`.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.rank().cmp(&self.rank())
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(letter)
    }
}

impl FromStr for Grade {
    type Err = JaavisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(JaavisError::Parse(format!(
                "invalid grade {other:?} (expected A, B or C)"
            ))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("skill document not found: {0}")]
    NotFound(PathBuf),
    #[error("skill document unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<DocumentError> for JaavisError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound(path) => Self::NotFound(path.display().to_string()),
            DocumentError::Unreadable { source, .. } => Self::Io(source),
        }
    }
}

/// A parsed skill document. Immutable once loaded.
#[derive(Debug, Clone, Serialize)]
pub struct SkillDocument {
    pub path: PathBuf,
    pub title: String,
    pub domain: String,
    pub description: String,
    pub grade: Option<Grade>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub tags: BTreeSet<String>,
    pub executable_blocks: Vec<String>,
}

impl SkillDocument {
    /// Build a document from raw content. Missing or malformed frontmatter
    /// produces empty metadata rather than an error.
    #[must_use]
    pub fn from_content(path: &Path, content: &str) -> Self {
        let meta = parse_frontmatter(content).unwrap_or_default();
        let body = strip_frontmatter(content);

        let title = scalar(&meta, "name")
            .or_else(|| scalar(&meta, "title"))
            .or_else(|| first_heading(body))
            .unwrap_or_else(|| file_stem(path));
        let domain = scalar(&meta, "domain").unwrap_or_else(|| parent_domain(path));
        let description = scalar(&meta, "description").unwrap_or_default();
        let grade = scalar(&meta, "grade").and_then(|g| g.parse().ok());

        Self {
            path: path.to_path_buf(),
            title,
            domain,
            description,
            grade,
            pros: list(&meta, "pros"),
            cons: list(&meta, "cons"),
            tags: list(&meta, "tags").into_iter().collect(),
            executable_blocks: extract_executable_blocks(content),
        }
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    #[must_use]
    pub fn is_executable(&self) -> bool {
        !self.executable_blocks.is_empty()
    }
}

/// Load and parse a skill document from disk.
pub fn load_document(path: &Path) -> Result<SkillDocument, DocumentError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(DocumentError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let doc = SkillDocument::from_content(path, &content);
    debug!(
        path = %path.display(),
        blocks = doc.executable_blocks.len(),
        "loaded skill document"
    );
    Ok(doc)
}

fn scalar(meta: &Frontmatter, key: &str) -> Option<String> {
    meta.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn list(meta: &Frontmatter, key: &str) -> Vec<String> {
    meta.get(key).map(|v| v.to_list()).unwrap_or_default()
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn parent_domain(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map_or_else(|| "root".to_string(), |s| s.to_string_lossy().to_string())
}
