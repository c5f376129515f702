//! Creating skills: from operator input, from an existing markdown doc, or
//! from the steps of a deployment run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::error::{JaavisError, Result};
use crate::plan::CommandStep;

use super::blocks::render_executable_block;
use super::document::Grade;
use super::frontmatter::FRONTMATTER_DELIMITER;

const DEFAULT_PRO: &str = "Standard Solution";
const DEFAULT_CON: &str = "None identified";
const SNIPPET_PLACEHOLDER: &str = "(Paste your code snippet here)";

/// Values prefilled from an existing markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocDefaults {
    pub name: String,
    pub description: String,
    pub snippet: String,
}

/// Extract a title, a description and the first code block from a markdown doc.
///
/// The title is the first `# ` heading, the description the first line that is
/// neither a heading nor a fence, the snippet the body of the first fenced block.
pub fn parse_markdown_doc(path: &Path) -> Result<DocDefaults> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            JaavisError::NotFound(path.display().to_string())
        } else {
            JaavisError::Io(err)
        }
    })?;
    Ok(doc_defaults(&content))
}

fn doc_defaults(content: &str) -> DocDefaults {
    let name = content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    let description = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
        .unwrap_or_default()
        .to_string();

    let snippet = first_fenced_body(content).unwrap_or_default();

    DocDefaults {
        name,
        description,
        snippet,
    }
}

fn first_fenced_body(content: &str) -> Option<String> {
    let open = content.find("```")?;
    let after_fence = &content[open + 3..];
    // Skip the language tag line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim().to_string())
}

/// Input for a new skill document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSkill {
    pub name: String,
    pub domain: String,
    pub description: String,
    pub grade: Grade,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub tags: Vec<String>,
    pub snippet: Option<String>,
}

impl NewSkill {
    /// A skill with defaults for everything but the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: "misc".to_string(),
            description: String::new(),
            grade: Grade::B,
            pros: Vec::new(),
            cons: Vec::new(),
            tags: Vec::new(),
            snippet: None,
        }
    }

    /// File name for this skill: lower-cased, spaces become dashes.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.md", slug(&self.name))
    }

    /// Directory under `skills/`; `misc` when the domain slugs to nothing.
    #[must_use]
    pub fn domain_dir(&self) -> String {
        let domain = slug(&self.domain);
        if domain.is_empty() {
            "misc".to_string()
        } else {
            domain
        }
    }
}

/// A single path component: lower-cased, spaces become dashes, separators
/// dropped, no leading or trailing dots.
fn slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| !matches!(c, '/' | '\\' | ':') && !c.is_control())
        .collect();
    slug.trim_matches('.').to_string()
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn yaml_list(items: &[String], fallback: &str) -> String {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return format!("  - {}", quoted(fallback));
    }
    items
        .iter()
        .map(|item| format!("  - {}", quoted(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a new skill document.
#[must_use]
pub fn render_skill(skill: &NewSkill) -> String {
    let mut out = String::new();
    out.push_str(FRONTMATTER_DELIMITER);
    out.push('\n');
    out.push_str(&format!("name: {}\n", quoted(skill.name.trim())));
    out.push_str(&format!("domain: {}\n", quoted(&skill.domain_dir())));
    out.push_str(&format!("description: {}\n", quoted(&skill.description)));
    out.push_str(&format!("grade: {}\n", skill.grade));
    out.push_str(&format!("pros:\n{}\n", yaml_list(&skill.pros, DEFAULT_PRO)));
    out.push_str(&format!("cons:\n{}\n", yaml_list(&skill.cons, DEFAULT_CON)));
    if !skill.tags.is_empty() {
        let tags: Vec<String> = skill.tags.iter().map(|tag| quoted(tag.trim())).collect();
        out.push_str(&format!("tags: [{}]\n", tags.join(", ")));
    }
    out.push_str(FRONTMATTER_DELIMITER);
    out.push('\n');

    out.push_str(&format!("# {}\n\n", skill.name.trim()));
    if !skill.description.is_empty() {
        out.push_str(&format!("{}\n\n", skill.description));
    }
    out.push_str("## Implementation\n\n");
    match skill.snippet.as_deref().map(str::trim) {
        Some(snippet) if !snippet.is_empty() => {
            out.push_str(&format!("```\n{snippet}\n```\n"));
        }
        _ => {
            out.push_str(SNIPPET_PLACEHOLDER);
            out.push('\n');
        }
    }
    out
}

/// Write a new skill to `<library>/skills/<domain>/<slug>.md`.
///
/// An existing file is only replaced when `overwrite` is set.
pub fn write_skill(library: &Path, skill: &NewSkill, overwrite: bool) -> Result<PathBuf> {
    if slug(&skill.name).is_empty() {
        return Err(JaavisError::Parse("skill name is empty".to_string()));
    }
    let dir = library.join("skills").join(skill.domain_dir());
    let path = dir.join(skill.file_name());
    if path.exists() && !overwrite {
        return Err(JaavisError::AlreadyExists(path.display().to_string()));
    }
    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, render_skill(skill))?;
    info!(path = %path.display(), "skill written");
    Ok(path)
}

/// Name sanitized for a harvested deploy file: `[a-zA-Z0-9_-]`, lower-cased.
#[must_use]
pub fn safe_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect::<String>()
        .to_lowercase()
}

/// Render a deploy skill from the steps of a run.
#[must_use]
pub fn harvest_plan<'a, I>(name: &str, steps: I, harvested_at: DateTime<Local>) -> String
where
    I: IntoIterator<Item = &'a CommandStep>,
{
    let commands = steps
        .into_iter()
        .map(|step| step.command.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{FRONTMATTER_DELIMITER}\nname: {}\ndomain: devops\ntags: [deploy]\n{FRONTMATTER_DELIMITER}\n# Deployment: {name}\n> Harvested on {}\n\n## Execution Plan\n{}",
        quoted(name),
        harvested_at.format("%Y-%m-%d %H:%M:%S"),
        render_executable_block(&commands)
    )
}

/// Save the steps of a run as `skills/devops/deploy_<name>.md`.
pub fn save_harvested_deploy<'a, I>(library: &Path, name: &str, steps: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = &'a CommandStep>,
{
    let safe = safe_name(name);
    if safe.is_empty() {
        return Err(JaavisError::Parse(format!(
            "harvest name {name:?} has no usable characters"
        )));
    }
    let dir = library.join("skills").join("devops");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("deploy_{safe}.md"));
    std::fs::write(&path, harvest_plan(name, steps, Local::now()))?;
    info!(path = %path.display(), "deployment harvested");
    Ok(path)
}
