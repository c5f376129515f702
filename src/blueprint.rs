//! Blueprint projects: one frontend skill and one backend skill applied into
//! `apps/web` and `apps/api` of the same project.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::plan::{CommandPlan, PlanContext, StepOrigin};
use crate::project::ProjectDescriptor;
use crate::skill::{SkillDocument, list_skills, load_document};

pub const BLUEPRINT_KIND: &str = "blueprint";

/// Backend compose files, in lookup order.
const BACKEND_COMPOSE_FILES: [&str; 2] = ["apps/api/compose.yaml", "apps/api/docker-compose.yml"];
const ROOT_COMPOSE_FILES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Frontend,
    Backend,
}

impl Component {
    /// Directory the component's skill is applied into.
    #[must_use]
    pub const fn target_dir(self) -> &'static str {
        match self {
            Self::Frontend => "apps/web",
            Self::Backend => "apps/api",
        }
    }

    /// Tag that marks a skill as a candidate.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
        }
    }

    /// Domains searched when no skill carries the tag.
    #[must_use]
    pub const fn fallback_domains(self) -> &'static [&'static str] {
        match self {
            Self::Frontend => &["frontend", "ui"],
            Self::Backend => &["devops", "backend", "qowi"],
        }
    }

    /// Placeholder values for applying this component's skill.
    #[must_use]
    pub fn context(self) -> PlanContext {
        PlanContext::from([("target_dir".to_string(), self.target_dir().to_string())])
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A library skill considered for a blueprint.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// File stem; what `.jaavisrc` records.
    pub id: String,
    pub document: SkillDocument,
}

/// Every readable skill in `library`, strictest grade first, ungraded last.
#[must_use]
pub fn load_candidates(library: &Path) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = list_skills(library)
        .into_iter()
        .filter_map(|entry| match load_document(&entry.path) {
            Ok(document) => Some(Candidate {
                id: skill_id(&entry.path),
                document,
            }),
            Err(err) => {
                debug!(path = %entry.path.display(), error = %err, "skipping unreadable skill");
                None
            }
        })
        .collect();
    candidates.sort_by(|a, b| {
        let rank = |c: &Candidate| c.document.grade.map_or(u8::MAX, |g| g.rank());
        rank(a).cmp(&rank(b)).then_with(|| a.id.cmp(&b.id))
    });
    candidates
}

/// Candidates tagged for `component`, or failing that, those in its
/// fallback domains.
#[must_use]
pub fn options(candidates: &[Candidate], component: Component) -> Vec<&Candidate> {
    let tagged: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.document.has_tag(component.tag()))
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }
    candidates
        .iter()
        .filter(|c| {
            component
                .fallback_domains()
                .iter()
                .any(|domain| c.document.domain.eq_ignore_ascii_case(domain))
        })
        .collect()
}

#[must_use]
pub fn skill_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Record the chosen skills in the descriptor.
pub fn mark_blueprint(
    descriptor: &mut ProjectDescriptor,
    frontend: &str,
    backend: Option<&str>,
) {
    descriptor.kind = Some(BLUEPRINT_KIND.to_string());
    descriptor.frontend = Some(frontend.to_string());
    if let Some(backend) = backend {
        descriptor.backend = Some(backend.to_string());
    }
}

/// Components whose target directory is missing or still empty.
#[must_use]
pub fn pending_components(dir: &Path, components: &[Component]) -> Vec<Component> {
    components
        .iter()
        .copied()
        .filter(|component| is_empty_dir(&dir.join(component.target_dir())))
        .collect()
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).map_or(true, |mut entries| entries.next().is_none())
}

/// Point the root compose file at the backend's compose file.
/// Returns the linked file, or `None` when the backend has none.
pub fn link_backend_compose(dir: &Path) -> Result<Option<PathBuf>> {
    let Some(backend) = BACKEND_COMPOSE_FILES
        .iter()
        .find(|relative| dir.join(relative).is_file())
    else {
        return Ok(None);
    };
    let content = format!("# Jaavis Docker Compose\n# Root orchestrator\ninclude:\n  - {backend}\n");
    std::fs::write(dir.join(ROOT_COMPOSE_FILES[0]), content)?;
    info!(backend = %backend, "linked backend compose file");
    Ok(Some(PathBuf::from(backend)))
}

/// Post-merge setup: install frontend dependencies, build containers.
#[must_use]
pub fn setup_plan(dir: &Path) -> CommandPlan {
    let mut commands = Vec::new();
    if dir.join("apps/web/package.json").is_file() {
        commands.push(("Install frontend", "cd apps/web && npm install"));
    }
    if ROOT_COMPOSE_FILES.iter().any(|name| dir.join(name).is_file()) {
        commands.push(("Build containers", "docker compose build"));
    }
    CommandPlan::from_commands(&commands, StepOrigin::Standard)
}
