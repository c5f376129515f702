//! Per-project descriptor (`.jaavisrc`) and scaffolding.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{JaavisError, Result};
use crate::skill::Grade;

pub const DESCRIPTOR_FILE: &str = ".jaavisrc";

/// Directories every scaffolded project starts with.
pub const PROJECT_LAYOUT: [&str; 5] = [
    "apps/web",
    "apps/mobile",
    "packages/ui",
    "packages/config",
    "docker",
];

const COMPOSE_PLACEHOLDER: &str =
    "# Jaavis Docker Compose\n# services:\n#   (services will be added here)\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub grade: Grade,
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Local>>,
    /// `blueprint` for projects assembled from a frontend and a backend skill.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

/// What `init` touched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScaffoldReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub descriptor: PathBuf,
}

impl ProjectDescriptor {
    pub fn new(grade: Grade, project_name: impl Into<String>) -> Self {
        Self {
            grade,
            project_name: project_name.into(),
            created_at: Some(Local::now()),
            kind: None,
            frontend: None,
            backend: None,
        }
    }

    /// Read `<dir>/.jaavisrc`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(DESCRIPTOR_FILE);
        if !path.exists() {
            return Err(JaavisError::NotFound(format!(
                "{DESCRIPTOR_FILE} in {} (run `jaavis init`)",
                dir.display()
            )));
        }
        let raw = std::fs::read_to_string(&path)?;
        serde_json::from_str(&raw)
            .map_err(|err| JaavisError::Parse(format!("{}: {err}", path.display())))
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(DESCRIPTOR_FILE);
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, raw)?;
        Ok(path)
    }

    /// Whether the project was assembled from frontend/backend skills.
    #[must_use]
    pub fn is_blueprint(&self) -> bool {
        self.kind.as_deref() == Some(crate::blueprint::BLUEPRINT_KIND)
    }

    /// Scaffold the project layout in `dir` and write the descriptor.
    /// Existing files are left alone; the descriptor is always rewritten.
    pub fn init(dir: &Path, grade: Grade) -> Result<(Self, ScaffoldReport)> {
        let mut report = ScaffoldReport::default();
        for relative in PROJECT_LAYOUT {
            let path = dir.join(relative);
            if path.exists() {
                report.existing.push(relative.to_string());
            } else {
                std::fs::create_dir_all(&path)?;
                report.created.push(relative.to_string());
            }
        }

        let project_name = directory_name(dir);
        write_if_missing(dir, "docker-compose.yml", COMPOSE_PLACEHOLDER, &mut report)?;
        let manifest = serde_json::to_string_pretty(&default_manifest(&project_name))?;
        write_if_missing(dir, "package.json", &manifest, &mut report)?;

        let descriptor = Self::new(grade, project_name);
        report.descriptor = descriptor.save(dir)?;
        info!(grade = %grade, project = %descriptor.project_name, "project initialized");
        Ok((descriptor, report))
    }
}

/// Project name: the directory's own name.
#[must_use]
pub fn directory_name(dir: &Path) -> String {
    let resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    resolved
        .file_name()
        .map_or_else(|| "project".to_string(), |name| name.to_string_lossy().into_owned())
}

fn write_if_missing(
    dir: &Path,
    relative: &str,
    content: &str,
    report: &mut ScaffoldReport,
) -> Result<()> {
    let path = dir.join(relative);
    if path.exists() {
        report.existing.push(relative.to_string());
    } else {
        std::fs::write(&path, content)?;
        report.created.push(relative.to_string());
    }
    Ok(())
}

fn default_manifest(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "version": "1.0.0",
        "scripts": {
            "start": "echo 'Run start script'",
            "build": "echo 'Run build script'",
            "dev": "echo 'Run dev script'",
            "test": "echo 'Tests Passed'",
            "test:e2e": "echo 'E2E Tests Passed'",
            "audit": "echo 'Security Audit Passed'"
        },
        "dependencies": {},
        "devDependencies": {}
    })
}
