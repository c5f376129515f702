//! Selectable deployment strategies.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::plan::{CommandPlan, CommandStep, PlanContext, StepOrigin, build_plan};
use crate::skill::{Grade, list_skills, load_document};

use super::probe::EnvironmentProbe;
use super::resolver::{DeployResolution, resolve};

pub const HARVESTED_PREFIX: &str = "deploy_";
pub const DEPLOY_TAG: &str = "deploy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeployStrategy {
    /// Grade rules for the project.
    Standard { grade: Grade },
    /// A saved deployment skill; bypasses the grade rules.
    Harvested { name: String, path: PathBuf },
    /// A single operator-supplied command.
    Manual { command: String },
}

impl fmt::Display for DeployStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard { grade } => write!(f, "{} (Grade {grade})", grade.infrastructure()),
            Self::Harvested { name, .. } => write!(f, "{name} (Harvested)"),
            Self::Manual { .. } => f.write_str("Custom"),
        }
    }
}

/// Turn `deploy_fast_lane` into `Fast Lane`.
fn display_name(stem: &str) -> String {
    stem.trim_start_matches(HARVESTED_PREFIX)
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The standard strategy followed by every harvested one in the library.
///
/// A harvested strategy is any `deploy_*.md` under `skills/devops` or any
/// document tagged `deploy`.
#[must_use]
pub fn available_strategies(library: &Path, grade: Grade) -> Vec<DeployStrategy> {
    let mut strategies = vec![DeployStrategy::Standard { grade }];
    let mut seen = BTreeSet::new();

    for entry in list_skills(library) {
        let stem = entry.name.trim_end_matches(".md");
        let by_name = entry.domain == "devops" && stem.starts_with(HARVESTED_PREFIX);
        let doc = match load_document(&entry.path) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(path = %entry.path.display(), error = %err, "skipping unreadable skill");
                continue;
            }
        };
        if !(by_name || doc.has_tag(DEPLOY_TAG)) || !seen.insert(entry.path.clone()) {
            continue;
        }
        let name = if by_name {
            display_name(stem)
        } else {
            doc.title.clone()
        };
        strategies.push(DeployStrategy::Harvested {
            name,
            path: entry.path,
        });
    }

    debug!(count = strategies.len(), "deployment strategies discovered");
    strategies
}

/// Resolve any strategy into a plan.
///
/// Harvested plans run with `{{target_dir}}` bound to `.` and carry no
/// pre-flight warnings.
pub fn resolve_strategy(
    strategy: &DeployStrategy,
    project_name: &str,
    probe: &dyn EnvironmentProbe,
) -> Result<DeployResolution> {
    match strategy {
        DeployStrategy::Standard { grade } => Ok(resolve(*grade, project_name, probe)),
        DeployStrategy::Harvested { path, .. } => {
            let doc = load_document(path)?;
            let mut context = PlanContext::new();
            context.insert("target_dir".to_string(), ".".to_string());
            context.insert("project_name".to_string(), project_name.to_string());
            Ok(DeployResolution {
                plan: build_plan(&doc.executable_blocks, &context),
                warnings: Vec::new(),
            })
        }
        DeployStrategy::Manual { command } => Ok(DeployResolution {
            plan: CommandPlan::new(vec![CommandStep::new(
                "Manual Execution",
                command.clone(),
                StepOrigin::Manual,
                0,
            )]),
            warnings: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fakes::FakeProbe;
    use crate::test_utils::fixtures::UnitTestFixture;

    #[test]
    fn display_names() {
        assert_eq!(display_name("deploy_fast_lane"), "Fast Lane");
        assert_eq!(display_name("deploy_k8s-PROD"), "K8s Prod");
    }

    #[test]
    fn discovers_harvested_by_name_and_tag() {
        let fixture = UnitTestFixture::new();
        let _ = fixture.create_file(
            "skills/devops/deploy_fast_lane.md",
            "# Deployment: fast\n<!-- JAAVIS:EXEC -->\n```bash\ncd {{target_dir}}\nnpm run build\n```\n",
        );
        let _ = fixture.create_file(
            "skills/cloud/vercel.md",
            "---\nname: Vercel Push\ntags: [deploy]\n---\n# Vercel\n",
        );
        let _ = fixture.create_file("skills/ui/card.md", "# Card\n");

        let strategies = available_strategies(&fixture.data_path, Grade::B);
        let names: Vec<String> = strategies.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "Docker (Grade B)".to_string(),
                "Vercel Push (Harvested)".to_string(),
                "Fast Lane (Harvested)".to_string(),
            ]
        );
    }

    #[test]
    fn harvested_binds_target_dir() {
        let fixture = UnitTestFixture::new();
        let path = fixture.create_file(
            "skills/devops/deploy_x.md",
            "<!-- JAAVIS:EXEC -->\n```bash\ncd {{target_dir}}\nnpm run build\n```\n",
        );
        let strategy = DeployStrategy::Harvested {
            name: "X".to_string(),
            path,
        };
        let resolution = resolve_strategy(&strategy, "shop", &FakeProbe::healthy()).unwrap();
        let commands: Vec<_> = resolution.plan.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["cd .", "npm run build"]);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn manual_is_a_single_step() {
        let strategy = DeployStrategy::Manual {
            command: "make ship".to_string(),
        };
        let resolution = resolve_strategy(&strategy, "shop", &FakeProbe::healthy()).unwrap();
        assert_eq!(resolution.plan.len(), 1);
        assert_eq!(resolution.plan.steps()[0].origin, StepOrigin::Manual);
    }

    #[test]
    fn missing_harvested_file_is_an_error() {
        let strategy = DeployStrategy::Harvested {
            name: "gone".to_string(),
            path: PathBuf::from("/no/such/deploy_gone.md"),
        };
        assert!(resolve_strategy(&strategy, "shop", &FakeProbe::healthy()).is_err());
    }
}
