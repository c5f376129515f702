//! Grade rules: pre-flight warnings and the standard deployment steps.

use serde::Serialize;
use tracing::debug;

use crate::plan::{CommandPlan, CommandStep, StepOrigin};
use crate::skill::Grade;

use super::probe::EnvironmentProbe;

/// Files that mark the project as having a dependency manifest.
pub const MANIFEST_FILE: &str = "package.json";
/// Present once the Supabase project has been linked locally.
pub const SUPABASE_LINK_FILE: &str = "supabase/config.toml";

/// A resolved plan plus advisory warnings. Warnings never block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployResolution {
    pub plan: CommandPlan,
    pub warnings: Vec<String>,
}

/// Advisory checks for `grade`.
#[must_use]
pub fn preflight(grade: Grade, probe: &dyn EnvironmentProbe) -> Vec<String> {
    let mut warnings = Vec::new();

    if !probe.file_exists(MANIFEST_FILE) {
        warnings.push(format!("No dependency manifest found ({MANIFEST_FILE})"));
    }
    if !probe.has_tool("npm") {
        warnings.push("NPM not installed".to_string());
    }

    match grade {
        Grade::B => {
            if !probe.has_tool("docker") {
                warnings.push("Docker not installed".to_string());
            }
        }
        Grade::A => {
            if !probe.has_tool("kubectl") {
                warnings.push("Kubectl not installed".to_string());
            } else if !probe.cluster_reachable() {
                warnings.push("Kubectl cannot reach a live cluster".to_string());
            }
        }
        Grade::C => {}
    }

    if matches!(grade, Grade::A | Grade::B) && !probe.file_exists(SUPABASE_LINK_FILE) {
        warnings.push(format!(
            "Supabase project probably not linked (check {SUPABASE_LINK_FILE})"
        ));
    }

    warnings
}

/// Audit steps, chosen by lockfile. The order of the checks matters: a
/// project may carry several lockfiles and the first match wins.
#[must_use]
pub fn audit_steps(probe: &dyn EnvironmentProbe) -> Vec<(&'static str, &'static str)> {
    if probe.file_exists("pnpm-lock.yaml") {
        return vec![("Security Audit", "pnpm audit")];
    }
    if probe.file_exists("bun.lockb") || probe.file_exists("bun.lock") {
        return vec![("Security Audit", "bun audit || npm audit")];
    }
    if probe.file_exists("yarn.lock") {
        return vec![("Security Audit", "yarn audit")];
    }
    // npm audit refuses to run without a lockfile.
    if probe.file_exists("package-lock.json") {
        vec![("Security Audit", "npm audit")]
    } else {
        vec![
            ("Generating lockfile", "npm install --package-lock-only"),
            ("Security Audit", "npm audit"),
        ]
    }
}

/// Standard steps for `grade`.
#[must_use]
pub fn standard_steps(
    grade: Grade,
    project_name: &str,
    probe: &dyn EnvironmentProbe,
) -> Vec<(String, String)> {
    let owned = |pairs: &[(&str, &str)]| -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(label, cmd)| ((*label).to_string(), (*cmd).to_string()))
            .collect()
    };

    match grade {
        Grade::C => vec![
            ("Building Project".to_string(), "npm run build".to_string()),
            (
                "Launching Background Service".to_string(),
                format!("screen -dmS {} npm run start", session_name(project_name)),
            ),
            ("Start Dev Server".to_string(), "npm run dev".to_string()),
        ],
        Grade::B => owned(&[
            ("Running Unit Tests", "npm test"),
            ("Building Containers", "docker compose build"),
            ("Deploying Services", "docker compose up -d"),
            ("Pushing DB Schema", "npx supabase db push"),
        ]),
        Grade::A => {
            let mut steps = owned(&[("Running E2E Tests", "npm run test:e2e")]);
            steps.extend(owned(&audit_steps(probe)));
            steps.extend(owned(&[
                ("Applying K8s Manifests", "kubectl apply -f k8s/"),
                ("Migrating DB", "npx supabase migration up"),
            ]));
            steps
        }
    }
}

/// Detached session names must be a single shell word.
fn session_name(project_name: &str) -> String {
    let name: String = project_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '-' })
        .collect();
    if name.is_empty() { "jaavis".to_string() } else { name }
}

/// Resolve the standard plan for `grade` with its pre-flight warnings.
#[must_use]
pub fn resolve(grade: Grade, project_name: &str, probe: &dyn EnvironmentProbe) -> DeployResolution {
    let warnings = preflight(grade, probe);
    let steps = standard_steps(grade, project_name, probe)
        .into_iter()
        .map(|(label, command)| CommandStep::new(label, command, StepOrigin::Standard, 0))
        .collect();
    debug!(%grade, warnings = warnings.len(), "deployment resolved");
    DeployResolution {
        plan: CommandPlan::new(steps),
        warnings,
    }
}
