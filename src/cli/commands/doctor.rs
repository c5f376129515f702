//! jaavis doctor - Check tools, project config and integrations

use std::path::Path;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, emit_robot_error, robot_partial};
use crate::deploy::{EnvironmentProbe, SystemProbe};
use crate::error::{JaavisError, Result};
use crate::project::{DESCRIPTOR_FILE, ProjectDescriptor};

const REQUIRED_TOOLS: [&str; 3] = ["git", "node", "npm"];

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Also check optional deploy tooling (docker, kubectl, vercel, supabase)
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckGroup {
    Tools,
    Config,
    Integrations,
    Library,
}

impl CheckGroup {
    const fn title(self) -> &'static str {
        match self {
            Self::Tools => "Tools",
            Self::Config => "Configuration",
            Self::Integrations => "Integrations",
            Self::Library => "Library",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub group: CheckGroup,
    pub name: String,
    pub passed: bool,
    /// A failed required check makes the whole run unhealthy.
    pub required: bool,
}

impl Check {
    fn new(group: CheckGroup, name: impl Into<String>, passed: bool, required: bool) -> Self {
        Self {
            group,
            name: name.into(),
            passed,
            required,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<Check>,
}

impl DoctorReport {
    #[must_use]
    pub fn healthy(&self) -> bool {
        self.checks.iter().all(|check| check.passed || !check.required)
    }

    fn failed_required(&self) -> usize {
        self.checks
            .iter()
            .filter(|check| check.required && !check.passed)
            .count()
    }
}

/// Run every check against `probe`. `project` is the parsed descriptor when
/// one could be read; blueprint projects also need their app directories.
pub fn diagnose(
    probe: &dyn EnvironmentProbe,
    project: Option<&ProjectDescriptor>,
    library: Option<&Path>,
    full: bool,
) -> DoctorReport {
    let mut checks = Vec::new();

    for tool in REQUIRED_TOOLS {
        checks.push(Check::new(CheckGroup::Tools, tool, probe.has_tool(tool), true));
    }
    if full {
        for tool in ["docker", "kubectl", "vercel", "supabase"] {
            checks.push(Check::new(CheckGroup::Tools, tool, probe.has_tool(tool), false));
        }
    }

    checks.push(Check::new(
        CheckGroup::Config,
        DESCRIPTOR_FILE,
        probe.file_exists(DESCRIPTOR_FILE),
        true,
    ));
    checks.push(Check::new(CheckGroup::Config, ".env", probe.file_exists(".env"), false));

    checks.push(Check::new(
        CheckGroup::Integrations,
        "Vercel linked",
        probe.file_exists(".vercel"),
        false,
    ));
    checks.push(Check::new(
        CheckGroup::Integrations,
        "Supabase linked",
        probe.file_exists("supabase/config.toml") || probe.file_exists("supabase/config.json"),
        false,
    ));

    if let Some(project) = project.filter(|project| project.is_blueprint()) {
        if project.frontend.is_some() {
            checks.push(Check::new(
                CheckGroup::Integrations,
                "Frontend (blueprint)",
                probe.file_exists("apps/web"),
                true,
            ));
        }
        if project.backend.is_some() {
            checks.push(Check::new(
                CheckGroup::Integrations,
                "Backend (blueprint)",
                probe.file_exists("apps/api"),
                true,
            ));
        }
    }

    checks.push(Check::new(
        CheckGroup::Library,
        "Active library",
        library.is_some_and(Path::is_dir),
        false,
    ));

    DoctorReport { checks }
}

pub fn run(ctx: &AppContext, args: &DoctorArgs) -> Result<()> {
    let probe = SystemProbe::new(&ctx.project_dir);
    // A malformed descriptor still counts as present; only blueprint checks need it parsed.
    let project = ProjectDescriptor::load(&ctx.project_dir).ok();
    let library = ctx.active_library().ok().map(|record| record.path);
    let report = diagnose(&probe, project.as_ref(), library.as_deref(), args.full);

    let failed = report.failed_required();
    let outcome = if report.healthy() {
        None
    } else {
        Some(JaavisError::EnvironmentMissing(format!(
            "{failed} required check(s) failed"
        )))
    };

    if ctx.robot_mode {
        let missing = report.checks.iter().filter(|check| !check.passed).count();
        return match outcome {
            Some(err) => Err(emit_robot_error(&report, err)),
            None => emit_robot(&robot_partial(
                &report,
                report.checks.len() - missing,
                missing,
            )),
        };
    }

    emit_human(layout(&report));
    outcome.map_or(Ok(()), Err)
}

fn layout(report: &DoctorReport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title("Jaavis Doctor");
    let groups = [
        CheckGroup::Tools,
        CheckGroup::Config,
        CheckGroup::Integrations,
        CheckGroup::Library,
    ];
    for group in groups {
        let checks: Vec<&Check> = report
            .checks
            .iter()
            .filter(|check| check.group == group)
            .collect();
        if checks.is_empty() {
            continue;
        }
        layout.section(group.title());
        for check in checks {
            let status = match (check.passed, check.required) {
                (true, _) => "ok".green(),
                (false, true) => "missing".red(),
                (false, false) => "missing".yellow(),
            };
            layout.kv(&format!("  {}", check.name), &status.to_string());
        }
        layout.blank();
    }
    if report.healthy() {
        layout.push_line("System healthy. Ready to deploy.".green().to_string());
    } else {
        layout.push_line(
            "Issues detected. Run `jaavis init` or install missing tools."
                .yellow()
                .to_string(),
        );
    }
    layout
}
