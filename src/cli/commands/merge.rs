//! jaavis merge - Assemble a blueprint project from a frontend and a backend skill

use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::blueprint::{
    Candidate, Component, link_backend_compose, load_candidates, mark_blueprint, options,
    pending_components, setup_plan, skill_id,
};
use crate::cli::output::{HumanLayout, emit_human, emit_robot, emit_robot_error, robot_ok};
use crate::error::{JaavisError, Result};
use crate::exec::ExecutionReport;
use crate::plan::build_plan;
use crate::project::{DESCRIPTOR_FILE, ProjectDescriptor};
use crate::skill::{Grade, SkillLookup, find_skill, load_document};

use super::apply::{OnFailure, execute_plan};
use super::{confirm, prompt_line};

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Frontend skill, applied into apps/web
    #[arg(long, value_name = "SKILL")]
    pub frontend: Option<String>,

    /// Backend skill, applied into apps/api
    #[arg(long, value_name = "SKILL", conflicts_with = "no_backend")]
    pub backend: Option<String>,

    /// Frontend only
    #[arg(long)]
    pub no_backend: bool,

    /// Show the steps without running them or touching .jaavisrc
    #[arg(long)]
    pub dry_run: bool,

    /// Apply missing components without asking
    #[arg(long, short)]
    pub yes: bool,

    /// After applying, install frontend dependencies and build containers
    #[arg(long)]
    pub setup: bool,

    /// What to do when a step fails
    #[arg(long, value_enum, default_value_t = OnFailure::Ask)]
    pub on_failure: OnFailure,
}

#[derive(Debug, Serialize)]
struct AppliedComponent {
    component: Component,
    skill: String,
    target_dir: &'static str,
    report: ExecutionReport,
}

#[derive(Debug, Serialize)]
struct MergeOutcome {
    project: ProjectDescriptor,
    frontend: String,
    backend: Option<String>,
    pending: Vec<Component>,
    applied: Vec<AppliedComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    linked_compose: Option<std::path::PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    setup: Option<ExecutionReport>,
}

pub fn run(ctx: &AppContext, args: &MergeArgs) -> Result<()> {
    let library = ctx.library_path()?;
    let dir = &ctx.project_dir;

    let mut project = if dir.join(DESCRIPTOR_FILE).exists() {
        ProjectDescriptor::load(dir)?
    } else if args.dry_run {
        ProjectDescriptor::new(Grade::B, crate::project::directory_name(dir))
    } else {
        if !ctx.robot_mode {
            eprintln!("{}", "Project not initialized; running init first.".yellow());
        }
        ProjectDescriptor::init(dir, Grade::B)?.0
    };

    let candidates = load_candidates(&library);
    if !ctx.robot_mode {
        emit_human(advisor(&candidates));
    }

    let requested = args.frontend.as_deref();
    let frontend = choose(ctx, &library, &candidates, Component::Frontend, requested)?
        .ok_or_else(|| JaavisError::NotFound("frontend skill (tag one `frontend`)".to_string()))?;
    let backend = if args.no_backend {
        None
    } else {
        let requested = args.backend.as_deref();
        choose(ctx, &library, &candidates, Component::Backend, requested)?
    };
    if backend.is_none() && !ctx.robot_mode {
        eprintln!("{}", "No backend skill; merging the frontend only.".yellow());
    }

    mark_blueprint(
        &mut project,
        &frontend.0,
        backend.as_ref().map(|(id, _)| id.as_str()),
    );
    if !args.dry_run {
        project.save(dir)?;
        info!(
            frontend = %frontend.0,
            backend = ?backend.as_ref().map(|(id, _)| id),
            "blueprint saved"
        );
    }

    let mut selected = vec![(Component::Frontend, frontend.clone())];
    if let Some(backend) = &backend {
        selected.push((Component::Backend, backend.clone()));
    }
    let components: Vec<Component> = selected.iter().map(|(component, _)| *component).collect();
    let pending = pending_components(dir, &components);

    let mut outcome = MergeOutcome {
        project,
        frontend: frontend.0.clone(),
        backend: backend.map(|(id, _)| id),
        pending: pending.clone(),
        applied: Vec::new(),
        linked_compose: None,
        setup: None,
    };

    let apply = !pending.is_empty()
        && (args.dry_run || args.yes || (ctx.interactive() && ask_apply(&pending)));
    if apply {
        for (component, (id, path)) in selected.iter().filter(|(c, _)| pending.contains(c)) {
            if !ctx.robot_mode {
                eprintln!(
                    "\n{}",
                    format!("Applying {id} to {}", component.target_dir()).bold()
                );
            }
            let document = load_document(path)?;
            let plan = build_plan(&document.executable_blocks, &component.context());
            let report = execute_plan(ctx, &plan, args.dry_run, args.on_failure)?;
            let abort = report.abort_error();
            outcome.applied.push(AppliedComponent {
                component: *component,
                skill: id.clone(),
                target_dir: component.target_dir(),
                report,
            });
            if let Some(err) = abort {
                return fail(ctx, &outcome, err);
            }
        }

        if args.setup && !args.dry_run {
            outcome.linked_compose = link_backend_compose(dir)?;
            let plan = setup_plan(dir);
            if !plan.is_empty() {
                let report = execute_plan(ctx, &plan, false, args.on_failure)?;
                let abort = report.abort_error();
                outcome.setup = Some(report);
                if let Some(err) = abort {
                    return fail(ctx, &outcome, err);
                }
            }
        }
    }

    if ctx.robot_mode {
        let warnings = if apply {
            Vec::new()
        } else {
            pending
                .iter()
                .map(|c| format!("{} missing ({c}); rerun with --yes", c.target_dir()))
                .collect()
        };
        return emit_robot(&robot_ok(&outcome).with_warnings(warnings));
    }
    emit_human(summary(&outcome, apply));
    Ok(())
}

fn fail(ctx: &AppContext, outcome: &MergeOutcome, err: JaavisError) -> Result<()> {
    if ctx.robot_mode {
        return Err(emit_robot_error(outcome, err));
    }
    Err(err)
}

/// Resolve `requested` by name, or let the operator pick from the options.
/// Without a terminal the strictest-graded option is taken. `None` when
/// nothing fits and nothing was requested.
fn choose(
    ctx: &AppContext,
    library: &std::path::Path,
    candidates: &[Candidate],
    component: Component,
    requested: Option<&str>,
) -> Result<Option<(String, std::path::PathBuf)>> {
    if let Some(name) = requested {
        return match find_skill(library, name) {
            SkillLookup::Exact(path) | SkillLookup::Fuzzy(path) => {
                Ok(Some((skill_id(&path), path)))
            }
            SkillLookup::NotFound => {
                Err(JaavisError::NotFound(format!("{component} skill '{name}'")))
            }
        };
    }

    let choices = options(candidates, component);
    let Some(first) = choices.first() else {
        return Ok(None);
    };
    if choices.len() == 1 || !ctx.interactive() {
        return Ok(Some((first.id.clone(), first.document.path.clone())));
    }

    eprintln!("\n{}", format!("Choose {component}").cyan().bold());
    for (index, candidate) in choices.iter().enumerate() {
        eprintln!("  {}. {}", index + 1, candidate.id);
    }
    let answer = prompt_line("? Number [1]:").unwrap_or_default();
    let index = answer.parse::<usize>().unwrap_or(1).saturating_sub(1);
    let picked = choices.get(index).unwrap_or(first);
    Ok(Some((picked.id.clone(), picked.document.path.clone())))
}

fn ask_apply(pending: &[Component]) -> bool {
    eprintln!("{}", "Blueprint incomplete. Missing components:".yellow());
    for component in pending {
        eprintln!("  - {} ({component})", component.target_dir());
    }
    confirm("Apply skills now?")
}

fn advisor(candidates: &[Candidate]) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title("Tech Stack Advisor");
    for candidate in candidates {
        let document = &candidate.document;
        let grade = document
            .grade
            .map_or_else(|| "-".to_string(), |g| g.to_string());
        layout.kv(&candidate.id, &format!("[{grade}] {}", document.title));
        if !document.description.is_empty() {
            layout.push_line(format!("    {}", document.description.dimmed()));
        }
        if !document.pros.is_empty() {
            layout.push_line(format!("    + {}", document.pros.join(", ").green()));
        }
        if !document.cons.is_empty() {
            layout.push_line(format!("    - {}", document.cons.join(", ").red()));
        }
    }
    layout
}

fn summary(outcome: &MergeOutcome, applied: bool) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title("Blueprint");
    layout.kv("Frontend", &outcome.frontend);
    layout.kv("Backend", outcome.backend.as_deref().unwrap_or("-"));
    if outcome.pending.is_empty() {
        layout.push_line("Blueprint validated. Ready to deploy.".green().to_string());
    } else if applied {
        for item in &outcome.applied {
            let summary = item.report.summary();
            layout.bullet(&format!(
                "{} -> {}: {} ok, {} skipped",
                item.skill, item.target_dir, summary.succeeded, summary.skipped
            ));
        }
        if let Some(linked) = &outcome.linked_compose {
            layout.bullet(&format!("docker-compose.yml includes {}", linked.display()));
        }
        layout.push_line("Merge complete.".green().to_string());
    } else {
        for component in &outcome.pending {
            layout.bullet(&format!("{} missing ({component})", component.target_dir()));
        }
        layout.push_line("Rerun with --yes to apply.".yellow().to_string());
    }
    layout
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_merge_args() {
        let cli = crate::cli::Cli::parse_from([
            "jaavis",
            "merge",
            "--frontend",
            "nextjs",
            "--backend",
            "fastapi",
            "--dry-run",
        ]);
        if let crate::cli::Commands::Merge(merge) = cli.command {
            assert_eq!(merge.frontend.as_deref(), Some("nextjs"));
            assert_eq!(merge.backend.as_deref(), Some("fastapi"));
            assert!(merge.dry_run);
            assert!(!merge.setup);
        } else {
            panic!("expected merge command");
        }
    }

    #[test]
    fn backend_and_no_backend_conflict() {
        let parsed = crate::cli::Cli::try_parse_from([
            "jaavis",
            "merge",
            "--backend",
            "fastapi",
            "--no-backend",
        ]);
        assert!(parsed.is_err());
    }
}
