//! jaavis apply - Run a skill's executable blocks

use clap::{Args, ValueEnum};
use colored::Colorize;
use tracing::{debug, warn};

use crate::app::AppContext;
use crate::cli::output::{emit_robot, emit_robot_error, robot_ok};
use crate::error::{JaavisError, Result};
use crate::exec::{
    AlwaysAbort, AlwaysSkip, ConsoleObserver, ExecutionEngine, ExecutionReport, FailurePolicy,
    InteractivePolicy, ShellRunner,
};
use crate::plan::{CommandPlan, build_plan, parse_context_pairs, unresolved_placeholders};
use crate::skill::{SkillLookup, find_skill, load_document};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Skill file name or part of it
    pub name: String,

    /// Show the steps without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Placeholder value as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// What to do when a step fails
    #[arg(long, value_enum, default_value_t = OnFailure::Ask)]
    pub on_failure: OnFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnFailure {
    /// Prompt for retry/skip/abort (abort when no terminal)
    Ask,
    Abort,
    Skip,
}

/// Failure policy for `choice`, falling back to abort without a terminal.
pub(crate) fn failure_policy(ctx: &AppContext, choice: OnFailure) -> Box<dyn FailurePolicy> {
    match choice {
        OnFailure::Ask if ctx.interactive() => Box::new(InteractivePolicy::stdin()),
        OnFailure::Ask | OnFailure::Abort => Box::new(AlwaysAbort),
        OnFailure::Skip => Box::new(AlwaysSkip),
    }
}

/// Execute `plan` in the project directory with the configured shell.
pub(crate) fn execute_plan(
    ctx: &AppContext,
    plan: &CommandPlan,
    dry_run: bool,
    on_failure: OnFailure,
) -> Result<ExecutionReport> {
    let shell = ctx.config().execution.shell();
    debug!(%shell, steps = plan.len(), "executing plan");
    let mut runner = ShellRunner::new(shell)?.in_dir(ctx.project_dir.clone());
    let mut policy = failure_policy(ctx, on_failure);
    let engine = ExecutionEngine::new(&mut runner, policy.as_mut()).dry_run(dry_run);
    let mut engine = if ctx.robot_mode {
        engine
    } else {
        engine.with_observer(ConsoleObserver)
    };
    Ok(engine.execute(plan))
}

pub fn run(ctx: &AppContext, args: &ApplyArgs) -> Result<()> {
    let library = ctx.library_path()?;
    let context = parse_context_pairs(&args.set)?;

    let lookup = find_skill(&library, &args.name);
    let path = match &lookup {
        SkillLookup::Exact(path) => path.clone(),
        SkillLookup::Fuzzy(path) => {
            if !ctx.robot_mode {
                eprintln!("{} {}", "Using closest match:".yellow(), path.display());
            }
            path.clone()
        }
        SkillLookup::NotFound => {
            return Err(JaavisError::NotFound(format!(
                "skill '{}' (try `jaavis search`)",
                args.name
            )));
        }
    };
    let document = load_document(&path)?;
    if !ctx.robot_mode {
        eprintln!("{} {}", "Found skill:".cyan().bold(), path.display());
    }

    let plan = build_plan(&document.executable_blocks, &context);
    let unresolved: Vec<String> = plan
        .iter()
        .flat_map(|step| unresolved_placeholders(&step.command, &context))
        .collect();
    for key in &unresolved {
        warn!(placeholder = %key, "placeholder has no value");
    }

    if plan.is_empty() {
        let message = if document.is_executable() {
            "Found executable block but no commands."
        } else {
            "No executable blocks found in this skill."
        };
        if ctx.robot_mode {
            let data = serde_json::json!({
                "skill": path,
                "report": ExecutionReport::default(),
            });
            return emit_robot(&robot_ok(data).with_warnings(vec![message.to_string()]));
        }
        eprintln!("{}", message.yellow());
        return Ok(());
    }

    let report = execute_plan(ctx, &plan, args.dry_run, args.on_failure)?;
    let abort = report.abort_error();

    if ctx.robot_mode {
        let warnings = unresolved
            .iter()
            .map(|key| format!("unresolved placeholder {{{{{key}}}}}"))
            .collect();
        let data = serde_json::json!({
            "skill": path,
            "fuzzy": matches!(lookup, SkillLookup::Fuzzy(_)),
            "dry_run": args.dry_run,
            "report": report,
        });
        return match abort {
            Some(err) => Err(emit_robot_error(data, err)),
            None => emit_robot(&robot_ok(data).with_warnings(warnings)),
        };
    }
    if let Some(err) = abort {
        return Err(err);
    }
    if !args.dry_run {
        eprintln!("\n{}", "Skill applied.".green().bold());
    }
    Ok(())
}
