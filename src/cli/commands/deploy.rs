//! jaavis deploy - Resolve, preview and run a deployment

use std::path::Path;

use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, emit_robot_error, robot_ok};
use crate::deploy::{DeployStrategy, SystemProbe, available_strategies, resolve_strategy};
use crate::error::{JaavisError, Result};
use crate::plan::CommandStep;
use crate::project::ProjectDescriptor;
use crate::skill::save_harvested_deploy;

use super::apply::{OnFailure, execute_plan};
use super::prompt_line;

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Strategy number as listed by --list (1 = standard)
    #[arg(long, short, conflicts_with = "command")]
    pub strategy: Option<usize>,

    /// Run a single custom command instead of a strategy
    #[arg(long)]
    pub command: Option<String>,

    /// List available strategies and exit
    #[arg(long)]
    pub list: bool,

    /// Proceed past pre-flight warnings and confirmation
    #[arg(long, short)]
    pub yes: bool,

    /// Save the executed steps as a reusable deploy skill
    #[arg(long, value_name = "NAME")]
    pub harvest: Option<String>,

    /// Preview only
    #[arg(long)]
    pub dry_run: bool,

    /// What to do when a step fails
    #[arg(long, value_enum, default_value_t = OnFailure::Ask)]
    pub on_failure: OnFailure,
}

enum Confirmation {
    Execute,
    Harvest(String),
    Cancel,
}

pub fn run(ctx: &AppContext, args: &DeployArgs) -> Result<()> {
    let project = ProjectDescriptor::load(&ctx.project_dir)?;
    let library = ctx.active_library()?.path;
    let strategies = available_strategies(&library, project.grade);

    if args.list {
        return list_strategies(ctx, &project, &strategies);
    }

    let strategy = select_strategy(ctx, args, &project, &strategies)?;
    info!(strategy = %strategy, project = %project.project_name, "deploying");

    let probe = SystemProbe::new(&ctx.project_dir);
    let resolution = resolve_strategy(&strategy, &project.project_name, &probe)?;

    if !resolution.warnings.is_empty() {
        if !ctx.robot_mode {
            eprintln!("{}", "Pre-flight warnings:".yellow().bold());
            for warning in &resolution.warnings {
                eprintln!("  - {warning}");
            }
        }
        if !args.yes && !args.dry_run {
            let proceed = ctx.interactive() && super::confirm("Continue anyway?");
            if !proceed {
                return Err(JaavisError::EnvironmentMissing(resolution.warnings.join("; ")));
            }
        }
    } else if !ctx.robot_mode {
        eprintln!("{}", "Pre-flight checks passed".green());
    }

    if resolution.plan.is_empty() {
        if !ctx.robot_mode {
            eprintln!("{}", "No steps defined for this strategy.".yellow());
        }
        return Ok(());
    }

    if !ctx.robot_mode {
        let mut layout = HumanLayout::new();
        layout.title(&format!("Deploying {} ({strategy})", project.project_name));
        for step in &resolution.plan {
            layout.kv(&step.label, &step.command.green().to_string());
        }
        emit_human(layout);
    }

    let mut harvest_name = args.harvest.clone();
    if !args.yes && !args.dry_run {
        match confirm_execution(ctx)? {
            Confirmation::Execute => {}
            Confirmation::Harvest(name) => harvest_name = Some(name),
            Confirmation::Cancel => {
                eprintln!("{}", "Aborted.".red());
                return Ok(());
            }
        }
    }

    let report = execute_plan(ctx, &resolution.plan, args.dry_run, args.on_failure)?;

    let harvested = match &harvest_name {
        Some(name) => {
            // A dry run attempts nothing, so keep the previewed plan instead.
            let steps: Vec<&CommandStep> = if args.dry_run {
                resolution.plan.iter().collect()
            } else {
                report.harvestable_steps()
            };
            harvest(&library, name, &steps, ctx.robot_mode)?
        }
        None => None,
    };

    let abort = report.abort_error();
    if ctx.robot_mode {
        let data = serde_json::json!({
            "project": project,
            "strategy": strategy,
            "plan": resolution.plan,
            "report": report,
            "harvested": harvested,
        });
        return match abort {
            Some(err) => Err(emit_robot_error(data, err)),
            None => emit_robot(&robot_ok(data).with_warnings(resolution.warnings)),
        };
    }
    if let Some(err) = abort {
        return Err(err);
    }
    if !args.dry_run {
        eprintln!("\n{}", "Deployment complete!".green().bold());
    }
    Ok(())
}

fn harvest(
    library: &Path,
    name: &str,
    steps: &[&CommandStep],
    robot_mode: bool,
) -> Result<Option<std::path::PathBuf>> {
    if steps.is_empty() {
        if !robot_mode {
            eprintln!("{}", "Nothing to harvest: no steps ran.".yellow());
        }
        return Ok(None);
    }
    let path = save_harvested_deploy(library, name, steps.iter().copied())?;
    if !robot_mode {
        eprintln!("{} {}", "Saved strategy:".green(), path.display());
    }
    Ok(Some(path))
}

fn list_strategies(
    ctx: &AppContext,
    project: &ProjectDescriptor,
    strategies: &[DeployStrategy],
) -> Result<()> {
    if ctx.robot_mode {
        return emit_robot(&robot_ok(strategies));
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!(
        "Strategies for {} (Grade {} {})",
        project.project_name,
        project.grade,
        project.grade.codename()
    ));
    for (index, strategy) in strategies.iter().enumerate() {
        layout.push_line(format!("  {}. {strategy}", index + 1));
    }
    layout.push_line("  Custom: --command \"<cmd>\"");
    emit_human(layout);
    Ok(())
}

fn select_strategy(
    ctx: &AppContext,
    args: &DeployArgs,
    project: &ProjectDescriptor,
    strategies: &[DeployStrategy],
) -> Result<DeployStrategy> {
    if let Some(command) = &args.command {
        return Ok(DeployStrategy::Manual {
            command: command.clone(),
        });
    }
    if let Some(number) = args.strategy {
        return pick(strategies, number);
    }
    if strategies.len() == 1 || !ctx.interactive() {
        return pick(strategies, 1);
    }

    eprintln!(
        "\n{}",
        format!("Deploying {}", project.project_name).cyan().bold()
    );
    for (index, strategy) in strategies.iter().enumerate() {
        eprintln!("  {}. {strategy}", index + 1);
    }
    eprintln!("  {}. Custom", strategies.len() + 1);

    let answer = prompt_line("? Choose strategy [1]:").unwrap_or_default();
    let number = if answer.is_empty() {
        1
    } else {
        answer.parse().unwrap_or(1)
    };
    if number == strategies.len() + 1 {
        let command = prompt_line("? Command to run:")
            .filter(|command| !command.is_empty())
            .ok_or_else(|| JaavisError::Config("no command given".to_string()))?;
        return Ok(DeployStrategy::Manual { command });
    }
    pick(strategies, number).or_else(|_| pick(strategies, 1))
}

fn pick(strategies: &[DeployStrategy], number: usize) -> Result<DeployStrategy> {
    number
        .checked_sub(1)
        .and_then(|index| strategies.get(index))
        .cloned()
        .ok_or_else(|| {
            JaavisError::NotFound(format!(
                "strategy {number} (choose 1-{})",
                strategies.len()
            ))
        })
}

fn confirm_execution(ctx: &AppContext) -> Result<Confirmation> {
    if !ctx.interactive() {
        return Err(JaavisError::Config(
            "deploy needs confirmation; pass --yes to run unattended".to_string(),
        ));
    }
    loop {
        let Some(answer) = prompt_line("? Ready to execute? [Y]es / [n]o / [h]arvest:") else {
            return Ok(Confirmation::Cancel);
        };
        match answer.to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => return Ok(Confirmation::Execute),
            "n" | "no" => return Ok(Confirmation::Cancel),
            "h" | "harvest" => {
                let name = prompt_line("? Name this strategy (e.g. fast-deploy):")
                    .filter(|name| !name.is_empty());
                return Ok(name.map_or(Confirmation::Execute, Confirmation::Harvest));
            }
            _ => eprintln!("{}", "Please answer y, n or h.".yellow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::skill::Grade;

    #[test]
    fn parse_deploy_args() {
        let cli = crate::cli::Cli::parse_from([
            "jaavis", "deploy", "--strategy", "2", "--yes", "--harvest", "fast",
        ]);
        if let crate::cli::Commands::Deploy(deploy) = cli.command {
            assert_eq!(deploy.strategy, Some(2));
            assert!(deploy.yes);
            assert_eq!(deploy.harvest.as_deref(), Some("fast"));
        } else {
            panic!("expected deploy command");
        }
    }

    #[test]
    fn strategy_and_command_conflict() {
        let result = crate::cli::Cli::try_parse_from([
            "jaavis", "deploy", "--strategy", "1", "--command", "make",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn pick_is_one_based() {
        let strategies = vec![DeployStrategy::Standard { grade: Grade::B }];
        assert_eq!(pick(&strategies, 1).unwrap(), strategies[0]);
        assert!(pick(&strategies, 0).is_err());
        assert!(pick(&strategies, 2).is_err());
    }
}
