//! jaavis init - Scaffold the current project and write .jaavisrc

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{JaavisError, Result};
use crate::project::{DESCRIPTOR_FILE, ProjectDescriptor};
use crate::skill::Grade;

use super::prompt_line;

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Project grade: A (Kubernetes), B (Docker) or C (serverless)
    #[arg(long, short)]
    pub grade: Option<Grade>,

    /// Re-initialize a project that already has a descriptor
    #[arg(long, short)]
    pub force: bool,
}

pub fn run(ctx: &AppContext, args: &InitArgs) -> Result<()> {
    let dir = &ctx.project_dir;
    if dir.join(DESCRIPTOR_FILE).exists() && !args.force {
        return Err(JaavisError::AlreadyExists(format!(
            "{DESCRIPTOR_FILE} in {} (use --force to re-initialize)",
            dir.display()
        )));
    }

    let grade = match args.grade {
        Some(grade) => grade,
        None if ctx.interactive() => ask_grade(),
        None => Grade::B,
    };
    let (descriptor, report) = ProjectDescriptor::init(dir, grade)?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "project": descriptor,
            "scaffold": report,
        })));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!(
        "Initialized {} (Grade {grade} {})",
        descriptor.project_name,
        grade.codename()
    ));
    layout.kv("Infrastructure", grade.infrastructure());
    layout.kv("Descriptor", &report.descriptor.display().to_string());
    for created in &report.created {
        layout.bullet(&format!("{} {created}", "created".green()));
    }
    for existing in &report.existing {
        layout.bullet(&format!("{} {existing}", "exists ".dimmed()));
    }
    emit_human(layout);
    Ok(())
}

fn ask_grade() -> Grade {
    for grade in [Grade::A, Grade::B, Grade::C] {
        eprintln!(
            "  {grade}. {} ({})",
            grade.codename(),
            grade.infrastructure()
        );
    }
    prompt_line("? Project grade [B]:")
        .and_then(|answer| answer.parse().ok())
        .unwrap_or(Grade::B)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_init_grade() {
        let cli = crate::cli::Cli::parse_from(["jaavis", "init", "--grade", "C"]);
        if let crate::cli::Commands::Init(init) = cli.command {
            assert_eq!(init.grade, Some(Grade::C));
            assert!(!init.force);
        } else {
            panic!("expected init command");
        }
    }

    #[test]
    fn invalid_grade_is_rejected() {
        assert!(crate::cli::Cli::try_parse_from(["jaavis", "init", "--grade", "Z"]).is_err());
    }
}
