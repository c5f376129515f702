//! jaavis harvest - Create a skill from flags, prompts or an existing doc

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::{JaavisError, Result};
use crate::skill::{DocDefaults, Grade, NewSkill, parse_markdown_doc, write_skill};

use super::prompt_line;

#[derive(Args, Debug, Default)]
pub struct HarvestArgs {
    /// Skill name (prompted for when omitted on a terminal)
    #[arg(long, short)]
    pub name: Option<String>,

    /// Prefill name, description and snippet from a markdown file
    #[arg(long, value_name = "FILE")]
    pub doc: Option<PathBuf>,

    /// Domain folder under skills/
    #[arg(long, short)]
    pub domain: Option<String>,

    /// Grade the skill targets: A, B or C
    #[arg(long, short)]
    pub grade: Option<Grade>,

    #[arg(long)]
    pub description: Option<String>,

    /// Advantage (repeatable)
    #[arg(long = "pro", value_name = "TEXT")]
    pub pros: Vec<String>,

    /// Drawback (repeatable)
    #[arg(long = "con", value_name = "TEXT")]
    pub cons: Vec<String>,

    /// Tag (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Replace an existing skill with the same name
    #[arg(long, short)]
    pub force: bool,
}

pub fn run(ctx: &AppContext, args: &HarvestArgs) -> Result<()> {
    let library = ctx.library_path()?;
    let defaults = match &args.doc {
        Some(doc) => parse_markdown_doc(doc)?,
        None => DocDefaults::default(),
    };
    let skill = collect(ctx, args, defaults)?;
    let path = write_skill(&library, &skill, args.force)?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "name": skill.name,
            "domain": skill.domain,
            "path": path,
        })));
    }
    println!("{} {}", "Skill saved:".green().bold(), path.display());
    Ok(())
}

/// Merge flags over doc defaults, prompting for whatever is still missing
/// when a terminal is attached.
fn collect(ctx: &AppContext, args: &HarvestArgs, defaults: DocDefaults) -> Result<NewSkill> {
    let interactive = ctx.interactive();
    let ask = |question: &str, fallback: &str| -> String {
        if !interactive {
            return fallback.to_string();
        }
        let hint = if fallback.is_empty() {
            String::new()
        } else {
            format!(" [{fallback}]")
        };
        prompt_line(&format!("? {question}{hint}:"))
            .filter(|answer| !answer.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    };

    let name = match &args.name {
        Some(name) => name.clone(),
        None => ask("Skill name", &defaults.name),
    };
    if name.trim().is_empty() {
        return Err(JaavisError::Config(
            "a skill name is required (pass --name or use --doc)".to_string(),
        ));
    }

    let mut skill = NewSkill::named(name);
    skill.domain = match &args.domain {
        Some(domain) => domain.clone(),
        None => ask("Domain (e.g. ui, backend, devops)", &skill.domain),
    };
    skill.description = match &args.description {
        Some(description) => description.clone(),
        None => ask("Description", &defaults.description),
    };
    skill.grade = match args.grade {
        Some(grade) => grade,
        None => ask("Grade (A/B/C)", "B").parse().unwrap_or(Grade::B),
    };
    skill.pros = if args.pros.is_empty() && interactive {
        split_answer(&ask("Pros (comma separated)", ""))
    } else {
        args.pros.clone()
    };
    skill.cons = if args.cons.is_empty() && interactive {
        split_answer(&ask("Cons (comma separated)", ""))
    } else {
        args.cons.clone()
    };
    skill.tags.clone_from(&args.tags);
    if !defaults.snippet.is_empty() {
        skill.snippet = Some(defaults.snippet);
    }
    Ok(skill)
}

fn split_answer(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
