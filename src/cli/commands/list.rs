//! jaavis list - List skills in the active library

use std::collections::BTreeMap;

use clap::Args;
use colored::Colorize;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::skill::{SkillEntry, list_skills};

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only show skills in this domain
    #[arg(long, short)]
    pub domain: Option<String>,

    /// Skip the remote update check
    #[arg(long)]
    pub offline: bool,
}

pub fn run(ctx: &mut AppContext, args: &ListArgs) -> Result<()> {
    let library = ctx.library_path()?;
    let skills: Vec<SkillEntry> = list_skills(&library)
        .into_iter()
        .filter(|entry| {
            args.domain
                .as_deref()
                .is_none_or(|domain| entry.domain.eq_ignore_ascii_case(domain))
        })
        .collect();
    debug!(count = skills.len(), library = %library.display(), "skills listed");

    let updates_pending = !args.offline && ctx.updates_pending();

    if ctx.robot_mode {
        let mut response = robot_ok(serde_json::json!({
            "persona": ctx.store.current_persona(),
            "library": library,
            "count": skills.len(),
            "skills": skills,
        }));
        if updates_pending {
            response = response.with_warnings(vec![
                "library is behind its remote; run `jaavis sync`".to_string(),
            ]);
        }
        return emit_robot(&response);
    }

    if updates_pending {
        eprintln!(
            "{}",
            "Updates available for your library. Run `jaavis sync`.".yellow()
        );
    }

    if skills.is_empty() {
        println!(
            "{}",
            "No skills harvested yet. Use `jaavis harvest` to add one.".yellow()
        );
        return Ok(());
    }

    emit_human(layout(&ctx.store.current_persona(), &skills));
    Ok(())
}

fn layout(persona: &str, skills: &[SkillEntry]) -> HumanLayout {
    let mut by_domain: BTreeMap<&str, Vec<&SkillEntry>> = BTreeMap::new();
    for entry in skills {
        by_domain.entry(entry.domain.as_str()).or_default().push(entry);
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Skill library ({persona})"));
    for (domain, entries) in by_domain {
        layout.section(&domain.to_uppercase());
        for entry in entries {
            layout.bullet(&entry.name);
        }
        layout.blank();
    }
    layout.push_line(format!("{} skills", skills.len()));
    layout
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;

    fn entry(domain: &str, name: &str) -> SkillEntry {
        SkillEntry {
            name: name.to_string(),
            path: PathBuf::from(format!("skills/{domain}/{name}")),
            domain: domain.to_string(),
        }
    }

    #[test]
    fn parse_list_alias() {
        let cli = crate::cli::Cli::parse_from(["jaavis", "ls", "--domain", "ui"]);
        if let crate::cli::Commands::List(list) = cli.command {
            assert_eq!(list.domain.as_deref(), Some("ui"));
        } else {
            panic!("expected list command");
        }
    }

    #[test]
    fn layout_groups_by_domain() {
        console::set_colors_enabled(false);
        let skills = vec![
            entry("backend", "auth.md"),
            entry("ui", "glass.md"),
            entry("backend", "rls.md"),
        ];
        let text = layout("programmer", &skills).build();
        let backend = text.find("BACKEND").unwrap();
        let ui = text.find("UI").unwrap();
        assert!(backend < ui);
        assert!(text.contains("- rls.md"));
        assert!(text.ends_with("3 skills"));
    }
}
