//! jaavis persona - Manage personas and their libraries

use std::path::PathBuf;

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{JaavisError, Result};
use crate::library::{
    LibraryRecord, LibraryStore, PersonaSummary, add_persona, delete_persona, list_personas,
    rename_persona, toggle_lock, use_persona,
};

use super::confirm;

#[derive(Args, Debug)]
pub struct PersonaArgs {
    #[command(subcommand)]
    pub command: PersonaCommand,
}

#[derive(Subcommand, Debug)]
pub enum PersonaCommand {
    /// List personas and their libraries
    List,

    /// Register a new persona
    Add {
        name: String,

        /// Library location (default: library_<name> in the data dir)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Git remote to sync the library with
        #[arg(long)]
        remote: Option<String>,
    },

    /// Rename a persona
    Rename { old: String, new: String },

    /// Lock or unlock a persona against rename and delete
    Lock { name: String },

    /// Forget a persona and, unless --keep-files, remove its library
    Delete {
        name: String,

        #[arg(long, short)]
        yes: bool,

        #[arg(long)]
        keep_files: bool,
    },

    /// Switch the active persona
    Use { name: String },
}

pub fn run(ctx: &mut AppContext, args: &PersonaArgs) -> Result<()> {
    match &args.command {
        PersonaCommand::List => list(ctx),
        PersonaCommand::Add { name, path, remote } => {
            let mut record = add_persona(&mut ctx.store, name, path.as_deref())?;
            if let Some(url) = remote {
                ctx.store.set_remote(&record.name, url)?;
                record.remote_url = Some(url.clone());
            }
            done(ctx, &record, &format!("Added persona '{}'", record.name))
        }
        PersonaCommand::Rename { old, new } => {
            let record = rename_persona(&mut ctx.store, old, new)?;
            done(ctx, &record, &format!("Renamed '{old}' to '{}'", record.name))
        }
        PersonaCommand::Lock { name } => {
            let locked = toggle_lock(&mut ctx.store, name)?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({ "name": name, "locked": locked })));
            }
            let state = if locked { "locked" } else { "unlocked" };
            println!("{}", format!("Persona '{name}' {state}").green());
            Ok(())
        }
        PersonaCommand::Delete {
            name,
            yes,
            keep_files,
        } => delete(ctx, name, *yes, *keep_files),
        PersonaCommand::Use { name } => {
            let record = use_persona(&mut ctx.store, name)?;
            done(ctx, &record, &format!("Now using '{}'", record.name))
        }
    }
}

fn done(ctx: &AppContext, record: &LibraryRecord, message: &str) -> Result<()> {
    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "name": record.name,
            "path": record.path,
            "remote_url": record.remote_url,
            "locked": record.locked,
        })));
    }
    println!("{} {}", message.green(), record.path.display().to_string().dimmed());
    Ok(())
}

fn list(ctx: &AppContext) -> Result<()> {
    let personas = list_personas(&ctx.store);
    if ctx.robot_mode {
        return emit_robot(&robot_ok(&personas));
    }
    emit_human(layout(&personas));
    Ok(())
}

fn layout(personas: &[PersonaSummary]) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title("Personas");
    for persona in personas {
        let mut flags = Vec::new();
        if persona.active {
            flags.push("active");
        }
        if persona.locked {
            flags.push("locked");
        }
        if !persona.exists {
            flags.push("not on disk");
        }
        let marker = if persona.active { "*" } else { " " };
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        layout.push_line(format!("{marker} {}{suffix}", persona.name));
        layout.kv("    path", &persona.path.display().to_string());
        if let Some(url) = &persona.remote_url {
            layout.kv("    remote", url);
        }
    }
    layout
}

fn delete(ctx: &mut AppContext, name: &str, yes: bool, keep_files: bool) -> Result<()> {
    let record = ctx.store.record(name)?;
    let remove_files = !keep_files && record.path.exists();
    if !yes {
        if !ctx.interactive() {
            return Err(JaavisError::Config(
                "refusing to delete a persona without confirmation; pass --yes".to_string(),
            ));
        }
        let question = if remove_files {
            format!(
                "Delete persona '{name}' and its library at {}?",
                record.path.display()
            )
        } else {
            format!("Delete persona '{name}'?")
        };
        if !confirm(&question) {
            eprintln!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }
    let record = delete_persona(&mut ctx.store, name, remove_files)?;
    done(ctx, &record, &format!("Deleted persona '{name}'"))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_persona_alias_and_subcommands() {
        let cli = crate::cli::Cli::parse_from([
            "jaavis", "p", "add", "designer", "--remote", "git@host:me/skills.git",
        ]);
        if let crate::cli::Commands::Persona(persona) = cli.command {
            if let PersonaCommand::Add { name, remote, path } = persona.command {
                assert_eq!(name, "designer");
                assert_eq!(remote.as_deref(), Some("git@host:me/skills.git"));
                assert!(path.is_none());
            } else {
                panic!("expected add subcommand");
            }
        } else {
            panic!("expected persona command");
        }
    }

    #[test]
    fn parse_delete_flags() {
        let cli = crate::cli::Cli::parse_from([
            "jaavis", "persona", "delete", "old", "--yes", "--keep-files",
        ]);
        if let crate::cli::Commands::Persona(persona) = cli.command {
            assert!(matches!(
                persona.command,
                PersonaCommand::Delete { yes: true, keep_files: true, .. }
            ));
        } else {
            panic!("expected persona command");
        }
    }

    #[test]
    fn layout_marks_active_and_locked() {
        console::set_colors_enabled(false);
        let personas = vec![PersonaSummary {
            name: "programmer".to_string(),
            path: PathBuf::from("/data/library"),
            remote_url: None,
            locked: true,
            active: true,
            exists: true,
        }];
        let text = layout(&personas).build();
        assert!(text.contains("* programmer (active, locked)"));
    }
}
