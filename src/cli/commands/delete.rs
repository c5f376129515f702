//! jaavis delete - Remove a skill file from the active library

use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::{JaavisError, Result};
use crate::skill::{SkillLookup, find_skill};

use super::confirm;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Skill file name (exact match, `.md` optional)
    pub name: String,

    /// Delete without asking
    #[arg(long, short)]
    pub yes: bool,
}

pub fn run(ctx: &AppContext, args: &DeleteArgs) -> Result<()> {
    let library = ctx.library_path()?;
    // Deletion never acts on a fuzzy match.
    let path = match find_skill(&library, &args.name) {
        SkillLookup::Exact(path) => path,
        SkillLookup::Fuzzy(path) => {
            return Err(JaavisError::NotFound(format!(
                "skill '{}' (did you mean {}?)",
                args.name,
                path.file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default()
            )));
        }
        SkillLookup::NotFound => {
            return Err(JaavisError::NotFound(format!("skill '{}'", args.name)));
        }
    };

    if !args.yes {
        if !ctx.interactive() {
            return Err(JaavisError::Config(
                "refusing to delete without confirmation; pass --yes".to_string(),
            ));
        }
        if !confirm(&format!("Delete {}?", path.display())) {
            eprintln!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    std::fs::remove_file(&path)?;
    info!(path = %path.display(), "skill deleted");

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({ "deleted": path })));
    }
    println!("{} {}", "Deleted".red(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_delete_alias() {
        let cli = crate::cli::Cli::parse_from(["jaavis", "rm", "glass-card", "-y"]);
        if let crate::cli::Commands::Delete(delete) = cli.command {
            assert_eq!(delete.name, "glass-card");
            assert!(delete.yes);
        } else {
            panic!("expected delete command");
        }
    }
}
