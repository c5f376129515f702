//! jaavis search - Search skill contents

use std::path::Path;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;
use crate::skill::search_skills;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for (case-insensitive)
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let library = ctx.library_path()?;
    let mut matches = search_skills(&library, &args.query)?;
    let total = matches.len();
    matches.truncate(args.limit);

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "query": args.query,
            "total": total,
            "matches": matches,
        })));
    }

    if matches.is_empty() {
        println!("{}", format!("No skills mention '{}'.", args.query).yellow());
        return Ok(());
    }
    println!(
        "{}",
        format!("Found {total} skill(s) matching '{}':", args.query)
            .cyan()
            .bold()
    );
    for path in &matches {
        println!("  {}", relative(&library, path));
    }
    if total > matches.len() {
        println!("  ... and {} more (use --limit)", total - matches.len());
    }
    Ok(())
}

fn relative(library: &Path, path: &Path) -> String {
    path.strip_prefix(library)
        .unwrap_or(path)
        .display()
        .to_string()
}
