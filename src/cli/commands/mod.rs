//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod apply;
pub mod delete;
pub mod deploy;
pub mod doctor;
pub mod harvest;
pub mod init;
pub mod list;
pub mod merge;
pub mod persona;
pub mod search;
pub mod show;
pub mod sync;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the executable blocks of a skill
    Apply(apply::ApplyArgs),

    /// Deploy the current project by grade or harvested strategy
    Deploy(deploy::DeployArgs),

    /// Combine a frontend and a backend skill into a blueprint project
    Merge(merge::MergeArgs),

    /// Pull persona libraries from their remotes
    Sync(sync::SyncArgs),

    /// Commit and push persona libraries
    Push(sync::PushArgs),

    /// List skills in the active library
    #[command(visible_alias = "ls")]
    List(list::ListArgs),

    /// Search skill contents
    Search(search::SearchArgs),

    /// Show a skill's metadata and executable blocks
    Show(show::ShowArgs),

    /// Create a skill from the template or a markdown doc
    #[command(visible_alias = "new")]
    Harvest(harvest::HarvestArgs),

    /// Delete a skill file
    #[command(visible_alias = "rm")]
    Delete(delete::DeleteArgs),

    /// Manage personas and their libraries
    #[command(visible_alias = "p")]
    Persona(persona::PersonaArgs),

    /// Scaffold the current project and write .jaavisrc
    Init(init::InitArgs),

    /// Check tools, project config and integrations
    #[command(visible_alias = "chk")]
    Doctor(doctor::DoctorArgs),
}

/// Dispatch a command to its handler
pub fn run(ctx: &mut AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Apply(args) => apply::run(ctx, args),
        Commands::Deploy(args) => deploy::run(ctx, args),
        Commands::Merge(args) => merge::run(ctx, args),
        Commands::Sync(args) => sync::run_sync(ctx, args),
        Commands::Push(args) => sync::run_push(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Search(args) => search::run(ctx, args),
        Commands::Show(args) => show::run(ctx, args),
        Commands::Harvest(args) => harvest::run(ctx, args),
        Commands::Delete(args) => delete::run(ctx, args),
        Commands::Persona(args) => persona::run(ctx, args),
        Commands::Init(args) => init::run(ctx, args),
        Commands::Doctor(args) => doctor::run(ctx, args),
    }
}

/// Yes/no question on stderr; EOF means no.
pub(crate) fn confirm(question: &str) -> bool {
    prompt_line(&format!("{question} (y/N):")).is_some_and(|answer| {
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    })
}

/// One trimmed line from stdin after printing `question` on stderr.
pub(crate) fn prompt_line(question: &str) -> Option<String> {
    use std::io::{BufRead, Write};

    use colored::Colorize;

    eprint!("{} ", question.cyan());
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}
