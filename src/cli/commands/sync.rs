//! jaavis sync / push - Reconcile persona libraries with their remotes

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, emit_robot_error, robot_ok};
use crate::error::{JaavisError, Result, VcsError, VcsErrorKind};
use crate::library::{
    AutoPrompt, BatchSummary, Direction, GitClient, InteractivePrompt, LibraryAction,
    ReconcilePrompt, Reconciler, RecordStatus, Selection,
};

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Persona to sync (default: the active one)
    #[arg(value_name = "PERSONA", conflicts_with = "all")]
    pub persona: Option<String>,

    /// Sync every persona library
    #[arg(long)]
    pub all: bool,

    /// Answer prompts automatically: initialize, stash dirty work
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args, Debug, Default)]
pub struct PushArgs {
    /// Persona to push (default: the active one)
    #[arg(value_name = "PERSONA", conflicts_with = "all")]
    pub persona: Option<String>,

    /// Push every persona library
    #[arg(long)]
    pub all: bool,

    /// Commit message for pending changes
    #[arg(long, short)]
    pub message: Option<String>,

    /// Answer prompts automatically
    #[arg(long, short)]
    pub yes: bool,
}

pub fn run_sync(ctx: &mut AppContext, args: &SyncArgs) -> Result<()> {
    let selection = selection(ctx, args.persona.as_deref(), args.all);
    let summary = reconcile(ctx, &selection, Direction::Pull, args.yes, None);

    let active = ctx.store.current_persona();
    let active_synced = summary.reports.iter().any(|report| {
        report.name == active
            && matches!(
                report.status,
                RecordStatus::Synced | RecordStatus::UpToDate | RecordStatus::Cloned
            )
    });
    if active_synced {
        ctx.clear_updates_pending()?;
    }

    finish(ctx, "Sync Report", &summary)
}

pub fn run_push(ctx: &mut AppContext, args: &PushArgs) -> Result<()> {
    let selection = selection(ctx, args.persona.as_deref(), args.all);
    let summary = reconcile(
        ctx,
        &selection,
        Direction::Push,
        args.yes,
        args.message.as_deref(),
    );
    finish(ctx, "Push Report", &summary)
}

fn selection(ctx: &AppContext, persona: Option<&str>, all: bool) -> Selection {
    if all {
        Selection::All
    } else {
        Selection::One(persona.map_or_else(|| ctx.store.current_persona(), String::from))
    }
}

fn reconcile(
    ctx: &mut AppContext,
    selection: &Selection,
    direction: Direction,
    yes: bool,
    message: Option<&str>,
) -> BatchSummary {
    let settings = ctx.config().sync.settings();
    let vcs = GitClient::new();
    let mut prompt: Box<dyn ReconcilePrompt> = if yes || !ctx.interactive() {
        Box::new(AutoPrompt {
            init: yes,
            ..AutoPrompt::default()
        })
    } else {
        Box::new(InteractivePrompt::stdin())
    };
    Reconciler::new(&vcs, prompt.as_mut(), settings).reconcile_batch(
        &mut ctx.store,
        selection,
        direction,
        message,
    )
}

fn finish(ctx: &AppContext, title: &str, summary: &BatchSummary) -> Result<()> {
    let unfinished = summary.unfinished();
    let outcome = if unfinished == 0 {
        None
    } else {
        let err = VcsError::new(
            "reconcile",
            VcsErrorKind::Other,
            format!(
                "{unfinished} of {} libraries failed or were aborted",
                summary.reports.len()
            ),
        );
        Some(JaavisError::VersionControl(err))
    };

    if ctx.robot_mode {
        return match outcome {
            Some(err) => Err(emit_robot_error(summary, err)),
            None => emit_robot(&robot_ok(summary)),
        };
    }

    let mut layout = HumanLayout::new();
    layout.title(title);
    for report in &summary.reports {
        layout.section(&report.name);
        layout.kv("Status", &status_label(&report.status));
        if !report.actions.is_empty() {
            let actions: Vec<String> = report.actions.iter().map(action_label).collect();
            layout.kv("Actions", &actions.join(" -> "));
        }
        for note in &report.notes {
            layout.bullet(&note.yellow().to_string());
        }
        layout.blank();
    }
    emit_human(layout);

    outcome.map_or(Ok(()), Err)
}

fn status_label(status: &RecordStatus) -> String {
    match status {
        RecordStatus::Cloned => "cloned".green().to_string(),
        RecordStatus::Initialized => "initialized".green().to_string(),
        RecordStatus::UpToDate => "already up to date".green().to_string(),
        RecordStatus::Synced => "synced".green().to_string(),
        RecordStatus::Pushed { branch } => format!("pushed to {branch}").green().to_string(),
        RecordStatus::Missing => "missing (no local copy, no remote)".yellow().to_string(),
        RecordStatus::NoRemote => "no remote linked".yellow().to_string(),
        RecordStatus::Aborted => "aborted".yellow().to_string(),
        RecordStatus::Failed { error } => format!("failed: {error}").red().to_string(),
    }
}

fn action_label(action: &LibraryAction) -> String {
    match action {
        LibraryAction::Clone { url } => format!("clone {url}"),
        LibraryAction::Init => "init".to_string(),
        LibraryAction::SetRemote { url } => format!("link {url}"),
        LibraryAction::Fetch => "fetch".to_string(),
        LibraryAction::Stash => "stash".to_string(),
        LibraryAction::Commit { message } => format!("commit \"{message}\""),
        LibraryAction::Pull => "pull".to_string(),
        LibraryAction::SetUpstream { branch } => format!("track {branch}"),
        LibraryAction::PopStash => "pop stash".to_string(),
        LibraryAction::Push { branch } => format!("push {branch}"),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_sync_all() {
        let cli = crate::cli::Cli::parse_from(["jaavis", "sync", "--all", "--yes"]);
        if let crate::cli::Commands::Sync(sync) = cli.command {
            assert!(sync.all);
            assert!(sync.yes);
            assert!(sync.persona.is_none());
        } else {
            panic!("expected sync command");
        }
    }

    #[test]
    fn parse_push_with_message() {
        let cli = crate::cli::Cli::parse_from(["jaavis", "push", "librarian", "-m", "new skills"]);
        if let crate::cli::Commands::Push(push) = cli.command {
            assert_eq!(push.persona.as_deref(), Some("librarian"));
            assert_eq!(push.message.as_deref(), Some("new skills"));
        } else {
            panic!("expected push command");
        }
    }

    #[test]
    fn persona_and_all_conflict() {
        assert!(crate::cli::Cli::try_parse_from(["jaavis", "sync", "x", "--all"]).is_err());
    }

    #[test]
    fn labels_name_the_branch() {
        let label = action_label(&LibraryAction::Push {
            branch: "master".to_string(),
        });
        assert_eq!(label, "push master");
    }
}
