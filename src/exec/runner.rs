//! Process launch boundary.

use std::io;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::plan::CommandStep;

use super::session::ShellSession;

/// Exit code reported when the shell itself could not be launched.
pub const LAUNCH_FAILURE_EXIT: i32 = 127;

/// Launches one step and waits for it.
pub trait StepRunner {
    /// Run `step` with the terminal attached and return its exit code.
    fn run(&mut self, step: &CommandStep) -> io::Result<i32>;
}

/// Default shell: `bash` when available, else `sh`.
#[must_use]
pub fn default_shell() -> String {
    if which::which("bash").is_ok() {
        "bash".to_string()
    } else {
        "sh".to_string()
    }
}

/// Runs steps through a shell, carrying state within a block.
pub struct ShellRunner {
    shell: String,
    working_dir: Option<PathBuf>,
    session: ShellSession,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> io::Result<Self> {
        Ok(Self {
            shell: shell.into(),
            working_dir: None,
            session: ShellSession::new()?,
        })
    }

    /// Start each block in `dir` instead of the current directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl StepRunner for ShellRunner {
    fn run(&mut self, step: &CommandStep) -> io::Result<i32> {
        self.session.enter_block(step.block);
        let script = self.session.wrap(&step.command);

        let mut command = Command::new(&self.shell);
        command.arg("-c").arg(script);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        debug!(shell = %self.shell, step = %step.label, "launching step");

        // stdio is inherited so interactive programs can talk to the operator
        let status = command.status()?;
        Ok(status.code().unwrap_or(-1))
    }
}
