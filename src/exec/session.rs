//! Shell state carried between the lines of one executable block.
//!
//! Each line runs as its own process so the operator can retry or skip it.
//! A successful line records its working directory and exported variables in
//! the session directory; the next line of the same block restores them
//! before running. A failed line records nothing, so a retry starts from the
//! same state as the first attempt.

use std::io;
use std::path::PathBuf;

use tempfile::TempDir;
use tracing::trace;

const CWD_FILE: &str = "cwd";
const ENV_FILE: &str = "env";
const RC_VAR: &str = "__jaavis_rc";

#[derive(Debug)]
pub struct ShellSession {
    dir: TempDir,
    block: Option<usize>,
}

impl ShellSession {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("jaavis-session-").tempdir()?;
        Ok(Self { dir, block: None })
    }

    fn cwd_file(&self) -> PathBuf {
        self.dir.path().join(CWD_FILE)
    }

    fn env_file(&self) -> PathBuf {
        self.dir.path().join(ENV_FILE)
    }

    /// Switch to `block`, dropping recorded state when it changes.
    pub fn enter_block(&mut self, block: usize) {
        if self.block != Some(block) {
            trace!(block, "shell session reset");
            self.reset();
            self.block = Some(block);
        }
    }

    pub fn reset(&mut self) {
        let _ = std::fs::remove_file(self.cwd_file());
        let _ = std::fs::remove_file(self.env_file());
        self.block = None;
    }

    /// Recorded working directory, if any.
    #[must_use]
    pub fn recorded_cwd(&self) -> Option<PathBuf> {
        std::fs::read_to_string(self.cwd_file())
            .ok()
            .map(|s| PathBuf::from(s.trim_end_matches('\n')))
    }

    /// Wrap `command` with the restore prelude and the record epilogue.
    /// The script exits with the command's own status.
    #[must_use]
    pub fn wrap(&self, command: &str) -> String {
        let env = shell_quote(&self.env_file().to_string_lossy());
        let cwd = shell_quote(&self.cwd_file().to_string_lossy());
        format!(
            "if [ -f {env} ]; then . {env} 2>/dev/null; fi\n\
             if [ -f {cwd} ]; then cd \"$(cat {cwd})\" || exit 1; fi\n\
             {command}\n\
             {RC_VAR}=$?\n\
             if [ \"${RC_VAR}\" -eq 0 ]; then pwd > {cwd}; export -p > {env}; fi\n\
             exit ${RC_VAR}\n"
        )
    }
}

/// Single-quote a string for POSIX shells.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
