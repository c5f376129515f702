//! Error types for jaavis.

use thiserror::Error;

/// Classification of a version-control failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VcsErrorKind {
    /// The current branch has no upstream tracking information.
    NoUpstream,
    /// The remote refused the update (non fast-forward, missing branch, ...).
    Rejected,
    /// A network operation exceeded its deadline.
    Timeout,
    /// Anything else; the raw tool message is the only detail.
    Other,
}

/// A failed version-control operation with the raw tool output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("git {operation} failed: {message}")]
pub struct VcsError {
    pub operation: String,
    pub kind: VcsErrorKind,
    pub message: String,
}

impl VcsError {
    pub fn new(
        operation: impl Into<String>,
        kind: VcsErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            kind,
            message: message.into(),
        }
    }

    /// Build an error from a failed invocation, classifying well-known messages.
    pub fn from_output(operation: impl Into<String>, stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let lowered = message.to_lowercase();
        let kind = if lowered.contains("no tracking information")
            || lowered.contains("has no upstream branch")
            || lowered.contains("no upstream configured")
        {
            VcsErrorKind::NoUpstream
        } else if lowered.contains("rejected")
            || lowered.contains("src refspec")
            || lowered.contains("failed to push")
        {
            VcsErrorKind::Rejected
        } else {
            VcsErrorKind::Other
        };
        Self::new(operation, kind, message)
    }

    #[must_use]
    pub const fn is_no_upstream(&self) -> bool {
        matches!(self.kind, VcsErrorKind::NoUpstream)
    }
}

#[derive(Error, Debug)]
pub enum JaavisError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("step '{step}' failed with exit code {exit_code}")]
    Execution { step: String, exit_code: i32 },

    #[error(transparent)]
    VersionControl(#[from] VcsError),

    #[error("required tool missing: {0}")]
    EnvironmentMissing(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("locked: {0}")]
    Locked(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Already written to stdout as a robot error envelope.
    #[error(transparent)]
    Reported(Box<JaavisError>),
}

impl JaavisError {
    /// Stable machine-readable code used by robot output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Reported(inner) => inner.code(),
            Self::NotFound(_) => "not_found",
            Self::Parse(_) => "parse_failure",
            Self::Execution { .. } => "execution_failure",
            Self::VersionControl(_) | Self::Git(_) => "version_control_failure",
            Self::EnvironmentMissing(_) => "environment_missing",
            Self::AlreadyExists(_) => "already_exists",
            Self::Locked(_) => "locked",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    #[must_use]
    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }
}

impl From<serde_json::Error> for JaavisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JaavisError>;
