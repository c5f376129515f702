//! Step execution: runner port, shell session, failure policies and the engine.

pub mod engine;
pub mod observer;
pub mod policy;
pub mod report;
pub mod runner;
pub mod session;

pub use engine::ExecutionEngine;
pub use observer::{ConsoleObserver, ExecutionObserver, NoopObserver};
pub use policy::{
    AlwaysAbort, AlwaysSkip, FailureAction, FailurePolicy, InteractivePolicy, ScriptedPolicy,
};
pub use report::{ExecutionOutcome, ExecutionReport, ReportSummary, StepStatus};
pub use runner::{ShellRunner, StepRunner, default_shell};
pub use session::ShellSession;
