//! jaavis - Skill library and project orchestration
//!
//! Skills are markdown documents, optionally carrying executable shell blocks.
//! They live in git-backed persona libraries that are reconciled with their
//! remotes, and are executed step by step under an operator failure policy.

pub mod app;
pub mod blueprint;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod exec;
pub mod library;
pub mod plan;
pub mod process;
pub mod project;
pub mod skill;
pub mod test_utils;

pub use error::{JaavisError, Result};
