//! Deployment resolution: grade rules, pre-flight checks and strategies.

pub mod probe;
pub mod resolver;
pub mod strategies;

pub use probe::{EnvironmentProbe, SystemProbe};
pub use resolver::{DeployResolution, audit_steps, preflight, resolve};
pub use strategies::{DeployStrategy, available_strategies, resolve_strategy};
