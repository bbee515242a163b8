//! C6 Sandbox Runner: ephemeral container execution with hard resource caps.

pub mod config;
pub mod errors;
pub mod runner;

pub use config::{isolated_defaults, secure_defaults, SandboxConfig, SandboxConfigBuilder};
pub use errors::{ConfigError, SandboxError, SandboxResult};
pub use runner::{ExecutionOutcome, SandboxRunner};
