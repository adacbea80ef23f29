//! Error taxonomy for a texfly run.

use std::path::PathBuf;
use thiserror::Error;

/// The compiler binary could not be started. Fatal for the whole run.
#[derive(Error, Debug)]
#[error("unable to start {compiler}: {source}")]
pub struct LaunchError {
    pub compiler: String,
    #[source]
    pub source: std::io::Error,
}

/// Failures of the package index tool (`tlmgr`).
#[derive(Error, Debug)]
pub enum IndexError {
    /// The index tool is missing. Fatal unless the run was asked to fail
    /// silently.
    #[error("package index tool {} is not available", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The query ran but the account may not use the index.
    #[error("permission denied while querying for `{term}`")]
    Denied { term: String },

    /// The query ran and failed.
    #[error("query for `{term}` failed: {reason}")]
    Failed { term: String, reason: String },
}

/// Every privilege escalation mechanism failed, or the one the run was
/// restricted to did.
#[derive(Error, Debug)]
pub enum EscalationError {
    #[error("all privilege escalation attempts have failed (tried: {})", .attempted.join(", "))]
    Exhausted { attempted: Vec<String> },

    #[error("timed out waiting for {} to be removed", .lock.display())]
    TimedOut { lock: PathBuf },

    #[error("escalation I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A package batch (or the index self-update) could not be installed.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error("unable to run {program}: {reason}")]
    Launch { program: String, reason: String },
}

/// Invalid run configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unbalanced quotes in compiler arguments: {0}")]
    UnbalancedArguments(String),

    #[error("{0} not found on PATH")]
    ToolNotFound(String),
}
