//! Error types for the scenario runner

use fix_network::TransportError;
use fix_types::MessageKind;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("No {kind} matched within {timeout_ms}ms")]
    TimedOut { kind: MessageKind, timeout_ms: u64 },

    /// Set once an inbound message was refused at capacity; sticky.
    #[error("Mailbox overflow: {dropped} inbound message(s) refused at capacity {capacity}")]
    Overflow { capacity: usize, dropped: u64 },
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Session {session} is not logged on")]
    NotLoggedOn { session: String },

    #[error("Expected {kind} within {timeout_ms}ms, none arrived")]
    ExpectationTimeout { kind: MessageKind, timeout_ms: u64 },

    #[error("Mailbox overflow: {dropped} inbound message(s) refused at capacity {capacity}")]
    MailboxOverflow { capacity: usize, dropped: u64 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<MailboxError> for ConnectionError {
    fn from(error: MailboxError) -> Self {
        match error {
            MailboxError::TimedOut { kind, timeout_ms } => {
                ConnectionError::ExpectationTimeout { kind, timeout_ms }
            }
            MailboxError::Overflow { capacity, dropped } => {
                ConnectionError::MailboxOverflow { capacity, dropped }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Scenario source not found: {0:?}")]
    SourceMissing(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("Unknown message kind '{0}'")]
    UnknownKind(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Field '{field}' must be a string, number or boolean")]
    InvalidValue { field: String },

    #[error("Step {step}: {message}")]
    InvalidStep { step: usize, message: String },

    #[error("Step {step}: {source}")]
    Connection {
        step: usize,
        #[source]
        source: ConnectionError,
    },

    #[error("Step {step}: unexpected {kind} received: {message}")]
    UnexpectedMessage {
        step: usize,
        kind: MessageKind,
        message: String,
    },

    #[error("Step {step}: tag {tag} missing, cannot capture '{variable}'")]
    CaptureMissing {
        step: usize,
        tag: u32,
        variable: String,
    },
}

impl ScriptError {
    pub fn parse(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub fn invalid_step(step: usize, message: impl Into<String>) -> Self {
        Self::InvalidStep {
            step,
            message: message.into(),
        }
    }
}

/// Why a session's run failed.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", content = "detail")]
pub enum FailureCause {
    #[error("Session {0} not found in engine")]
    SessionNotFound(String),

    #[error("Logon not confirmed within {timeout_ms}ms")]
    LogonTimeout { timeout_ms: u64 },

    #[error("Logon rejected: {0}")]
    LogonRejected(String),

    #[error("Scenario file missing: {0:?}")]
    ScenarioFileMissing(PathBuf),

    #[error("Scenario script error: {0}")]
    ScenarioScriptError(String),

    #[error("Scenario exceeded its {timeout_ms}ms deadline")]
    ScenarioTimeout { timeout_ms: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session task panicked: {0}")]
    Panicked(String),
}

/// Process-level failures. Any of these aborts the run before or instead of
/// reporting per-session results.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Configuration error: {0:#}")]
    Configuration(anyhow::Error),

    #[error("Failed to load definitions: {0}")]
    Definitions(#[from] ScriptError),

    #[error("Failed to start FIX engine: {0}")]
    Engine(#[from] TransportError),

    #[error("Failed to write report {path:?}: {message}")]
    Report { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, RunnerError>;
