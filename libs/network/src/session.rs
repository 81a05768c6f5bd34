//! Session identity, status and the handle the runner drives.

use crate::Result;
use fix_types::FixMessage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identity of one FIX session.
///
/// Two sessions with the same comp ids are told apart by `qualifier`, which
/// also names the session's scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    pub begin_string: String,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub qualifier: String,
}

impl SessionId {
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            qualifier: qualifier.into(),
        }
    }
}

/// `FIX.4.4:CLIENT->EXCHANGE:A`
impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )?;
        if !self.qualifier.is_empty() {
            write!(f, ":{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// Everything the engine needs to run one initiator session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub id: SessionId,
    pub host: String,
    pub port: u16,
    pub heartbeat_interval: Duration,
    pub reset_on_logon: bool,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    LogonSent,
    LoggedOn,
    LogoutSent,
    /// Counterparty answered our Logon with a Logout.
    Rejected(String),
    /// Connect or I/O failure.
    Failed(String),
}

impl SessionStatus {
    pub fn is_logged_on(&self) -> bool {
        matches!(self, SessionStatus::LoggedOn)
    }

    /// True while a logon attempt may still succeed.
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionStatus::Connecting | SessionStatus::LogonSent)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Disconnected => write!(f, "disconnected"),
            SessionStatus::Connecting => write!(f, "connecting"),
            SessionStatus::LogonSent => write!(f, "logon sent"),
            SessionStatus::LoggedOn => write!(f, "logged on"),
            SessionStatus::LogoutSent => write!(f, "logout sent"),
            SessionStatus::Rejected(reason) => write!(f, "rejected: {}", reason),
            SessionStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Control surface of one engine session.
///
/// Calls return immediately; protocol work happens on the engine's own task.
/// Progress is observed through [`SessionHandle::status`].
pub trait SessionHandle: Send + Sync {
    fn id(&self) -> &SessionId;

    /// Start connecting and send Logon.
    fn logon(&self) -> Result<()>;

    /// Send Logout if a session is established. Safe to call in any state.
    fn logout(&self) -> Result<()>;

    fn status(&self) -> SessionStatus;

    fn is_logged_on(&self) -> bool {
        self.status().is_logged_on()
    }

    /// Reason the last logon was refused, if it was.
    fn rejection(&self) -> Option<String> {
        match self.status() {
            SessionStatus::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    /// Stamp header fields and transmit. Fails unless logged on.
    fn send(&self, message: FixMessage) -> Result<()>;

    /// `true` answers malformed inbound application messages with a
    /// session-level Reject; `false` delivers them as they are.
    fn set_reject_invalid_message(&self, reject: bool);
}

/// Receives what the engine decodes for a session.
pub trait InboundHandler: Send + Sync {
    /// Inbound application message.
    fn on_inbound(&self, session: &SessionId, message: FixMessage);

    fn on_logon(&self, _session: &SessionId) {}

    fn on_logout(&self, _session: &SessionId) {}
}
