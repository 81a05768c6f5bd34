//! Session lifecycle controller.
//!
//! Drives one session through
//! `Connecting -> ConnectedWait -> LoggedOn -> Running -> LoggedOff`,
//! short-circuiting to `Failed` on the first error. Once a session reached
//! `LoggedOn`, logoff is attempted exactly once however `Running` ended.
//! A logon that times out is cancelled with a logout so the engine does not
//! complete it after the session has been reported failed.

use crate::bindings::ScenarioBindings;
use crate::connection::Connection;
use crate::error::{FailureCause, ScriptError};
use crate::router::InboundRouter;
use crate::script::{ScenarioEngine, ScriptSummary};
use chrono::{DateTime, Utc};
use fix_network::{FixEngine, SessionHandle, SessionId, SessionStatus};
use runner_config::RunnerSettings;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    ConnectedWait,
    LoggedOn,
    Running,
    LoggedOff,
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Disconnected => "DISCONNECTED",
            SessionPhase::Connecting => "CONNECTING",
            SessionPhase::ConnectedWait => "CONNECTED_WAIT",
            SessionPhase::LoggedOn => "LOGGED_ON",
            SessionPhase::Running => "RUNNING",
            SessionPhase::LoggedOff => "LOGGED_OFF",
            SessionPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Outcome of one session's run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub session: String,
    pub qualifier: String,
    pub passed: bool,
    /// Terminal phase: `LoggedOff` or `Failed`.
    pub phase: SessionPhase,
    /// Furthest phase reached; never `Failed`.
    pub phase_reached: SessionPhase,
    pub failure: Option<FailureCause>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    /// Inbound messages left unread at teardown.
    pub unread: usize,
    pub script: Option<ScriptSummary>,
    pub logout_attempted: bool,
}

impl ScenarioResult {
    fn new(id: &SessionId) -> Self {
        Self {
            session: id.to_string(),
            qualifier: id.qualifier.clone(),
            passed: false,
            phase: SessionPhase::Disconnected,
            phase_reached: SessionPhase::Disconnected,
            failure: None,
            started_at: Utc::now(),
            duration_ms: 0,
            messages_sent: 0,
            messages_received: 0,
            unread: 0,
            script: None,
            logout_attempted: false,
        }
    }

    /// Result for a session whose controller task died.
    pub fn panicked(id: &SessionId, message: impl Into<String>) -> Self {
        let mut result = Self::new(id);
        result.phase = SessionPhase::Failed;
        result.failure = Some(FailureCause::Panicked(message.into()));
        result
    }
}

pub struct LifecycleController {
    id: SessionId,
    engine: Arc<dyn FixEngine>,
    router: Arc<InboundRouter>,
    scripts: Arc<dyn ScenarioEngine>,
    settings: Arc<RunnerSettings>,
    result: ScenarioResult,
}

impl LifecycleController {
    pub fn new(
        id: SessionId,
        engine: Arc<dyn FixEngine>,
        router: Arc<InboundRouter>,
        scripts: Arc<dyn ScenarioEngine>,
        settings: Arc<RunnerSettings>,
    ) -> Self {
        let result = ScenarioResult::new(&id);
        Self {
            id,
            engine,
            router,
            scripts,
            settings,
            result,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.result.phase
    }

    pub async fn run(mut self) -> ScenarioResult {
        let started = Instant::now();
        self.result.started_at = Utc::now();

        if let Err(cause) = self.drive().await {
            error!(session = %self.id, phase = %self.result.phase_reached, cause = %cause, "Session failed");
            self.result.failure = Some(cause);
            self.result.phase = SessionPhase::Failed;
        } else {
            self.result.passed = true;
        }

        self.result.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            session = %self.id,
            passed = self.result.passed,
            phase = %self.result.phase,
            duration_ms = self.result.duration_ms,
            "Session finished"
        );
        self.result
    }

    fn enter(&mut self, phase: SessionPhase) {
        info!(session = %self.id, qualifier = %self.id.qualifier, phase = %phase, "Phase transition");
        self.result.phase = phase;
        if phase != SessionPhase::Failed {
            self.result.phase_reached = phase;
        }
    }

    async fn drive(&mut self) -> Result<(), FailureCause> {
        self.enter(SessionPhase::Connecting);
        let session = self
            .engine
            .lookup(&self.id)
            .ok_or_else(|| FailureCause::SessionNotFound(self.id.to_string()))?;
        session
            .logon()
            .map_err(|e| FailureCause::Transport(e.to_string()))?;

        self.enter(SessionPhase::ConnectedWait);
        if let Err(cause) = self.await_logon(session.as_ref()).await {
            if matches!(cause, FailureCause::LogonTimeout { .. }) {
                self.abandon_logon(session.as_ref());
            }
            return Err(cause);
        }

        self.enter(SessionPhase::LoggedOn);
        session.set_reject_invalid_message(false);
        let connection = match Connection::new(session.clone(), self.settings.mailbox_capacity) {
            Ok(connection) => Arc::new(connection),
            Err(e) => {
                // Lost the session between the poll and here.
                self.logoff(session.as_ref(), None).await;
                return Err(FailureCause::Transport(e.to_string()));
            }
        };
        self.router.register(connection.clone());

        self.enter(SessionPhase::Running);
        let outcome = self.run_scenario(connection.clone()).await;

        self.logoff(session.as_ref(), Some(&connection)).await;
        let summary = outcome?;
        self.result.script = Some(summary);
        Ok(())
    }

    /// Poll `is_logged_on` at a fixed interval until the logon timeout.
    /// A rejection or a transport failure ends the wait early.
    async fn await_logon(&self, session: &dyn SessionHandle) -> Result<(), FailureCause> {
        let timeout = self.settings.logon_timeout();
        let deadline = Instant::now() + timeout;
        let mut ticker = tokio::time::interval(self.settings.logon_poll_interval());

        loop {
            ticker.tick().await;
            if session.is_logged_on() {
                debug!(session = %self.id, "Logon confirmed");
                return Ok(());
            }
            if let Some(reason) = session.rejection() {
                return Err(FailureCause::LogonRejected(reason));
            }
            if let SessionStatus::Failed(reason) = session.status() {
                return Err(FailureCause::Transport(reason));
            }
            if Instant::now() >= deadline {
                return Err(FailureCause::LogonTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            debug!(session = %self.id, status = %session.status(), "Waiting for logon");
        }
    }

    /// Cancel a logon still in flight. Nothing is awaited: the session never
    /// reached `LoggedOn`.
    fn abandon_logon(&mut self, session: &dyn SessionHandle) {
        warn!(session = %self.id, status = %session.status(), "Cancelling pending logon");
        self.result.logout_attempted = true;
        if let Err(e) = session.logout() {
            warn!(session = %self.id, error = %e, "Logout request failed");
        }
    }

    async fn run_scenario(&self, connection: Arc<Connection>) -> Result<ScriptSummary, FailureCause> {
        let source = self.settings.scenario_path(&self.id.qualifier);
        if !source.is_file() {
            return Err(FailureCause::ScenarioFileMissing(source));
        }

        let bindings = ScenarioBindings::new(connection);
        let deadline = self.settings.scenario_timeout();
        match tokio::time::timeout(deadline, self.scripts.run(&source, bindings)).await {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(ScriptError::SourceMissing(path))) => Err(FailureCause::ScenarioFileMissing(path)),
            Ok(Err(e)) => Err(FailureCause::ScenarioScriptError(e.to_string())),
            Err(_) => Err(FailureCause::ScenarioTimeout {
                timeout_ms: deadline.as_millis() as u64,
            }),
        }
    }

    /// Unregister, clear, request logout and wait (bounded) for it.
    async fn logoff(&mut self, session: &dyn SessionHandle, connection: Option<&Arc<Connection>>) {
        self.enter(SessionPhase::LoggedOff);
        self.router.unregister(&self.id);
        if let Some(connection) = connection {
            let stats = connection.stats();
            self.result.messages_sent = stats.sent;
            self.result.messages_received = stats.received;
            self.result.unread = connection.teardown();
        }

        self.result.logout_attempted = true;
        if let Err(e) = session.logout() {
            warn!(session = %self.id, error = %e, "Logout request failed");
            return;
        }

        let timeout = self.settings.logout_timeout();
        let deadline = Instant::now() + timeout;
        while session.is_logged_on() {
            if Instant::now() >= deadline {
                warn!(session = %self.id, timeout_ms = timeout.as_millis() as u64, "Logout not confirmed");
                return;
            }
            tokio::time::sleep(self.settings.logon_poll_interval()).await;
        }
        debug!(session = %self.id, "Logged off");
    }
}
