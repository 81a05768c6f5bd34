//! Orchestrator: one lifecycle controller per configured session.
//!
//! Every controller runs on its own tokio task, so a panic in one session is
//! caught at the join and recorded as that session's failure. Sequential mode
//! awaits each task before spawning the next; parallel mode spawns them all.

use crate::lifecycle::{LifecycleController, ScenarioResult};
use crate::router::InboundRouter;
use crate::script::ScenarioEngine;
use chrono::{DateTime, Utc};
use fix_network::{FixEngine, SessionId};
use futures::future::join_all;
use runner_config::RunnerSettings;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

/// Aggregate over all sessions of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub parallel: bool,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub struct Orchestrator {
    engine: Arc<dyn FixEngine>,
    router: Arc<InboundRouter>,
    scripts: Arc<dyn ScenarioEngine>,
    settings: Arc<RunnerSettings>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn FixEngine>,
        router: Arc<InboundRouter>,
        scripts: Arc<dyn ScenarioEngine>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            engine,
            router,
            scripts,
            settings: Arc::new(settings),
        }
    }

    /// Run every session in `sessions`, in order, and collect the results.
    pub async fn run(&self, sessions: &[SessionId]) -> RunSummary {
        let started_at = Utc::now();
        let started = Instant::now();
        let parallel = self.settings.parallel;
        info!(sessions = sessions.len(), parallel, "Starting scenario run");

        let results = if parallel {
            let handles: Vec<_> = sessions.iter().map(|id| self.spawn(id)).collect();
            join_all(
                sessions
                    .iter()
                    .zip(handles)
                    .map(|(id, handle)| Self::join(id, handle)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(sessions.len());
            for id in sessions {
                let handle = self.spawn(id);
                results.push(Self::join(id, handle).await);
            }
            results
        };

        let passed = results.iter().filter(|r| r.passed).count();
        let summary = RunSummary {
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            parallel,
            passed,
            failed: results.len() - passed,
            results,
        };
        info!(
            passed = summary.passed,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "Scenario run complete"
        );
        summary
    }

    fn spawn(&self, id: &SessionId) -> JoinHandle<ScenarioResult> {
        let controller = LifecycleController::new(
            id.clone(),
            self.engine.clone(),
            self.router.clone(),
            self.scripts.clone(),
            self.settings.clone(),
        );
        tokio::spawn(controller.run())
    }

    async fn join(id: &SessionId, handle: JoinHandle<ScenarioResult>) -> ScenarioResult {
        match handle.await {
            Ok(result) => result,
            Err(e) => {
                let message = panic_message(e);
                error!(session = %id, error = %message, "Session controller aborted");
                ScenarioResult::panicked(id, message)
            }
        }
    }
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
