//! Process pipeline: configuration, definitions, engine, orchestrator, report.

use crate::error::{Result, RunnerError};
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::report;
use crate::router::InboundRouter;
use crate::script::{ScenarioEngine, StepScriptEngine};
use fix_network::{FixEngine, SessionConfig, SessionId, SocketInitiator};
use runner_config::EngineConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Engine session settings for every configured session, in file order.
pub fn session_configs(config: &EngineConfig) -> Vec<SessionConfig> {
    config
        .sessions
        .iter()
        .map(|s| SessionConfig {
            id: SessionId::new(
                s.begin_string.clone(),
                s.sender_comp_id.clone(),
                s.target_comp_id.clone(),
                s.qualifier.clone(),
            ),
            host: s.host.clone(),
            port: s.port,
            heartbeat_interval: s.heartbeat_interval,
            reset_on_logon: s.reset_on_logon,
            connect_timeout: s.connect_timeout,
        })
        .collect()
}

/// Load `config_path` and the shared definitions, then run every session.
pub async fn run(config_path: &Path) -> Result<RunSummary> {
    let config = EngineConfig::load(config_path).map_err(RunnerError::Configuration)?;

    let mut scripts = StepScriptEngine::new();
    scripts.load_definitions(&config.runner.definitions_file)?;

    execute(config, Arc::new(scripts)).await
}

/// Start the engine, run the orchestrator, stop the engine, report.
pub async fn execute(config: EngineConfig, scripts: Arc<dyn ScenarioEngine>) -> Result<RunSummary> {
    let router = Arc::new(InboundRouter::new());
    let engine: Arc<dyn FixEngine> =
        Arc::new(SocketInitiator::start(session_configs(&config), router.clone())?);

    let orchestrator = Orchestrator::new(engine.clone(), router.clone(), scripts, config.runner.clone());
    let summary = orchestrator.run(&engine.session_ids()).await;

    engine.stop(config.runner.logout_timeout()).await;
    if router.unrouted() > 0 {
        info!(unrouted = router.unrouted(), "Inbound messages arrived outside any scenario");
    }

    report::print_summary(&summary);
    if let Some(path) = &config.runner.report_file {
        report::save_report(&summary, path).await?;
        info!("Results saved to: {}", path.display());
    }
    Ok(summary)
}
