//! Orchestration settings (`[runner]` table).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunnerSettings {
    /// Shared definitions loaded once before any scenario runs.
    pub definitions_file: PathBuf,
    /// Directory holding `<qualifier>.toml` scenario files.
    pub scenario_dir: PathBuf,
    pub logon_timeout_secs: u64,
    pub logon_poll_interval_ms: u64,
    pub logout_timeout_secs: u64,
    /// Deadline for one session's whole scenario.
    pub scenario_timeout_secs: u64,
    pub mailbox_capacity: usize,
    /// Run sessions concurrently instead of one after another.
    pub parallel: bool,
    /// Optional JSON report of the run.
    pub report_file: Option<PathBuf>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            definitions_file: PathBuf::from("definitions.toml"),
            scenario_dir: PathBuf::from("scenarios"),
            logon_timeout_secs: 10,
            logon_poll_interval_ms: 100,
            logout_timeout_secs: 5,
            scenario_timeout_secs: 300,
            mailbox_capacity: 10_000,
            parallel: false,
            report_file: None,
        }
    }
}

impl RunnerSettings {
    pub fn logon_timeout(&self) -> Duration {
        Duration::from_secs(self.logon_timeout_secs)
    }

    pub fn logon_poll_interval(&self) -> Duration {
        Duration::from_millis(self.logon_poll_interval_ms)
    }

    pub fn logout_timeout(&self) -> Duration {
        Duration::from_secs(self.logout_timeout_secs)
    }

    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_secs(self.scenario_timeout_secs)
    }

    /// Scenario source for a session qualifier.
    pub fn scenario_path(&self, qualifier: &str) -> PathBuf {
        self.scenario_dir.join(format!("{}.toml", qualifier))
    }
}
