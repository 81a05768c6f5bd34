//! On-disk run layout: configuration file, shared definitions and one
//! scenario file per session, all inside a temporary directory.

use anyhow::Result;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Definitions shared by every end-to-end scenario.
pub const DEFINITIONS: &str = r#"
[variables]
symbol = "EUR/USD"

[templates.limit_order]
kind = "NewOrderSingle"
fields = { ClOrdID = "${uid}", Symbol = "${symbol}", Side = "1", OrderQty = 100, OrdType = "2", Price = 1.1, TimeInForce = "0" }

[templates.cancel]
kind = "OrderCancelRequest"
fields = { ClOrdID = "${uid}", Symbol = "${symbol}", Side = "1", OrderQty = 100 }
"#;

pub struct RunFixture {
    dir: TempDir,
    sessions: Vec<(String, u16)>,
    parallel: bool,
    logon_timeout_secs: u64,
    scenario_timeout_secs: u64,
}

impl RunFixture {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("scenarios"))?;
        Ok(Self {
            dir,
            sessions: Vec::new(),
            parallel: false,
            logon_timeout_secs: 3,
            scenario_timeout_secs: 30,
        })
    }

    pub fn session(mut self, qualifier: &str, port: u16) -> Self {
        self.sessions.push((qualifier.to_string(), port));
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn scenario_timeout_secs(mut self, secs: u64) -> Self {
        self.scenario_timeout_secs = secs;
        self
    }

    /// Write `scenarios/<qualifier>.toml`.
    pub fn scenario(self, qualifier: &str, text: &str) -> Result<Self> {
        fs::write(self.scenario_path(qualifier), text)?;
        Ok(self)
    }

    pub fn scenario_path(&self, qualifier: &str) -> PathBuf {
        self.dir.path().join("scenarios").join(format!("{}.toml", qualifier))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.path().join("report.json")
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write the definitions and configuration files; returns the
    /// configuration path.
    pub fn write(&self) -> Result<PathBuf> {
        let definitions = self.dir.path().join("definitions.toml");
        fs::write(&definitions, DEFINITIONS)?;

        let mut config = String::from(
            r#"
[default]
begin_string = "FIX.4.4"
sender_comp_id = "CLIENT"
target_comp_id = "EXCHANGE"
socket_connect_host = "127.0.0.1"
heartbeat_interval_secs = 30
"#,
        );
        for (qualifier, port) in &self.sessions {
            write!(
                config,
                "\n[[session]]\nqualifier = \"{}\"\nsocket_connect_port = {}\n",
                qualifier, port
            )?;
        }
        write!(
            config,
            r#"
[runner]
definitions_file = "{}"
scenario_dir = "{}"
logon_timeout_secs = {}
logon_poll_interval_ms = 20
logout_timeout_secs = 2
scenario_timeout_secs = {}
parallel = {}
report_file = "{}"
"#,
            definitions.display(),
            self.dir.path().join("scenarios").display(),
            self.logon_timeout_secs,
            self.scenario_timeout_secs,
            self.parallel,
            self.report_path().display(),
        )?;

        let path = self.dir.path().join("simplefixclient.cfg");
        fs::write(&path, config)?;
        Ok(path)
    }
}
