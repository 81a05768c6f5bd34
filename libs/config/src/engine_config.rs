//! Engine Configuration Module
//!
//! Reads the engine configuration file with `config-crate`, merges `[default]`
//! into every `[[session]]`, expands environment variables in paths and
//! validates the result. Anything wrong here is fatal for the run: no session
//! is attempted with a half-valid configuration.

use crate::runner::RunnerSettings;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const ENV_PREFIX: &str = "SIMPLEFIX";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("No [[session]] configured")]
    NoSessions,

    #[error("Session #{index} has no qualifier")]
    MissingQualifier { index: usize },

    #[error("Duplicate session qualifier '{0}'")]
    DuplicateQualifier(String),

    #[error("Session '{qualifier}' is missing required setting '{field}'")]
    MissingField { qualifier: String, field: &'static str },

    #[error("Setting '{0}' must be greater than zero")]
    ZeroValue(&'static str),
}

/// One `[default]` or `[[session]]` table. Every value is optional so
/// sessions can inherit from `[default]`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SessionTemplate {
    pub qualifier: Option<String>,
    pub begin_string: Option<String>,
    pub sender_comp_id: Option<String>,
    pub target_comp_id: Option<String>,
    pub socket_connect_host: Option<String>,
    pub socket_connect_port: Option<u16>,
    pub heartbeat_interval_secs: Option<u64>,
    pub reset_on_logon: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
}

impl SessionTemplate {
    fn or(self, defaults: &SessionTemplate) -> SessionTemplate {
        SessionTemplate {
            qualifier: self.qualifier,
            begin_string: self.begin_string.or_else(|| defaults.begin_string.clone()),
            sender_comp_id: self.sender_comp_id.or_else(|| defaults.sender_comp_id.clone()),
            target_comp_id: self.target_comp_id.or_else(|| defaults.target_comp_id.clone()),
            socket_connect_host: self
                .socket_connect_host
                .or_else(|| defaults.socket_connect_host.clone()),
            socket_connect_port: self.socket_connect_port.or(defaults.socket_connect_port),
            heartbeat_interval_secs: self
                .heartbeat_interval_secs
                .or(defaults.heartbeat_interval_secs),
            reset_on_logon: self.reset_on_logon.or(defaults.reset_on_logon),
            connect_timeout_secs: self.connect_timeout_secs.or(defaults.connect_timeout_secs),
        }
    }
}

/// File layout as deserialized.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
struct RawEngineConfig {
    #[serde(default)]
    default: SessionTemplate,
    #[serde(default)]
    session: Vec<SessionTemplate>,
    #[serde(default)]
    runner: RunnerSettings,
}

/// Fully resolved settings for one FIX session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSettings {
    pub qualifier: String,
    pub begin_string: String,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub host: String,
    pub port: u16,
    pub heartbeat_interval: Duration,
    pub reset_on_logon: bool,
    pub connect_timeout: Duration,
}

/// Validated engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sessions: Vec<SessionSettings>,
    pub runner: RunnerSettings,
    pub source: PathBuf,
}

impl EngineConfig {
    /// Load, merge, expand and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading engine configuration: {:?}", path);

        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration {:?}", path))?;

        let raw: RawEngineConfig = config
            .try_deserialize()
            .with_context(|| format!("Failed to deserialize configuration {:?}", path))?;

        let mut engine = Self::from_raw(raw)
            .with_context(|| format!("Invalid configuration {:?}", path))?;
        engine.expand_paths()?;
        engine.source = path.to_path_buf();

        debug!(
            sessions = engine.sessions.len(),
            parallel = engine.runner.parallel,
            "Engine configuration loaded"
        );
        Ok(engine)
    }

    /// Parse TOML text directly, without environment overrides.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .context("Failed to parse configuration text")?;
        let raw: RawEngineConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration text")?;
        let mut engine = Self::from_raw(raw)?;
        engine.expand_paths()?;
        Ok(engine)
    }

    fn from_raw(raw: RawEngineConfig) -> std::result::Result<Self, ConfigValidationError> {
        validate_runner(&raw.runner)?;
        if raw.session.is_empty() {
            return Err(ConfigValidationError::NoSessions);
        }

        let mut seen = HashSet::new();
        let mut sessions = Vec::with_capacity(raw.session.len());
        for (index, template) in raw.session.into_iter().enumerate() {
            let merged = template.or(&raw.default);
            let qualifier = merged
                .qualifier
                .clone()
                .filter(|q| !q.trim().is_empty())
                .ok_or(ConfigValidationError::MissingQualifier { index })?;
            if !seen.insert(qualifier.clone()) {
                return Err(ConfigValidationError::DuplicateQualifier(qualifier));
            }
            sessions.push(resolve(qualifier, merged)?);
        }

        Ok(Self {
            sessions,
            runner: raw.runner,
            source: PathBuf::new(),
        })
    }

    /// Expand `$VAR` and `~` in runner paths.
    fn expand_paths(&mut self) -> Result<()> {
        self.runner.definitions_file = expand(&self.runner.definitions_file)
            .context("Failed to expand definitions_file")?;
        self.runner.scenario_dir =
            expand(&self.runner.scenario_dir).context("Failed to expand scenario_dir")?;
        if let Some(report) = &self.runner.report_file {
            self.runner.report_file = Some(expand(report).context("Failed to expand report_file")?);
        }
        Ok(())
    }

    pub fn session(&self, qualifier: &str) -> Option<&SessionSettings> {
        self.sessions.iter().find(|s| s.qualifier == qualifier)
    }
}

fn required<T>(
    value: Option<T>,
    qualifier: &str,
    field: &'static str,
) -> std::result::Result<T, ConfigValidationError> {
    value.ok_or_else(|| ConfigValidationError::MissingField {
        qualifier: qualifier.to_string(),
        field,
    })
}

fn resolve(
    qualifier: String,
    t: SessionTemplate,
) -> std::result::Result<SessionSettings, ConfigValidationError> {
    let heartbeat = t.heartbeat_interval_secs.unwrap_or(30);
    if heartbeat == 0 {
        return Err(ConfigValidationError::ZeroValue("heartbeat_interval_secs"));
    }
    let connect_timeout = t.connect_timeout_secs.unwrap_or(5);
    if connect_timeout == 0 {
        return Err(ConfigValidationError::ZeroValue("connect_timeout_secs"));
    }
    Ok(SessionSettings {
        begin_string: required(t.begin_string, &qualifier, "begin_string")?,
        sender_comp_id: required(t.sender_comp_id, &qualifier, "sender_comp_id")?,
        target_comp_id: required(t.target_comp_id, &qualifier, "target_comp_id")?,
        host: required(t.socket_connect_host, &qualifier, "socket_connect_host")?,
        port: required(t.socket_connect_port, &qualifier, "socket_connect_port")?,
        heartbeat_interval: Duration::from_secs(heartbeat),
        reset_on_logon: t.reset_on_logon.unwrap_or(true),
        connect_timeout: Duration::from_secs(connect_timeout),
        qualifier,
    })
}

fn validate_runner(runner: &RunnerSettings) -> std::result::Result<(), ConfigValidationError> {
    let checks = [
        (runner.logon_timeout_secs == 0, "logon_timeout_secs"),
        (runner.logon_poll_interval_ms == 0, "logon_poll_interval_ms"),
        (runner.logout_timeout_secs == 0, "logout_timeout_secs"),
        (runner.scenario_timeout_secs == 0, "scenario_timeout_secs"),
        (runner.mailbox_capacity == 0, "mailbox_capacity"),
    ];
    match checks.iter().find(|(zero, _)| *zero) {
        Some((_, field)) => Err(ConfigValidationError::ZeroValue(*field)),
        None => Ok(()),
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    let expanded = shellexpand::full(&text)
        .with_context(|| format!("Unresolvable variable in path {}", text))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Convenience function mirroring the binary's behaviour: an explicit path or
/// the default file in the working directory.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = path.unwrap_or_else(|| Path::new(crate::DEFAULT_CONFIG_FILE));
    EngineConfig::load(path)
}
