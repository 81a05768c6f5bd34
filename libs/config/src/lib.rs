//! # Runner Configuration
//!
//! Loads the engine configuration file named on the command line
//! (`simplefixclient.cfg` by default) into validated, per-session settings.
//!
//! ## Format
//!
//! TOML, whatever the file extension. `[default]` holds values every
//! `[[session]]` inherits, `[runner]` holds orchestration settings:
//!
//! ```toml
//! [default]
//! begin_string = "FIX.4.4"
//! sender_comp_id = "CLIENT"
//! target_comp_id = "EXCHANGE"
//! socket_connect_host = "127.0.0.1"
//! socket_connect_port = 9876
//!
//! [[session]]
//! qualifier = "A"
//!
//! [runner]
//! scenario_dir = "scenarios"
//! parallel = true
//! ```
//!
//! Environment variables prefixed `SIMPLEFIX__` override scalar values, e.g.
//! `SIMPLEFIX__RUNNER__LOGON_TIMEOUT_SECS=30`.

pub mod engine_config;
pub mod runner;

pub use engine_config::{load_config, ConfigValidationError, EngineConfig, SessionSettings};
pub use runner::RunnerSettings;

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "simplefixclient.cfg";
