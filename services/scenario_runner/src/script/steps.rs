//! Scenario source format.
//!
//! ```toml
//! name = "limit order is acknowledged"
//! default_timeout_ms = 2000
//!
//! [[step]]
//! action = "send"
//! template = "limit_order"
//! capture = { order = "ClOrdID" }
//!
//! [[step]]
//! action = "expect"
//! kind = "ExecutionReport"
//! where = { ClOrdID = "${order}", OrdStatus = "0" }
//!
//! [[step]]
//! action = "expect_none"
//! kind = "OrderCancelReject"
//! timeout_ms = 1000
//! ```

use crate::error::ScriptError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub(crate) struct ScenarioFile {
    pub name: Option<String>,
    pub default_timeout_ms: Option<u64>,
    #[serde(default)]
    pub variables: toml::Table,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Step {
    Send {
        template: Option<String>,
        kind: Option<String>,
        #[serde(default)]
        fields: toml::Table,
        /// variable name -> field of the sent message
        #[serde(default)]
        capture: BTreeMap<String, String>,
    },
    Expect {
        kind: String,
        #[serde(default, rename = "where")]
        filter: toml::Table,
        timeout_ms: Option<u64>,
        /// variable name -> field of the matched message
        #[serde(default)]
        capture: BTreeMap<String, String>,
        #[serde(default)]
        optional: bool,
    },
    ExpectNone {
        kind: String,
        timeout_ms: Option<u64>,
    },
    Pause {
        millis: u64,
    },
    Log {
        message: String,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Send { .. } => "send",
            Step::Expect { .. } => "expect",
            Step::ExpectNone { .. } => "expect_none",
            Step::Pause { .. } => "pause",
            Step::Log { .. } => "log",
        }
    }
}

impl ScenarioFile {
    pub async fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScriptError::SourceMissing(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ScriptError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|e| ScriptError::parse(path, e))
    }
}
