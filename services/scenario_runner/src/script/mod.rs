//! Scenario scripting.
//!
//! The lifecycle controller only knows the [`ScenarioEngine`] trait: load the
//! shared definitions once, then run one scenario source per session against
//! that session's [`ScenarioBindings`]. [`StepScriptEngine`] is the engine the
//! binary ships with, a declarative TOML step interpreter.

mod definitions;
mod interpreter;
mod steps;
mod values;

pub use definitions::{Definitions, Template};
pub use interpreter::StepScriptEngine;

use crate::bindings::ScenarioBindings;
use crate::error::ScriptError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub name: Option<String>,
    pub steps: usize,
    /// Optional expectations that were not met.
    pub skipped: usize,
}

#[async_trait]
pub trait ScenarioEngine: Send + Sync {
    /// Load the shared definitions source. Called once per process, before
    /// any session runs.
    fn load_definitions(&mut self, path: &Path) -> Result<(), ScriptError>;

    /// Execute `source` to completion. A missing source is
    /// [`ScriptError::SourceMissing`].
    async fn run(
        &self,
        source: &Path,
        bindings: ScenarioBindings,
    ) -> Result<ScriptSummary, ScriptError>;
}
