//! TOML step interpreter.

use super::definitions::Definitions;
use super::steps::{ScenarioFile, Step};
use super::values::{field_table, resolve_tag, scalar, substitute, Variables};
use super::{ScenarioEngine, ScriptSummary};
use crate::bindings::ScenarioBindings;
use crate::error::{ConnectionError, ScriptError};
use crate::mailbox::Absence;
use async_trait::async_trait;
use fix_types::{FixMessage, MessageEnvelope, MessageKind};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct StepScriptEngine {
    definitions: Definitions,
}

impl Default for StepScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StepScriptEngine {
    pub fn new() -> Self {
        Self::with_definitions(Definitions::default())
    }

    pub fn with_definitions(definitions: Definitions) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }
}

#[async_trait]
impl ScenarioEngine for StepScriptEngine {
    fn load_definitions(&mut self, path: &Path) -> Result<(), ScriptError> {
        self.definitions = Definitions::load(path)?;
        Ok(())
    }

    async fn run(
        &self,
        source: &Path,
        bindings: ScenarioBindings,
    ) -> Result<ScriptSummary, ScriptError> {
        let scenario = ScenarioFile::load(source).await?;
        let mut run = ScriptRun::new(&self.definitions, &scenario, &bindings)?;

        info!(
            session = %bindings.connection().session_id(),
            scenario = scenario.name.as_deref().unwrap_or("<unnamed>"),
            steps = scenario.steps.len(),
            "Running scenario"
        );
        for (index, step) in scenario.steps.iter().enumerate() {
            run.execute(index + 1, step).await?;
        }

        Ok(ScriptSummary {
            name: scenario.name.clone(),
            steps: scenario.steps.len(),
            skipped: run.skipped,
        })
    }
}

/// State of one scenario execution.
struct ScriptRun<'a> {
    definitions: &'a Definitions,
    bindings: &'a ScenarioBindings,
    variables: Variables,
    default_timeout: Duration,
    skipped: usize,
}

impl<'a> ScriptRun<'a> {
    fn new(
        definitions: &'a Definitions,
        scenario: &ScenarioFile,
        bindings: &'a ScenarioBindings,
    ) -> Result<Self, ScriptError> {
        let id = bindings.connection().session_id();
        let mut variables = definitions.variables.clone();
        variables.insert("session".into(), id.to_string());
        variables.insert("qualifier".into(), id.qualifier.clone());
        variables.insert("sender_comp_id".into(), id.sender_comp_id.clone());
        variables.insert("target_comp_id".into(), id.target_comp_id.clone());

        // Scenario variables may refer to definitions variables.
        for (name, value) in &scenario.variables {
            let text = substitute(&scalar(name, value)?, &variables)?;
            variables.insert(name.clone(), text);
        }

        Ok(Self {
            definitions,
            bindings,
            variables,
            default_timeout: scenario
                .default_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
            skipped: 0,
        })
    }

    async fn execute(&mut self, number: usize, step: &Step) -> Result<(), ScriptError> {
        debug!(step = number, action = step.action(), "Executing step");
        match step {
            Step::Send {
                template,
                kind,
                fields,
                capture,
            } => self.send(number, template.as_deref(), kind.as_deref(), fields, capture),
            Step::Expect {
                kind,
                filter,
                timeout_ms,
                capture,
                optional,
            } => {
                self.expect(number, kind, filter, *timeout_ms, capture, *optional)
                    .await
            }
            Step::ExpectNone { kind, timeout_ms } => {
                self.expect_none(number, kind, *timeout_ms).await
            }
            Step::Pause { millis } => {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
                Ok(())
            }
            Step::Log { message } => {
                let text = substitute(message, &self.variables)?;
                info!(
                    session = %self.bindings.connection().session_id(),
                    step = number,
                    "{}",
                    text
                );
                Ok(())
            }
        }
    }

    fn send(
        &mut self,
        number: usize,
        template: Option<&str>,
        kind: Option<&str>,
        overrides: &toml::Table,
        capture: &BTreeMap<String, String>,
    ) -> Result<(), ScriptError> {
        let (kind, mut fields) = match (template, kind) {
            (Some(name), kind) => {
                let template = self.definitions.template(name)?;
                let kind = match kind {
                    Some(kind) => self.kind(kind)?,
                    None => template.kind,
                };
                (kind, template.fields.clone())
            }
            (None, Some(kind)) => (self.kind(kind)?, Vec::new()),
            (None, None) => {
                return Err(ScriptError::invalid_step(
                    number,
                    "send needs a template or a kind",
                ))
            }
        };
        for (tag, value) in field_table(overrides)? {
            match fields.iter_mut().find(|(t, _)| *t == tag) {
                Some(slot) => slot.1 = value,
                None => fields.push((tag, value)),
            }
        }

        let mut message = FixMessage::of_kind(kind);
        for (tag, raw) in &fields {
            message.set(*tag, substitute(raw, &self.variables)?);
        }
        for (variable, field) in capture {
            let tag = resolve_tag(field)?;
            let value = message.get(tag).ok_or_else(|| ScriptError::CaptureMissing {
                step: number,
                tag,
                variable: variable.clone(),
            })?;
            self.variables.insert(variable.clone(), value.to_string());
        }

        self.bindings
            .connection()
            .send(message)
            .map_err(|source| ScriptError::Connection {
                step: number,
                source,
            })
    }

    async fn expect(
        &mut self,
        number: usize,
        kind: &str,
        filter: &toml::Table,
        timeout_ms: Option<u64>,
        capture: &BTreeMap<String, String>,
        optional: bool,
    ) -> Result<(), ScriptError> {
        let kind = self.kind(kind)?;
        let filter = field_table(filter)?
            .into_iter()
            .map(|(tag, raw)| Ok((tag, substitute(&raw, &self.variables)?)))
            .collect::<Result<Vec<_>, ScriptError>>()?;
        let timeout = self.timeout(timeout_ms);

        let matches = |envelope: &MessageEnvelope| {
            envelope.matches_fields(filter.iter().map(|(t, v)| (*t, v.as_str())))
        };
        let envelope = match self
            .bindings
            .connection()
            .expect(kind, matches, timeout)
            .await
        {
            Ok(envelope) => envelope,
            Err(ConnectionError::ExpectationTimeout { .. }) if optional => {
                info!(step = number, kind = %kind, "Optional expectation not met");
                self.skipped += 1;
                return Ok(());
            }
            Err(source) => {
                return Err(ScriptError::Connection {
                    step: number,
                    source,
                })
            }
        };
        debug!(step = number, kind = %kind, message = %envelope.message(), "Expectation met");

        for (variable, field) in capture {
            let tag = resolve_tag(field)?;
            let value = envelope.field(tag).ok_or_else(|| ScriptError::CaptureMissing {
                step: number,
                tag,
                variable: variable.clone(),
            })?;
            self.variables.insert(variable.clone(), value.to_string());
        }
        Ok(())
    }

    async fn expect_none(
        &mut self,
        number: usize,
        kind: &str,
        timeout_ms: Option<u64>,
    ) -> Result<(), ScriptError> {
        let kind = self.kind(kind)?;
        let timeout = self.timeout(timeout_ms);
        match self
            .bindings
            .connection()
            .expect_none(kind, timeout)
            .await
            .map_err(|source| ScriptError::Connection {
                step: number,
                source,
            })? {
            Absence::Absent => Ok(()),
            Absence::Present(envelope) => Err(ScriptError::UnexpectedMessage {
                step: number,
                kind,
                message: envelope.message().to_string(),
            }),
        }
    }

    fn kind(&self, name: &str) -> Result<MessageKind, ScriptError> {
        self.bindings
            .kind(name)
            .ok_or_else(|| ScriptError::UnknownKind(name.to_string()))
    }

    fn timeout(&self, timeout_ms: Option<u64>) -> Duration {
        timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout)
    }
}
