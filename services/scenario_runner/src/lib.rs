//! # SimpleFIX Scenario Runner
//!
//! Drives scripted scenarios against a FIX counterparty, one per configured
//! session: log on, run the session's scenario, log off, report.
//!
//! ## Architecture
//!
//! ```text
//! engine reader task -> InboundRouter -> Connection -> Mailbox
//!                                                         ^
//! scenario script -> Connection::send / expect / expect_none
//! ```
//!
//! - [`mailbox`]: notification-backed buffer with first-match waits
//! - [`connection`]: per-session send/expect facade
//! - [`lifecycle`]: connect, logon wait, run, logoff state machine
//! - [`orchestrator`]: runs controllers sequentially or concurrently
//! - [`script`]: scenario engine trait and the TOML step interpreter
//! - [`app`]: the process pipeline behind the `simplefixclient` binary

pub mod app;
pub mod bindings;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod mailbox;
pub mod orchestrator;
pub mod report;
pub mod router;
pub mod script;

#[cfg(test)]
mod test_support;

pub use bindings::{Binding, ScenarioBindings};
pub use connection::{Connection, ConnectionStats};
pub use error::{ConnectionError, FailureCause, MailboxError, Result, RunnerError, ScriptError};
pub use lifecycle::{LifecycleController, ScenarioResult, SessionPhase};
pub use mailbox::{Absence, Mailbox};
pub use orchestrator::{Orchestrator, RunSummary};
pub use router::InboundRouter;
pub use script::{ScenarioEngine, ScriptSummary, StepScriptEngine};
