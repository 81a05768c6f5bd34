//! End-to-end test support for the scenario runner
//!
//! Runs the full pipeline (configuration file, definitions, engine,
//! orchestrator, report) against an in-process FIX acceptor.

pub mod fixtures;

pub use fixtures::{AcceptorBehaviour, MockAcceptor, RunFixture};
