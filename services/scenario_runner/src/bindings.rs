//! The fixed set of names a scenario script can see.
//!
//! `connection` is the session's [`Connection`]; every application message
//! kind is bound under its name (`NewOrderSingle`, `ExecutionReport`, ...).
//! Nothing else is exposed.

use crate::connection::Connection;
use fix_types::MessageKind;
use std::sync::Arc;

pub const CONNECTION: &str = "connection";

#[derive(Clone)]
pub enum Binding {
    Connection(Arc<Connection>),
    Kind(MessageKind),
}

/// Kind bound under `name`, if any. Administrative kinds are not bound.
pub fn kind(name: &str) -> Option<MessageKind> {
    MessageKind::application().find(|k| k.name() == name)
}

#[derive(Clone)]
pub struct ScenarioBindings {
    connection: Arc<Connection>,
}

impl ScenarioBindings {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn kind(&self, name: &str) -> Option<MessageKind> {
        kind(name)
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        if name == CONNECTION {
            return Some(Binding::Connection(self.connection.clone()));
        }
        kind(name).map(Binding::Kind)
    }

    /// Every bound name, `connection` first.
    pub fn names() -> Vec<&'static str> {
        std::iter::once(CONNECTION)
            .chain(MessageKind::application().map(MessageKind::name))
            .collect()
    }
}
