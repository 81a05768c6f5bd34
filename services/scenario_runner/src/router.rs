//! Inbound router.
//!
//! The engine calls one [`InboundHandler`] for every session; the router
//! forwards each message to the [`Connection`] registered for that session.
//! Messages for sessions with no live connection (before logon completes or
//! after logoff) are dropped and counted.

use crate::connection::Connection;
use dashmap::DashMap;
use fix_network::{InboundHandler, SessionId};
use fix_types::{FixMessage, MessageEnvelope};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
pub struct InboundRouter {
    connections: DashMap<SessionId, Arc<Connection>>,
    unrouted: AtomicU64,
}

impl InboundRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection: Arc<Connection>) {
        let id = connection.session_id().clone();
        debug!(session = %id, "Connection registered");
        self.connections.insert(id, connection);
    }

    pub fn unregister(&self, id: &SessionId) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(id).map(|(_, connection)| connection);
        if removed.is_some() {
            debug!(session = %id, "Connection unregistered");
        }
        removed
    }

    pub fn is_registered(&self, id: &SessionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Messages that arrived with no connection to take them.
    pub fn unrouted(&self) -> u64 {
        self.unrouted.load(Ordering::Relaxed)
    }
}

impl InboundHandler for InboundRouter {
    fn on_inbound(&self, session: &SessionId, message: FixMessage) {
        let connection = self.connections.get(session).map(|c| c.value().clone());
        match connection {
            Some(connection) => connection.on_inbound(MessageEnvelope::new(message)),
            None => {
                self.unrouted.fetch_add(1, Ordering::Relaxed);
                debug!(session = %session, kind = %message.kind(), "No connection registered, dropping inbound message");
            }
        }
    }

    fn on_logon(&self, session: &SessionId) {
        info!(session = %session, "Engine reports logon");
    }

    fn on_logout(&self, session: &SessionId) {
        info!(session = %session, "Engine reports logout");
    }
}
