//! Connection: the scenario-facing facade of one logged-on session.
//!
//! Outbound messages go straight to the engine session; inbound ones land in
//! the connection's [`Mailbox`]. A connection lives for exactly one logon
//! cycle and is never reused.

use crate::error::ConnectionError;
use crate::mailbox::{Absence, Mailbox};
use fix_network::{SessionHandle, SessionId, TransportError};
use fix_types::{FixMessage, MessageEnvelope, MessageKind};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub sent: u64,
    pub received: u64,
    /// Inbound messages refused because the mailbox was full.
    pub dropped: u64,
    /// Inbound messages still unread.
    pub pending: usize,
}

pub struct Connection {
    session: Arc<dyn SessionHandle>,
    mailbox: Mailbox,
    sent: AtomicU64,
    received: AtomicU64,
}

impl Connection {
    /// Bind a logged-on session to a fresh mailbox.
    pub fn new(
        session: Arc<dyn SessionHandle>,
        mailbox_capacity: usize,
    ) -> Result<Self, ConnectionError> {
        if !session.is_logged_on() {
            return Err(ConnectionError::NotLoggedOn {
                session: session.id().to_string(),
            });
        }
        Ok(Self {
            session,
            mailbox: Mailbox::new(mailbox_capacity),
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
        })
    }

    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    pub fn send(&self, message: FixMessage) -> Result<(), ConnectionError> {
        if !self.session.is_logged_on() {
            return Err(self.not_logged_on());
        }
        debug!(session = %self.session_id(), kind = %message.kind(), message = %message, "Sending");
        match self.session.send(message) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TransportError::NotLoggedOn { .. }) => Err(self.not_logged_on()),
            Err(e) => Err(e.into()),
        }
    }

    /// Engine delivery path. Short critical section, never waits on the scenario.
    pub fn on_inbound(&self, envelope: MessageEnvelope) {
        self.received.fetch_add(1, Ordering::Relaxed);
        debug!(session = %self.session_id(), kind = %envelope.kind(), "Inbound buffered");
        // Refusals are logged by the mailbox and reported on the next wait.
        let _ = self.mailbox.push(envelope);
    }

    pub async fn expect<P>(
        &self,
        kind: MessageKind,
        predicate: P,
        timeout: Duration,
    ) -> Result<MessageEnvelope, ConnectionError>
    where
        P: Fn(&MessageEnvelope) -> bool,
    {
        debug!(session = %self.session_id(), kind = %kind, timeout_ms = timeout.as_millis() as u64, "Expecting");
        Ok(self.mailbox.await_match(kind, predicate, timeout).await?)
    }

    pub async fn expect_none(
        &self,
        kind: MessageKind,
        timeout: Duration,
    ) -> Result<Absence, ConnectionError> {
        debug!(session = %self.session_id(), kind = %kind, timeout_ms = timeout.as_millis() as u64, "Expecting none");
        Ok(self.mailbox.await_absence(kind, timeout).await?)
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            dropped: self.mailbox.dropped(),
            pending: self.mailbox.len(),
        }
    }

    /// Discard unread inbound messages. Returns how many were dropped.
    pub fn teardown(&self) -> usize {
        let unread = self.mailbox.clear();
        if unread > 0 {
            info!(session = %self.session_id(), unread, "Discarding unread inbound messages");
        }
        unread
    }

    fn not_logged_on(&self) -> ConnectionError {
        ConnectionError::NotLoggedOn {
            session: self.session_id().to_string(),
        }
    }
}
