//! Classified, immutable message envelopes.

use crate::kind::MessageKind;
use crate::message::FixMessage;
use crate::tag;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A received (or about to be sent) application message plus its kind.
///
/// Envelopes are immutable once built; clones share the message body.
#[derive(Debug, Clone)]
pub struct MessageEnvelope {
    kind: MessageKind,
    message: Arc<FixMessage>,
    received_at: DateTime<Utc>,
}

impl MessageEnvelope {
    pub fn new(message: FixMessage) -> Self {
        Self {
            kind: message.kind(),
            message: Arc::new(message),
            received_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn message(&self) -> &FixMessage {
        &self.message
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn field(&self, tag: u32) -> Option<&str> {
        self.message.get(tag)
    }

    pub fn cl_ord_id(&self) -> Option<&str> {
        self.field(tag::CL_ORD_ID)
    }

    pub fn order_id(&self) -> Option<&str> {
        self.field(tag::ORDER_ID)
    }

    pub fn ord_status(&self) -> Option<&str> {
        self.field(tag::ORD_STATUS)
    }

    /// True when every `(tag, value)` pair is present with an equal value.
    pub fn matches_fields<'a, I>(&self, expected: I) -> bool
    where
        I: IntoIterator<Item = (u32, &'a str)>,
    {
        expected
            .into_iter()
            .all(|(t, v)| self.message.get(t) == Some(v))
    }
}

impl From<FixMessage> for MessageEnvelope {
    fn from(message: FixMessage) -> Self {
        Self::new(message)
    }
}
