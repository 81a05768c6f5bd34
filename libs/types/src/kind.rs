//! Message kind vocabulary.
//!
//! A [`MessageKind`] is the classification tag of a FIX message, derived from
//! MsgType (35). The vocabulary is static and read-only, so it is shared
//! freely across sessions and handed to scenario scripts by name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KindError {
    #[error("Unknown message kind name '{0}'")]
    UnknownName(String),
}

/// Enumerated FIX message kinds.
///
/// Application kinds are what scenarios send and expect. Administrative kinds
/// are handled by the engine and never reach a mailbox. MsgType values with
/// no variant classify as [`MessageKind::Unknown`] and are still delivered, so
/// scripts can assert on unexpected traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    // Administrative
    Heartbeat,
    TestRequest,
    ResendRequest,
    Reject,
    SequenceReset,
    Logout,
    Logon,

    // Application
    NewOrderSingle,
    ExecutionReport,
    OrderCancelRequest,
    OrderCancelReplaceRequest,
    OrderCancelReject,
    OrderStatusRequest,
    BusinessMessageReject,
    QuoteRequest,
    Quote,
    QuoteCancel,
    QuoteRequestReject,
    MarketDataRequest,
    MarketDataSnapshotFullRefresh,
    MarketDataIncrementalRefresh,
    MarketDataRequestReject,
    News,

    Unknown,
}

impl MessageKind {
    /// Every kind, in declaration order.
    pub const ALL: [MessageKind; 24] = [
        MessageKind::Heartbeat,
        MessageKind::TestRequest,
        MessageKind::ResendRequest,
        MessageKind::Reject,
        MessageKind::SequenceReset,
        MessageKind::Logout,
        MessageKind::Logon,
        MessageKind::NewOrderSingle,
        MessageKind::ExecutionReport,
        MessageKind::OrderCancelRequest,
        MessageKind::OrderCancelReplaceRequest,
        MessageKind::OrderCancelReject,
        MessageKind::OrderStatusRequest,
        MessageKind::BusinessMessageReject,
        MessageKind::QuoteRequest,
        MessageKind::Quote,
        MessageKind::QuoteCancel,
        MessageKind::QuoteRequestReject,
        MessageKind::MarketDataRequest,
        MessageKind::MarketDataSnapshotFullRefresh,
        MessageKind::MarketDataIncrementalRefresh,
        MessageKind::MarketDataRequestReject,
        MessageKind::News,
        MessageKind::Unknown,
    ];

    /// MsgType (35) value for this kind. `Unknown` has none.
    pub fn msg_type(self) -> Option<&'static str> {
        let value = match self {
            MessageKind::Heartbeat => "0",
            MessageKind::TestRequest => "1",
            MessageKind::ResendRequest => "2",
            MessageKind::Reject => "3",
            MessageKind::SequenceReset => "4",
            MessageKind::Logout => "5",
            MessageKind::Logon => "A",
            MessageKind::NewOrderSingle => "D",
            MessageKind::ExecutionReport => "8",
            MessageKind::OrderCancelRequest => "F",
            MessageKind::OrderCancelReplaceRequest => "G",
            MessageKind::OrderCancelReject => "9",
            MessageKind::OrderStatusRequest => "H",
            MessageKind::BusinessMessageReject => "j",
            MessageKind::QuoteRequest => "R",
            MessageKind::Quote => "S",
            MessageKind::QuoteCancel => "Z",
            MessageKind::QuoteRequestReject => "AG",
            MessageKind::MarketDataRequest => "V",
            MessageKind::MarketDataSnapshotFullRefresh => "W",
            MessageKind::MarketDataIncrementalRefresh => "X",
            MessageKind::MarketDataRequestReject => "Y",
            MessageKind::News => "B",
            MessageKind::Unknown => return None,
        };
        Some(value)
    }

    /// Classify a MsgType (35) value.
    pub fn from_msg_type(msg_type: &str) -> MessageKind {
        MessageKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.msg_type() == Some(msg_type))
            .unwrap_or(MessageKind::Unknown)
    }

    /// Session-level message handled by the engine itself.
    pub fn is_admin(self) -> bool {
        matches!(
            self,
            MessageKind::Heartbeat
                | MessageKind::TestRequest
                | MessageKind::ResendRequest
                | MessageKind::Reject
                | MessageKind::SequenceReset
                | MessageKind::Logout
                | MessageKind::Logon
        )
    }

    /// Kinds that may appear in a scenario's traffic.
    pub fn application() -> impl Iterator<Item = MessageKind> {
        MessageKind::ALL.into_iter().filter(|k| !k.is_admin())
    }

    /// Name under which the kind is exposed to scenario scripts.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Heartbeat => "Heartbeat",
            MessageKind::TestRequest => "TestRequest",
            MessageKind::ResendRequest => "ResendRequest",
            MessageKind::Reject => "Reject",
            MessageKind::SequenceReset => "SequenceReset",
            MessageKind::Logout => "Logout",
            MessageKind::Logon => "Logon",
            MessageKind::NewOrderSingle => "NewOrderSingle",
            MessageKind::ExecutionReport => "ExecutionReport",
            MessageKind::OrderCancelRequest => "OrderCancelRequest",
            MessageKind::OrderCancelReplaceRequest => "OrderCancelReplaceRequest",
            MessageKind::OrderCancelReject => "OrderCancelReject",
            MessageKind::OrderStatusRequest => "OrderStatusRequest",
            MessageKind::BusinessMessageReject => "BusinessMessageReject",
            MessageKind::QuoteRequest => "QuoteRequest",
            MessageKind::Quote => "Quote",
            MessageKind::QuoteCancel => "QuoteCancel",
            MessageKind::QuoteRequestReject => "QuoteRequestReject",
            MessageKind::MarketDataRequest => "MarketDataRequest",
            MessageKind::MarketDataSnapshotFullRefresh => "MarketDataSnapshotFullRefresh",
            MessageKind::MarketDataIncrementalRefresh => "MarketDataIncrementalRefresh",
            MessageKind::MarketDataRequestReject => "MarketDataRequestReject",
            MessageKind::News => "News",
            MessageKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MessageKind {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| KindError::UnknownName(s.to_string()))
    }
}
