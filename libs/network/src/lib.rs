//! FIX Engine
//!
//! Client-side FIX session layer: a [`SocketInitiator`] drives one TCP
//! connection per configured session, performs the Logon/Logout handshakes,
//! answers heartbeats and test requests, and hands inbound application
//! messages to an [`InboundHandler`].
//!
//! The runner only sees the [`FixEngine`] and [`SessionHandle`] traits, so
//! tests can substitute in-memory sessions.

pub mod engine;
pub mod error;
pub mod initiator;
pub mod session;

pub use engine::FixEngine;
pub use error::{Result, TransportError};
pub use initiator::{InitiatorSession, SocketInitiator};
pub use session::{InboundHandler, SessionConfig, SessionHandle, SessionId, SessionStatus};
