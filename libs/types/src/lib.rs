//! # FIX Types
//!
//! Pure data vocabulary shared by every crate in the workspace:
//!
//! - [`tag`]: tag number constants and a name table used by scenario scripts
//! - [`MessageKind`]: the enumerated MsgType (35) vocabulary used to tag and
//!   filter traffic
//! - [`FixMessage`]: an ordered tag/value field list
//! - [`MessageEnvelope`]: an immutable, classified message as it travels
//!   between the engine and a waiting scenario
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types -> libs/codec -> libs/network -> services/scenario_runner
//!  vocabulary    wire rules    FIX sessions    mailbox / lifecycle
//! ```
//!
//! Nothing in this crate performs I/O or holds locks.

pub mod envelope;
pub mod kind;
pub mod message;
pub mod tag;

pub use envelope::MessageEnvelope;
pub use kind::{KindError, MessageKind};
pub use message::{FixMessage, SOH};
