//! # FIX Codec
//!
//! The wire rules layer between [`fix_types`] and the engine:
//!
//! - [`builder`]: serialise a [`FixMessage`](fix_types::FixMessage) with
//!   computed BodyLength (9) and CheckSum (10)
//! - [`parser`]: validate and decode one complete frame
//! - [`framing`]: cut complete frames out of a TCP byte stream, resynchronising
//!   after garbage
//!
//! ## What This Crate Does NOT Contain
//! - Sequence numbers, heartbeats or any session state (belongs in
//!   `fix-network`)
//! - Socket handling

pub mod builder;
pub mod error;
pub mod framing;
pub mod parser;

pub use builder::{checksum, encode};
pub use error::{ProtocolError, ProtocolResult};
pub use framing::FrameDecoder;
pub use parser::parse;

/// Render raw frame bytes for logs, SOH shown as `|`.
pub fn render(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).replace('\x01', "|")
}
