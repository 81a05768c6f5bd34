//! Protocol-level errors for FIX frame processing.

use thiserror::Error;

/// Decoding and encoding failures with enough context to find the bad byte.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty frame")]
    EmptyInput,

    #[error("First field must be BeginString (8), found {found}")]
    MissingBeginString { found: String },

    #[error("Second field must be BodyLength (9), found {found}")]
    MissingBodyLength { found: String },

    #[error("BodyLength mismatch: declared {declared}, actual {actual}")]
    BodyLengthMismatch { declared: usize, actual: usize },

    #[error("Missing or misplaced CheckSum (10)")]
    MissingChecksum,

    #[error("Checksum mismatch: declared {declared:03}, computed {computed:03}")]
    InvalidChecksum { declared: u8, computed: u8 },

    #[error("Missing MsgType (35)")]
    MissingMsgType,

    #[error("Malformed field '{field}' at offset {offset}")]
    MalformedField { field: String, offset: usize },

    #[error("Invalid tag number '{tag}' at offset {offset}")]
    InvalidTag { tag: String, offset: usize },

    #[error("Frame of {size} bytes exceeds limit {limit}")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Garbled frame header, skipped {skipped} bytes")]
    Garbled { skipped: usize },

    #[error("Cannot encode message: {reason}")]
    Unencodable { reason: String },
}

pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

impl ProtocolError {
    pub fn malformed(field: &[u8], offset: usize) -> Self {
        Self::MalformedField {
            field: String::from_utf8_lossy(field).into_owned(),
            offset,
        }
    }

    pub fn invalid_tag(tag: &[u8], offset: usize) -> Self {
        Self::InvalidTag {
            tag: String::from_utf8_lossy(tag).into_owned(),
            offset,
        }
    }

    pub fn unencodable(reason: impl Into<String>) -> Self {
        Self::Unencodable {
            reason: reason.into(),
        }
    }

    /// Frame-level corruption: the stream resynchronises, the session goes on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::FrameTooLarge { .. } | Self::Unencodable { .. })
    }
}
