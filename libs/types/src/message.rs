//! FIX message representation.
//!
//! A [`FixMessage`] keeps its body fields as an ordered `Vec` so repeating
//! groups and duplicate tags survive a decode/encode cycle. The framing tags
//! 8 (BeginString), 9 (BodyLength) and 10 (CheckSum) are never stored in the
//! field list; BeginString has its own slot and the other two are computed by
//! the codec.

use crate::kind::MessageKind;
use crate::tag;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SOH byte, the FIX field delimiter.
pub const SOH: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixMessage {
    /// Tag 8. Empty until the engine stamps it on send.
    pub begin_string: String,
    /// Tag 35.
    pub msg_type: String,
    fields: Vec<(u32, String)>,
}

impl FixMessage {
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            begin_string: String::new(),
            msg_type: msg_type.into(),
            fields: Vec::new(),
        }
    }

    /// Message of a known kind. `Unknown` yields an empty MsgType, which the
    /// codec refuses to encode.
    pub fn of_kind(kind: MessageKind) -> Self {
        Self::new(kind.msg_type().unwrap_or_default())
    }

    pub fn with_begin_string(mut self, begin_string: impl Into<String>) -> Self {
        self.begin_string = begin_string.into();
        self
    }

    /// Builder-style [`FixMessage::set`].
    pub fn with(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.set(tag, value);
        self
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::from_msg_type(&self.msg_type)
    }

    /// Replace the first occurrence of `tag`, or append it.
    pub fn set(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((tag, value)),
        }
        self
    }

    /// Append without replacing (repeating groups).
    pub fn push(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        self.fields.push((tag, value.into()));
        self
    }

    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_u64(&self, tag: u32) -> Option<u64> {
        self.get(tag)?.parse().ok()
    }

    pub fn get_all(&self, tag: u32) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(move |(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.fields.iter().any(|(t, _)| *t == tag)
    }

    /// Remove every occurrence of `tag`, returning the first value.
    pub fn remove(&mut self, tag: u32) -> Option<String> {
        let first = self.get(tag).map(str::to_string);
        self.fields.retain(|(t, _)| *t != tag);
        first
    }

    pub fn fields(&self) -> &[(u32, String)] {
        &self.fields
    }

    /// Body fields that are not engine-owned header fields.
    pub fn body_fields(&self) -> impl Iterator<Item = &(u32, String)> {
        self.fields.iter().filter(|(t, _)| !tag::is_header(*t))
    }

    pub fn seq_num(&self) -> Option<u64> {
        self.get_u64(tag::MSG_SEQ_NUM)
    }
}

/// Pipe-delimited rendering, the form FIX logs conventionally use.
impl fmt::Display for FixMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.begin_string.is_empty() {
            write!(f, "8={}|", self.begin_string)?;
        }
        write!(f, "35={}|", self.msg_type)?;
        for (t, v) in &self.fields {
            write!(f, "{}={}|", t, v)?;
        }
        Ok(())
    }
}
