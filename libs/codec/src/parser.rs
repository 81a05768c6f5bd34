//! FIX frame parser.
//!
//! Parses one complete frame into a [`FixMessage`].
//!
//! ## Rules
//!
//! 1. Fields are delimited by SOH and the frame ends with SOH.
//! 2. The first field is BeginString (8), the second BodyLength (9).
//! 3. The last field is CheckSum (10); BodyLength and CheckSum must agree with
//!    the bytes actually present.
//! 4. MsgType (35) must be present.
//! 5. Every other field lands in the message's field list, in wire order.

use crate::builder::checksum;
use crate::error::{ProtocolError, ProtocolResult};
use fix_types::{tag, FixMessage, SOH};

struct RawField<'a> {
    tag: u32,
    value: &'a [u8],
    offset: usize,
}

pub fn parse(frame: &[u8]) -> ProtocolResult<FixMessage> {
    if frame.is_empty() {
        return Err(ProtocolError::EmptyInput);
    }
    if frame.last() != Some(&SOH) {
        return Err(ProtocolError::MissingChecksum);
    }

    let fields = split_fields(frame)?;
    if fields.len() < 4 {
        return Err(ProtocolError::MissingMsgType);
    }

    let first = &fields[0];
    if first.tag != tag::BEGIN_STRING {
        return Err(ProtocolError::MissingBeginString {
            found: first.tag.to_string(),
        });
    }
    let second = &fields[1];
    if second.tag != tag::BODY_LENGTH {
        return Err(ProtocolError::MissingBodyLength {
            found: second.tag.to_string(),
        });
    }
    let declared_len: usize = std::str::from_utf8(second.value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ProtocolError::malformed(second.value, second.offset))?;

    let last = &fields[fields.len() - 1];
    if last.tag != tag::CHECKSUM {
        return Err(ProtocolError::MissingChecksum);
    }
    let declared_sum: u8 = std::str::from_utf8(last.value)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| ProtocolError::malformed(last.value, last.offset))?;

    let body_start = fields[2].offset;
    let body_end = last.offset;
    let actual_len = body_end - body_start;
    if actual_len != declared_len {
        return Err(ProtocolError::BodyLengthMismatch {
            declared: declared_len,
            actual: actual_len,
        });
    }

    let computed = checksum(&frame[..body_end]);
    if computed != declared_sum {
        return Err(ProtocolError::InvalidChecksum {
            declared: declared_sum,
            computed,
        });
    }

    let mut message = FixMessage::new(String::new())
        .with_begin_string(String::from_utf8_lossy(first.value).into_owned());
    let mut msg_type = None;
    for field in &fields[2..fields.len() - 1] {
        let value = String::from_utf8_lossy(field.value).into_owned();
        if field.tag == tag::MSG_TYPE && msg_type.is_none() {
            msg_type = Some(value);
        } else {
            message.push(field.tag, value);
        }
    }
    message.msg_type = msg_type.ok_or(ProtocolError::MissingMsgType)?;
    Ok(message)
}

fn split_fields(frame: &[u8]) -> ProtocolResult<Vec<RawField<'_>>> {
    let mut fields = Vec::with_capacity(16);
    let mut offset = 0;
    // The trailing SOH leaves an empty final segment.
    for raw in frame[..frame.len() - 1].split(|b| *b == SOH) {
        let eq = raw
            .iter()
            .position(|b| *b == b'=')
            .ok_or_else(|| ProtocolError::malformed(raw, offset))?;
        let tag_bytes = &raw[..eq];
        let tag = parse_tag(tag_bytes).ok_or_else(|| ProtocolError::invalid_tag(tag_bytes, offset))?;
        fields.push(RawField {
            tag,
            value: &raw[eq + 1..],
            offset,
        });
        offset += raw.len() + 1;
    }
    Ok(fields)
}

fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 9 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let n = bytes
        .iter()
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
    (n > 0).then_some(n)
}
