//! FIX message serialisation.
//!
//! Layout produced by [`encode`]:
//!
//! ```text
//! 8=<begin>|9=<len>|35=<type>|<fields in order>|10=<sum>|
//!              \_____________ len bytes _______/
//! ```
//!
//! The checksum is the byte sum of everything before `10=`, modulo 256,
//! rendered as three digits.

use crate::error::{ProtocolError, ProtocolResult};
use fix_types::{tag, FixMessage, SOH};

/// Serialise `message` to wire format.
///
/// Framing tags present in the field list (8, 9, 10, 35) are ignored; they are
/// always derived from the message itself.
pub fn encode(message: &FixMessage) -> ProtocolResult<Vec<u8>> {
    if message.begin_string.is_empty() {
        return Err(ProtocolError::unencodable("BeginString not set"));
    }
    if message.msg_type.is_empty() {
        return Err(ProtocolError::unencodable("MsgType not set"));
    }

    let mut body = Vec::with_capacity(64 + message.fields().len() * 16);
    append_field(&mut body, tag::MSG_TYPE, &message.msg_type)?;
    for (t, v) in message.fields() {
        if matches!(
            *t,
            tag::BEGIN_STRING | tag::BODY_LENGTH | tag::CHECKSUM | tag::MSG_TYPE
        ) {
            continue;
        }
        append_field(&mut body, *t, v)?;
    }

    let mut out = Vec::with_capacity(body.len() + 32);
    append_field(&mut out, tag::BEGIN_STRING, &message.begin_string)?;
    append_field(&mut out, tag::BODY_LENGTH, &body.len().to_string())?;
    out.extend_from_slice(&body);

    let sum = checksum(&out);
    out.extend_from_slice(format!("10={:03}", sum).as_bytes());
    out.push(SOH);
    Ok(out)
}

/// Sum of all bytes modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn append_field(buf: &mut Vec<u8>, tag: u32, value: &str) -> ProtocolResult<()> {
    if value.as_bytes().contains(&SOH) {
        return Err(ProtocolError::unencodable(format!(
            "value of tag {} contains SOH",
            tag
        )));
    }
    buf.extend_from_slice(tag.to_string().as_bytes());
    buf.push(b'=');
    buf.extend_from_slice(value.as_bytes());
    buf.push(SOH);
    Ok(())
}
