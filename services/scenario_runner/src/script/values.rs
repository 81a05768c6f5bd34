//! Field keys, scalar values and `${name}` substitution.

use crate::error::ScriptError;
use fix_types::tag;
use std::collections::HashMap;
use uuid::Uuid;

pub(crate) type Variables = HashMap<String, String>;

/// Expands to a fresh unique id at every use.
const UID: &str = "uid";

/// Tag number or known field name.
pub(crate) fn resolve_tag(key: &str) -> Result<u32, ScriptError> {
    tag::resolve(key).ok_or_else(|| ScriptError::UnknownField(key.to_string()))
}

/// Scalar TOML value as FIX field text. Booleans become `Y`/`N`.
pub(crate) fn scalar(field: &str, value: &toml::Value) -> Result<String, ScriptError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(if *b { "Y" } else { "N" }.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => Err(ScriptError::InvalidValue {
            field: field.to_string(),
        }),
    }
}

/// Resolve a `fields`/`where` table to `(tag, raw text)` pairs, sorted by tag.
pub(crate) fn field_table(table: &toml::Table) -> Result<Vec<(u32, String)>, ScriptError> {
    let mut fields = table
        .iter()
        .map(|(key, value)| Ok((resolve_tag(key)?, scalar(key, value)?)))
        .collect::<Result<Vec<_>, ScriptError>>()?;
    fields.sort_by_key(|(t, _)| *t);
    Ok(fields)
}

/// Replace every `${name}` in `text`.
pub(crate) fn substitute(text: &str, variables: &Variables) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: keep literally.
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = after[..end].trim();
        if name == UID {
            out.push_str(&Uuid::new_v4().simple().to_string());
        } else {
            let value = variables
                .get(name)
                .ok_or_else(|| ScriptError::UndefinedVariable(name.to_string()))?;
            out.push_str(value);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
