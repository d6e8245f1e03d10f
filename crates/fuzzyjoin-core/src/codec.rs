//! Key decoding
//!
//! Every key goes through [`decode_key`] before it reaches a similarity
//! algorithm, so opaque-binary and plain storage of the same text compare
//! identically. Raw encoded bytes are never compared.

use std::borrow::Cow;

use crate::error::DecodeError;
use crate::row::{Charset, FieldMeta, Value};

/// Decode a key cell into a string.
///
/// Returns `Ok(None)` for null cells.
pub fn decode_key<'a>(
    value: &'a Value,
    field: &FieldMeta,
) -> Result<Option<Cow<'a, str>>, DecodeError> {
    if field.is_opaque() {
        return match value {
            Value::Null => Ok(None),
            Value::Binary(bytes) => decode_bytes(bytes, field).map(Some),
            other => Err(DecodeError::NotEncoded {
                field: field.name.clone(),
                found: other.kind(),
            }),
        };
    }

    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Integer(n) => Cow::Owned(n.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Boolean(b) => Cow::Owned(if *b { "Y" } else { "N" }.to_string()),
        Value::Date(d) => Cow::Owned(d.format("%Y/%m/%d %H:%M:%S%.3f").to_string()),
        Value::Binary(_) => {
            return Err(DecodeError::NotText {
                field: field.name.clone(),
            })
        }
    };
    Ok(Some(text))
}

fn decode_bytes<'a>(bytes: &'a [u8], field: &FieldMeta) -> Result<Cow<'a, str>, DecodeError> {
    match field.charset {
        Charset::Utf8 => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| DecodeError::InvalidEncoding {
                field: field.name.clone(),
                charset: field.charset,
                reason: e.to_string(),
            }),
        // Every byte maps to the code point of the same value
        Charset::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
    }
}
