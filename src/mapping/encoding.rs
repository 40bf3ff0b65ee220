use serde::Serialize;
use serde_json::Value;
use serde_json::ser::Formatter;
use std::io;

use crate::error::EncodingError;

pub const DEFAULT_ENCODING: &str = "string";

/// Renders a resolved value as the final secret string.
///
/// `None` means the default, `"string"`.
///
/// # Errors
///
/// Returns [`EncodingError::Unsupported`] for any tag other than `"string"`
/// or `"json"`.
pub fn resolve_encoding(value: &Value, encoding: Option<&str>) -> Result<String, EncodingError> {
    match encoding.unwrap_or(DEFAULT_ENCODING) {
        "string" => Ok(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        "json" => to_spaced_json(value),
        other => Err(EncodingError::Unsupported(other.to_string())),
    }
}

/// Serializes with `", "` between items and `": "` after keys.
fn to_spaced_json(value: &Value) -> Result<String, EncodingError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
