//! Mapping resolution: pulls named fields out of a decrypted document.
//!
//! Each mapping entry is decoded and resolved independently. An entry that
//! is malformed, a path that does not exist or an encoding that is not
//! supported degrades that one field to `null`; the rest of the batch is
//! unaffected.

mod encoding;
mod path;

pub use encoding::{DEFAULT_ENCODING, resolve_encoding};
pub use path::{PathStep, resolve_path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// How to extract and encode one output field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub path: Vec<PathStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl Mapping {
    /// Decodes one entry of a mapping set.
    ///
    /// # Errors
    ///
    /// Returns an error if `entry` is not an object with a `path` array of
    /// keys and integer positions, or if `encoding` is not a string.
    pub fn from_entry(entry: &Value) -> serde_json::Result<Self> {
        Mapping::deserialize(entry)
    }
}

/// Output field name to its raw mapping entry, decoded per field.
pub type Mappings = BTreeMap<String, Value>;

/// Output field name to resolved value; `None` serializes as `null`.
pub type ResolvedOutput = BTreeMap<String, Option<String>>;

/// Resolves a single mapping entry, logging and returning `None` on failure.
pub fn resolve_mapping(document: &Value, name: &str, entry: &Value) -> Option<String> {
    let mapping = match Mapping::from_entry(entry) {
        Ok(mapping) => mapping,
        Err(e) => {
            warn!(field = name, error = %e, "Failed to decode mapping");
            return None;
        }
    };

    let value = match resolve_path(document, &mapping.path) {
        Ok(value) => value,
        Err(e) => {
            warn!(field = name, error = %e, "Failed to resolve path");
            return None;
        }
    };

    match resolve_encoding(value, mapping.encoding.as_deref()) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            warn!(field = name, error = %e, "Failed to resolve encoding");
            None
        }
    }
}

/// Resolves every mapping. The result always has exactly the names of `mappings`.
pub fn resolve_mappings(document: &Value, mappings: &Mappings) -> ResolvedOutput {
    mappings
        .iter()
        .map(|(name, entry)| (name.clone(), resolve_mapping(document, name, entry)))
        .collect()
}

/// Parses the JSON-encoded mapping set carried in the resource properties.
///
/// Only the outer shape is checked here; entries are decoded when resolved.
///
/// # Errors
///
/// Returns an error if `raw` is not a JSON object.
pub fn parse_mappings(raw: &str) -> serde_json::Result<Mappings> {
    serde_json::from_str(raw)
}
