use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::LookupError;

/// One step of a mapping path: an object key or an array position.
///
/// Negative positions count from the end of an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    Index(i64),
    Key(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Index(i) => write!(f, "[{i}]"),
            PathStep::Key(k) => write!(f, "{k:?}"),
        }
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_string())
    }
}

impl From<i64> for PathStep {
    fn from(index: i64) -> Self {
        PathStep::Index(index)
    }
}

/// Walks `document` along `path` and returns the value at the last step.
///
/// Keys index objects, positions index arrays. A key made only of ASCII
/// digits also indexes arrays, since path elements usually arrive as strings.
/// An empty path yields the document itself.
///
/// # Errors
///
/// Returns a [`LookupError`] naming the first step that is missing or that
/// lands on a scalar.
pub fn resolve_path<'a>(
    document: &'a Value,
    path: &[PathStep],
) -> Result<&'a Value, LookupError> {
    let mut current = document;
    for (position, step) in path.iter().enumerate() {
        current = step_into(current, position, step)?;
    }
    Ok(current)
}

fn step_into<'a>(
    current: &'a Value,
    position: usize,
    step: &PathStep,
) -> Result<&'a Value, LookupError> {
    let found = match (current, step) {
        (Value::Object(map), PathStep::Key(key)) => map.get(key),
        (Value::Object(map), PathStep::Index(i)) => map.get(&i.to_string()),
        (Value::Array(items), PathStep::Index(i)) => array_item(items, *i),
        (Value::Array(items), PathStep::Key(key)) => match array_position(key) {
            Some(i) => array_item(items, i),
            None => {
                return Err(LookupError::NotIndexable {
                    position,
                    step: step.clone(),
                    kind: "array",
                });
            }
        },
        (scalar, _) => {
            return Err(LookupError::NotIndexable {
                position,
                step: step.clone(),
                kind: kind_of(scalar),
            });
        }
    };

    found.ok_or_else(|| LookupError::Missing {
        position,
        step: step.clone(),
    })
}

fn array_item(items: &[Value], index: i64) -> Option<&Value> {
    let len = i64::try_from(items.len()).ok()?;
    let index = if index < 0 { index + len } else { index };
    usize::try_from(index).ok().and_then(|i| items.get(i))
}

fn array_position(key: &str) -> Option<i64> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps(keys: &[&str]) -> Vec<PathStep> {
        keys.iter().map(|k| PathStep::from(*k)).collect()
    }

    #[test]
    fn test_nested_key_resolves() {
        let doc = json!({"a": {"b": "x"}});
        let value = resolve_path(&doc, &steps(&["a", "b"])).unwrap();
        assert_eq!(value, &json!("x"));
    }

    #[test]
    fn test_missing_key_fails() {
        let doc = json!({"a": {"b": "x"}});
        let err = resolve_path(&doc, &steps(&["a", "z"])).unwrap_err();
        assert_eq!(
            err,
            LookupError::Missing {
                position: 1,
                step: PathStep::from("z"),
            }
        );
    }

    #[test]
    fn test_empty_path_returns_document() {
        let doc = json!({"a": 1});
        assert_eq!(resolve_path(&doc, &[]).unwrap(), &doc);
    }

    #[test]
    fn test_index_into_array() {
        let doc = json!({"hosts": ["db1", "db2"]});
        let path = vec![PathStep::from("hosts"), PathStep::Index(1)];
        assert_eq!(resolve_path(&doc, &path).unwrap(), &json!("db2"));
    }

    #[test]
    fn test_numeric_string_indexes_array() {
        let doc = json!({"hosts": ["db1", "db2"]});
        assert_eq!(
            resolve_path(&doc, &steps(&["hosts", "0"])).unwrap(),
            &json!("db1")
        );
    }

    #[test]
    fn test_non_numeric_key_on_array_fails() {
        let doc = json!({"hosts": ["db1"]});
        let err = resolve_path(&doc, &steps(&["hosts", "first"])).unwrap_err();
        assert!(matches!(err, LookupError::NotIndexable { kind: "array", .. }));
    }

    #[test]
    fn test_index_out_of_range_fails() {
        let doc = json!(["only"]);
        let err = resolve_path(&doc, &[PathStep::Index(3)]).unwrap_err();
        assert!(matches!(err, LookupError::Missing { position: 0, .. }));
    }

    #[test]
    fn test_negative_index_counts_from_end() {
        let doc = json!({"hosts": ["db1", "db2", "db3"]});
        let path = vec![PathStep::from("hosts"), PathStep::Index(-1)];
        assert_eq!(resolve_path(&doc, &path).unwrap(), &json!("db3"));

        let path = vec![PathStep::from("hosts"), PathStep::Index(-3)];
        assert_eq!(resolve_path(&doc, &path).unwrap(), &json!("db1"));
    }

    #[test]
    fn test_negative_index_past_start_fails() {
        let doc = json!(["only"]);
        let err = resolve_path(&doc, &[PathStep::Index(-2)]).unwrap_err();
        assert_eq!(
            err,
            LookupError::Missing {
                position: 0,
                step: PathStep::Index(-2),
            }
        );
    }

    #[test]
    fn test_step_into_scalar_fails() {
        let doc = json!({"a": "plain"});
        let err = resolve_path(&doc, &steps(&["a", "b"])).unwrap_err();
        assert_eq!(
            err,
            LookupError::NotIndexable {
                position: 1,
                step: PathStep::from("b"),
                kind: "string",
            }
        );
    }

    #[test]
    fn test_integer_step_on_object_uses_key() {
        let doc = json!({"2024": "yes"});
        assert_eq!(
            resolve_path(&doc, &[PathStep::Index(2024)]).unwrap(),
            &json!("yes")
        );
    }

    #[test]
    fn test_path_step_deserializes_from_mixed_array() {
        let path: Vec<PathStep> = serde_json::from_str(r#"["a", 0, -1, "b"]"#).unwrap();
        assert_eq!(
            path,
            vec![
                PathStep::from("a"),
                PathStep::Index(0),
                PathStep::Index(-1),
                PathStep::from("b"),
            ]
        );
    }
}
