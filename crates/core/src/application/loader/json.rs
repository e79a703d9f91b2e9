// JSON field access shared by both configuration parsers

use serde_json::{Map, Value};

use crate::domain::ConfigError;

pub(crate) fn field<'a>(tree: &'a Value, key: &str, context: &str) -> Result<&'a Value, ConfigError> {
    tree.get(key).ok_or_else(|| ConfigError::MissingField {
        field: key.to_string(),
        context: context.to_string(),
    })
}

pub(crate) fn object<'a>(
    tree: &'a Value,
    key: &str,
    context: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    field(tree, key, context)?
        .as_object()
        .ok_or_else(|| ConfigError::WrongType {
            field: key.to_string(),
            context: context.to_string(),
            expected: "object",
        })
}

/// Scalar as its string representation; strings are taken verbatim
pub(crate) fn canonic_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Array as ordered string representations; a scalar becomes a one-element list
pub(crate) fn canonic_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(entries) => entries.iter().map(canonic_string).collect(),
        other => vec![canonic_string(other)],
    }
}

pub(crate) fn string_field(tree: &Value, key: &str, context: &str) -> Result<String, ConfigError> {
    field(tree, key, context).map(canonic_string)
}

pub(crate) fn list_field(tree: &Value, key: &str, context: &str) -> Result<Vec<String>, ConfigError> {
    field(tree, key, context).map(canonic_list)
}
