use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Concrete value of a parameter handed to a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

impl ParameterValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// String form of a script result: null becomes empty, strings are taken as they are,
/// anything else uses its JSON text.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Choice list of a script result: one choice per array element, none for null,
/// a single choice for any other value.
pub fn to_choices(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(to_display_string).collect(),
        other => vec![to_display_string(other)],
    }
}
