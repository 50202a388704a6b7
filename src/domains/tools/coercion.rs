//! Argument coercion.
//!
//! Turns the loosely-typed argument bag of a `tools/call` request into
//! [`CoercedArguments`] according to a tool's parameter specs. Keys that no
//! spec declares are ignored. A `null` value counts as absent.

use rmcp::model::JsonObject;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ToolError, ToolResult};
use super::schema::{ArgValue, ParamKind, ParameterSpec};

/// Arguments after coercion, in parameter declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercedArguments {
    values: Vec<(&'static str, ArgValue)>,
}

impl CoercedArguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ArgValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    /// Convert to a JSON object.
    pub fn to_json(&self) -> JsonObject {
        self.values
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_json()))
            .collect()
    }

    /// Convert into a tool's typed parameter struct.
    pub fn into_params<T: DeserializeOwned>(self) -> ToolResult<T> {
        serde_json::from_value(Value::Object(self.to_json()))
            .map_err(|e| ToolError::unknown(format!("Failed to build tool parameters: {e}")))
    }
}

/// Validate and coerce raw arguments against the given parameter specs.
pub fn coerce(specs: &[ParameterSpec], raw: &JsonObject) -> ToolResult<CoercedArguments> {
    let mut values = Vec::with_capacity(specs.len());

    for spec in specs {
        match raw.get(spec.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let coerced = coerce_value(spec.kind, value)
                    .ok_or_else(|| ToolError::invalid(spec.name, spec.kind.as_str()))?;
                values.push((spec.name, coerced));
            }
            None if spec.required => return Err(ToolError::missing(spec.name)),
            None => {
                if let Some(default) = &spec.default {
                    values.push((spec.name, default.clone()));
                }
            }
        }
    }

    Ok(CoercedArguments { values })
}

/// Coerce a single value to the given kind.
pub fn coerce_value(kind: ParamKind, value: &Value) -> Option<ArgValue> {
    match kind {
        ParamKind::String => value.as_str().map(|s| ArgValue::String(s.to_string())),
        ParamKind::Integer => coerce_integer(value).map(ArgValue::Integer),
        ParamKind::Boolean => coerce_boolean(value).map(ArgValue::Boolean),
        ParamKind::StringList => coerce_string_list(value).map(ArgValue::StringList),
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
