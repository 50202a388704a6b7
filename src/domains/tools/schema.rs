//! Schema descriptors for tools.
//!
//! A [`ToolDescriptor`] is the static declaration of one tool: its name,
//! description and the ordered [`ParameterSpec`] sequence. The JSON input
//! schema advertised through `tools/list` is derived mechanically from the
//! parameter specs, so there is exactly one place where a parameter is
//! declared.

use rmcp::model::{JsonObject, Tool};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Primitive kinds a tool parameter can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    StringList,
}

impl ParamKind {
    /// Human-readable name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::StringList => "list of strings",
        }
    }

    /// JSON Schema fragment for this kind.
    fn schema(&self) -> JsonObject {
        let value = match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::StringList => json!({ "type": "array", "items": { "type": "string" } }),
        };
        match value {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced argument value.
///
/// This is the dynamic representation that exists between the wire and the
/// typed parameter struct of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    StringList(Vec<String>),
}

impl ArgValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::String(_) => ParamKind::String,
            Self::Integer(_) => ParamKind::Integer,
            Self::Boolean(_) => ParamKind::Boolean,
            Self::StringList(_) => ParamKind::StringList,
        }
    }

    /// Convert into a plain JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Boolean(b) => Value::Bool(*b),
            Self::StringList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Declaration of one tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ArgValue>,
}

impl ParameterSpec {
    /// A parameter the caller must supply.
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: true,
            default: None,
        }
    }

    /// A parameter that may be omitted. Without a default it is simply absent.
    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn default_str(self, value: &str) -> Self {
        self.with_default(ArgValue::String(value.to_string()))
    }

    pub fn default_int(self, value: i64) -> Self {
        self.with_default(ArgValue::Integer(value))
    }

    pub fn default_bool(self, value: bool) -> Self {
        self.with_default(ArgValue::Boolean(value))
    }

    pub fn default_empty_list(self) -> Self {
        self.with_default(ArgValue::StringList(Vec::new()))
    }

    /// Attach a default value. A parameter with a default is never required.
    pub fn with_default(mut self, value: ArgValue) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    /// JSON Schema property for this parameter.
    fn property_schema(&self) -> Value {
        let mut schema = self.kind.schema();
        if !self.description.is_empty() {
            schema.insert("description".into(), Value::String(self.description.into()));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.to_json());
        }
        Value::Object(schema)
    }
}

/// Static declaration of a tool. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Names of the required parameters, in declaration order.
    pub fn required_parameters(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
    }

    /// Derive the JSON input schema from the parameter specs.
    pub fn input_schema(&self) -> JsonObject {
        let properties: JsonObject = self
            .parameters
            .iter()
            .map(|p| (p.name.to_string(), p.property_schema()))
            .collect();
        let required: Vec<Value> = self
            .required_parameters()
            .map(|name| Value::String(name.to_string()))
            .collect();

        let mut schema = JsonObject::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), Value::Array(required));
        schema
    }

    /// Create a Tool model for this descriptor (metadata).
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone().into(),
            description: Some(self.description.clone().into()),
            input_schema: Arc::new(self.input_schema()),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Catalog entry as sent in a `tools/list` result.
    pub fn catalog_entry(&self) -> Value {
        serde_json::to_value(self.to_tool()).unwrap_or_else(|_| {
            json!({
                "name": self.name,
                "description": self.description,
                "inputSchema": self.input_schema(),
            })
        })
    }
}
