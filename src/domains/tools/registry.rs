//! Tool Registry - central registration and lookup for all tools.
//!
//! This module provides:
//! - The [`ToolDefinition`] trait each tool implements
//! - A builder that pairs descriptors with handlers and rejects bad entries
//! - The immutable [`ToolRegistry`] used by the dispatcher

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::coercion::{CoercedArguments, coerce_value};
use super::error::{RegistryError, ToolError, ToolResult};
use super::schema::{ParameterSpec, ToolDescriptor};
use crate::core::config::Config;
use crate::domains::jira::JiraClient;

// ============================================================================
// Tool Context
// ============================================================================

/// Everything a handler may use besides its arguments.
pub struct ToolContext {
    /// Client for the remote issue tracker.
    pub client: JiraClient,

    /// Server configuration (security settings for local file access).
    pub config: Arc<Config>,
}

impl ToolContext {
    pub fn new(client: JiraClient, config: Arc<Config>) -> Self {
        Self { client, config }
    }
}

/// Type-erased tool handler.
pub type ToolHandler = Arc<dyn Fn(CoercedArguments, &ToolContext) -> ToolResult<Value> + Send + Sync>;

// ============================================================================
// Tool Definition
// ============================================================================

/// A tool: its schema and its handler, declared together.
pub trait ToolDefinition {
    /// Tool name as registered in MCP.
    const NAME: &'static str;

    /// Tool description shown to clients.
    const DESCRIPTION: &'static str;

    /// Typed parameters, built from coerced arguments.
    type Params: DeserializeOwned + JsonSchema;

    /// Ordered parameter declarations.
    fn parameters() -> Vec<ParameterSpec>;

    /// Execute the tool logic.
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value>;

    /// Static descriptor for this tool.
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Self::parameters())
    }
}

// ============================================================================
// Tool Registry
// ============================================================================

/// A registered tool: its descriptor and handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub handler: ToolHandler,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Builder for the registry. Registration happens once at startup.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name.
    ///
    /// Fails if the name is already taken or a default does not match its
    /// parameter's kind.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        parameters: Vec<ParameterSpec>,
        handler: ToolHandler,
    ) -> Result<&mut Self, RegistryError> {
        if self.index.contains_key(name) {
            return Err(RegistryError::DuplicateTool(name.to_string()));
        }

        for spec in &parameters {
            if let Some(default) = &spec.default {
                if coerce_value(spec.kind, &default.to_json()).is_none() {
                    return Err(RegistryError::InvalidDefault {
                        tool: name.to_string(),
                        parameter: spec.name.to_string(),
                        kind: spec.kind.as_str(),
                    });
                }
            }
        }

        debug!("Registering tool: {}", name);
        self.index.insert(name.to_string(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor: ToolDescriptor::new(name, description, parameters),
            handler,
        });
        Ok(self)
    }

    /// Register a [`ToolDefinition`].
    ///
    /// Also checks that the declared parameter names are exactly the fields
    /// of the tool's parameter struct.
    pub fn register_tool<T>(&mut self) -> Result<&mut Self, RegistryError>
    where
        T: ToolDefinition + 'static,
    {
        let parameters = T::parameters();
        check_params_struct::<T::Params>(T::NAME, &parameters)?;

        let handler: ToolHandler = Arc::new(|args: CoercedArguments, ctx: &ToolContext| {
            let params = args.into_params::<T::Params>()?;
            T::execute(params, ctx)
        });
        self.register(T::NAME, T::DESCRIPTION, parameters, handler)
    }

    /// Freeze the registry.
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            tools: self.tools,
            index: self.index,
        }
    }
}

/// Compare spec names with the property names of the typed struct schema.
fn check_params_struct<P: JsonSchema>(
    tool: &str,
    parameters: &[ParameterSpec],
) -> Result<(), RegistryError> {
    let schema = serde_json::to_value(schemars::schema_for!(P)).map_err(|e| {
        RegistryError::SchemaMismatch {
            tool: tool.to_string(),
            detail: e.to_string(),
        }
    })?;

    let struct_fields: HashSet<&str> = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let spec_names: HashSet<&str> = parameters.iter().map(|p| p.name).collect();

    if struct_fields != spec_names {
        let mut missing: Vec<&str> = spec_names.difference(&struct_fields).copied().collect();
        let mut extra: Vec<&str> = struct_fields.difference(&spec_names).copied().collect();
        missing.sort_unstable();
        extra.sort_unstable();
        return Err(RegistryError::SchemaMismatch {
            tool: tool.to_string(),
            detail: format!("not in struct: {missing:?}, not in specs: {extra:?}"),
        });
    }
    Ok(())
}

/// Immutable mapping from tool name to descriptor and handler.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> ToolResult<&RegisteredTool> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::not_found(name))
    }

    /// All descriptors in registration order. Each call starts over.
    pub fn list_all(&self) -> impl Iterator<Item = &ToolDescriptor> + '_ {
        self.tools.iter().map(|t| &t.descriptor)
    }

    /// Get all tool names in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.list_all().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
