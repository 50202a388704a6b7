//! Tools domain module.
//!
//! Tools are the Jira operations MCP clients can call by name.
//!
//! ## Architecture
//!
//! - `schema.rs` - Parameter specs and tool descriptors
//! - `coercion.rs` - Loosely-typed arguments to declared kinds
//! - `registry.rs` - The [`ToolDefinition`] trait and the immutable registry
//! - `dispatcher.rs` - One call in, one response envelope out
//! - `router.rs` - Registers every tool, in catalog order
//! - `definitions/` - Tool implementations, one file per category
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Add a unit struct implementing [`ToolDefinition`] in the matching
//!    `definitions/` file, with a `Params` struct whose fields are exactly
//!    the declared parameters
//! 2. Export it in `definitions/mod.rs`
//! 3. Register it in `router.rs`

pub mod coercion;
pub mod definitions;
pub mod dispatcher;
mod error;
pub mod registry;
pub mod router;
pub mod schema;

pub use dispatcher::Dispatcher;
pub use error::{RegistryError, ToolError, ToolResult};
pub use registry::{ToolContext, ToolDefinition, ToolRegistry};
pub use router::build_tool_registry;
