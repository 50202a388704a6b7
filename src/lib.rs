//! Jira MCP Server Library
//!
//! This crate exposes Jira operations (issues, workflow, sprints, attachments,
//! reporting and administration) as Model Context Protocol tools.
//!
//! # Architecture
//!
//! The server is organized into the following modules:
//!
//! - **core**: Configuration, error handling, JSON-RPC envelopes, the server and transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **jira**: Blocking HTTP client for the Jira REST API
//!   - **tools**: Tool registry, argument coercion, dispatcher and the tool catalog
//!
//! # Example
//!
//! ```rust,no_run
//! use jira_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     config.validate()?;
//!     let transport = TransportService::new(config.transport.clone());
//!     let server = McpServer::new(config)?;
//!     transport.run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
