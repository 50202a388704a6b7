//! Core module containing shared infrastructure components.
//!
//! Configuration, error handling, the JSON-RPC envelopes, method routing,
//! local path checks for attachment transfers, and the transports.

pub mod config;
pub mod error;
pub mod protocol;
pub mod security;
pub mod server;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{RequestEnvelope, ResponseEnvelope};
pub use security::{PathSecurityError, validate_input_path, validate_output_path};
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};
