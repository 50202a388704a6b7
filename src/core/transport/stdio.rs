//! STDIO transport implementation.
//!
//! Standard input/output transport for MCP - the default and recommended mode.
//! Logs go to stderr; stdout carries only response frames.

use tokio::io::BufReader;
use tracing::info;

use super::TransportResult;
use super::lines::serve_lines;
use crate::core::McpServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Run the STDIO transport until stdin is closed.
    pub async fn run(server: McpServer) -> TransportResult<()> {
        info!("Ready - communicating via stdin/stdout");

        let reader = BufReader::new(tokio::io::stdin());
        let handled = serve_lines(&server, reader, tokio::io::stdout()).await?;

        info!("STDIO transport finished after {} message(s)", handled);
        Ok(())
    }
}
