//! MCP Server implementation.
//!
//! Routes decoded JSON-RPC messages: `initialize`, `ping` and `tools/list`
//! are answered here, `tools/call` goes to the [`Dispatcher`]. Every
//! transport feeds frames through [`McpServer::handle_bytes`],
//! [`McpServer::handle_line`] or [`McpServer::handle_value`].
//!
//! Tool calls pass through a single-flight gate so that at most one handler
//! runs at a time, whichever transport the call came from.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::config::Config;
use super::error::Result;
use super::protocol::{
    DecodeError, ErrorBody, Incoming, ResponseEnvelope, decode_bytes, decode_line, decode_value,
};
use crate::domains::jira::JiraClient;
use crate::domains::tools::{Dispatcher, ToolContext, ToolRegistry, build_tool_registry};

/// Protocol version reported when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Tool call dispatcher (owns the registry and the Jira client).
    dispatcher: Dispatcher,

    /// Held for the duration of each tool call.
    call_gate: Arc<Mutex<()>>,
}

impl McpServer {
    /// Create a server from configuration.
    ///
    /// Fails when the Jira connection settings are incomplete or a tool
    /// definition is inconsistent.
    pub fn new(config: Config) -> Result<Self> {
        let client = JiraClient::from_config(&config.jira)?;
        let registry = build_tool_registry()?;
        Ok(Self::with_parts(config, client, registry))
    }

    /// Create a server from an already-built client and registry.
    pub fn with_parts(config: Config, client: JiraClient, registry: ToolRegistry) -> Self {
        let config = Arc::new(config);
        let context = Arc::new(ToolContext::new(client, config.clone()));
        info!("Registered {} tools", registry.len());

        Self {
            dispatcher: Dispatcher::new(Arc::new(registry), context),
            config,
            call_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Catalog entries for `tools/list`.
    pub fn list_tools(&self) -> Vec<Value> {
        self.dispatcher
            .registry()
            .list_all()
            .map(|d| d.catalog_entry())
            .collect()
    }

    /// Handle one text frame. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<ResponseEnvelope> {
        match decode_line(line) {
            Ok(incoming) => self.handle(incoming).await,
            Err(err) => Some(decode_failure(err)),
        }
    }

    /// Handle one raw frame as read off the wire. Returns `None` for
    /// notifications.
    pub async fn handle_bytes(&self, frame: &[u8]) -> Option<ResponseEnvelope> {
        match decode_bytes(frame) {
            Ok(incoming) => self.handle(incoming).await,
            Err(err) => Some(decode_failure(err)),
        }
    }

    /// Handle one already-parsed JSON message. Returns `None` for notifications.
    pub async fn handle_value(&self, value: Value) -> Option<ResponseEnvelope> {
        match decode_value(value) {
            Ok(incoming) => self.handle(incoming).await,
            Err(err) => Some(decode_failure(err)),
        }
    }

    #[instrument(skip_all)]
    async fn handle(&self, incoming: Incoming) -> Option<ResponseEnvelope> {
        match incoming {
            Incoming::Initialize { id, params } => {
                info!("Initialize request");
                Some(ResponseEnvelope::success(id, self.initialize_result(&params)))
            }
            Incoming::Ping { id } => Some(ResponseEnvelope::success(id, json!({}))),
            Incoming::ListTools { id } => {
                debug!("Listing tools");
                Some(ResponseEnvelope::success(
                    id,
                    json!({ "tools": self.list_tools() }),
                ))
            }
            Incoming::CallTool(request) => {
                info!("Calling tool: {}", request.tool_name);
                let _guard = self.call_gate.lock().await;
                Some(self.dispatcher.dispatch(request).await)
            }
            Incoming::Notification { method } => {
                debug!("Notification: {}", method);
                None
            }
            Incoming::Unknown { id, method } => {
                warn!("Unknown method: {}", method);
                Some(ResponseEnvelope::failure(
                    id,
                    ErrorBody::method_not_found(&method),
                ))
            }
        }
    }

    fn initialize_result(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.config.server.name,
                "version": self.config.server.version,
            },
            "instructions": "Jira tools: issues, workflow transitions, sprints, attachments, reporting and administration.",
        })
    }
}

fn decode_failure(err: DecodeError) -> ResponseEnvelope {
    warn!("Undecodable message: {}", err.message);
    ResponseEnvelope::failure(err.id.clone(), ErrorBody::decode(&err))
}
