//! HTTP transport implementation.
//!
//! HTTP server with JSON-RPC over POST requests.
//! This allows standard HTTP clients (curl, browsers, etc.) to communicate with the MCP server.
//! Each POST body is one JSON-RPC message; tool calls from concurrent
//! requests are serialized by the server's call gate.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http::StatusCode;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use super::{TransportConfig, TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    server: McpServer,
    rpc_path: String,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Create from TransportConfig (extracts HTTP config).
    pub fn from_transport_config(config: &TransportConfig) -> Option<Self> {
        match config {
            TransportConfig::Http(http_config) => Some(Self::new(http_config.clone())),
            _ => None,
        }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router serving `server`.
    pub fn router(&self, server: McpServer) -> Router {
        let state = AppState {
            server,
            rpc_path: self.config.rpc_path.clone(),
        };

        let app = Router::new()
            .route(&self.config.rpc_path, post(handle_rpc))
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(state);

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    /// Run the HTTP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {})",
            addr, cors_status
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "endpoints": {
            "rpc": state.rpc_path,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "documentation": format!("Send POST requests to {} with JSON-RPC messages", state.rpc_path)
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle one JSON-RPC message.
///
/// The body is taken as raw bytes so that malformed JSON or invalid UTF-8
/// still gets a JSON-RPC error response instead of an HTTP rejection.
#[instrument(skip_all)]
async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    rpc_response(&state.server, &body).await
}

async fn rpc_response(server: &McpServer, body: &[u8]) -> Response {
    match server.handle_bytes(body.trim_ascii()).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::config::Config;
    use crate::domains::jira::{JiraAuth, JiraClient};
    use crate::domains::tools::build_tool_registry;
    use serde_json::Value;

    fn test_server() -> McpServer {
        let client = JiraClient::new(
            "http://127.0.0.1:1",
            JiraAuth::Bearer("token".into()),
            Duration::from_secs(1),
        );
        McpServer::with_parts(Config::default(), client, build_tool_registry().unwrap())
    }

    #[tokio::test]
    async fn test_rpc_request_gets_ok() {
        let server = test_server();
        let response = rpc_response(&server, br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let server = test_server();
        let response = rpc_response(
            &server,
            br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_body_is_rpc_error() {
        let server = test_server();
        let response = rpc_response(&server, b"not json").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["kind"], "TransportDecodeError");
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_invalid_utf8_body_is_rpc_error() {
        let server = test_server();
        let response = rpc_response(&server, b"{\"method\":\"\xff\xfe\"}").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["kind"], "TransportDecodeError");
    }

    #[test]
    fn test_router_builds_with_and_without_cors() {
        let transport = HttpTransport::new(HttpConfig::default());
        let _ = transport.router(test_server());

        let transport = HttpTransport::new(HttpConfig {
            enable_cors: false,
            ..HttpConfig::default()
        });
        let _ = transport.router(test_server());
    }
}
