//! TCP transport implementation.
//!
//! Raw TCP socket transport with JSON-RPC messages (line-delimited).
//! Connections are served one after another, so only one request is ever
//! in flight.

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use super::lines::serve_lines;
use super::{TransportConfig, TransportError, TransportResult, config::TcpConfig};
use crate::core::McpServer;

/// TCP transport handler.
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    /// Create a new TCP transport with the given config.
    pub fn new(config: TcpConfig) -> Self {
        Self { config }
    }

    /// Create from TransportConfig (extracts TCP config).
    pub fn from_transport_config(config: &TransportConfig) -> Option<Self> {
        match config {
            TransportConfig::Tcp(tcp_config) => Some(Self::new(tcp_config.clone())),
            _ => None,
        }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Run the TCP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!("Ready - listening on {} (JSON-RPC over TCP)", addr);
        Self::serve(listener, server).await
    }

    /// Accept and serve connections until the listener fails permanently.
    pub async fn serve(listener: TcpListener, server: McpServer) -> TransportResult<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    info!("Accepted connection from {}", peer_addr);

                    // Set TCP_NODELAY to disable Nagle's algorithm
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
                    }

                    Self::handle_connection(&server, stream, peer_addr).await;
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    // Small delay to avoid spinning on persistent errors
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Handle a single TCP connection to completion.
    async fn handle_connection(
        server: &McpServer,
        stream: TcpStream,
        peer_addr: std::net::SocketAddr,
    ) {
        let (read_half, write_half) = stream.into_split();
        match serve_lines(server, BufReader::new(read_half), write_half).await {
            Ok(handled) => info!("Client {} disconnected after {} message(s)", peer_addr, handled),
            Err(e) => warn!("Error while serving client {}: {}", peer_addr, e),
        }
    }
}
