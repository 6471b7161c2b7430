//! Error types for the TriML MCP client

use rmcp::service::ClientInitializeError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during MCP client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Discovery or invocation attempted before a successful `connect`
    #[error("mcp client: not connected (call connect first)")]
    NotConnected,

    /// The server executable could not be started
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level errors (missing pipes, closed channel, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The channel opened but session negotiation failed
    #[error("Handshake failed: {0}")]
    Handshake(#[source] ClientInitializeError),

    /// The server (or the round trip to it) failed a request
    #[error("Remote error: {0}")]
    Remote(#[from] rmcp::ServiceError),

    /// The caller's cancellation token fired first
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// Timeout errors for operations that exceed their deadline
    #[error("Operation timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// An injected transport was already opened by an earlier `connect`
    #[error("Transport already consumed by a previous connect")]
    TransportConsumed,

    /// Session or subprocess teardown failed
    #[error("Shutdown error: {0}")]
    Shutdown(String),

    /// Client configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ClientError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Timeout for `operation`; deadlines too long for `u64` milliseconds saturate
    pub fn timeout<S: Into<String>>(operation: S, deadline: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}
