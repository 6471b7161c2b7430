//! TriML MCP Client
//!
//! Thin wrapper around the official `rmcp` SDK for talking to the Kubernetes MCP
//! server: launch configuration, pluggable transports, a session client for
//! tool discovery and invocation, and text extraction from tool results.

pub mod catalog;
pub mod config;
pub mod error;
pub mod mcp_client;
pub mod result;
pub mod session;
pub mod transport;

pub use catalog::ToolInfo;
pub use config::{KUBECONFIG_ENV, KUBECONFIG_FLAG, READ_ONLY_FLAG, ServerConfig};
pub use error::{ClientError, Result};
pub use mcp_client::{ConnectionState, McpClient};
pub use result::{extract_text, for_each_text, text_parts};
pub use session::{CLIENT_NAME, CLIENT_VERSION, ClientIdentity};
pub use transport::{Channel, InMemoryTransport, ProcessTransport, Transport};

pub use rmcp::model::{CallToolResult, Content, JsonObject};
pub use tokio_util::sync::CancellationToken;
