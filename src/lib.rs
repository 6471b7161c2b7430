//! TriML: a Model Context Protocol client for the Kubernetes MCP server.
//!
//! ```no_run
//! use triml::mcp::client::{CancellationToken, McpClient, ServerConfig, extract_text};
//!
//! # async fn example() -> triml::mcp::client::Result<()> {
//! let ct = CancellationToken::new();
//! let mut client = McpClient::new(ServerConfig::default().with_read_only());
//! client.connect(&ct).await?;
//! let result = client.call_tool(&ct, "namespaces_list", None).await;
//! client.close().await?;
//! println!("{}", extract_text(Some(&result?)));
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod mcp;
