//! In-process fake Kubernetes MCP server for integration tests

#![allow(dead_code)]

use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use triml::mcp::client::{
    CancellationToken, InMemoryTransport, JsonObject, McpClient, ServerConfig, Transport,
};

/// How long `slow_operation` takes; far longer than any test waits
pub const SLOW_TOOL_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct KubeMock {
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl KubeMock {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List all the Kubernetes namespaces in the current cluster")]
    fn namespaces_list(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![
            Content::text("default"),
            Content::text("kube-system"),
        ]))
    }

    #[tool(description = "Describe a pod, attaching a rendered status badge")]
    fn pods_describe(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![
            Content::text("hello"),
            Content::image("aGVsbG8=", "image/png"),
            Content::text("world"),
        ]))
    }

    #[tool(description = "Get a pod that does not exist")]
    fn pods_get(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::error(vec![Content::text(
            "pods \"missing\" not found",
        )]))
    }

    #[tool(description = "Echo the call arguments back as JSON")]
    fn echo_arguments(
        &self,
        Parameters(arguments): Parameters<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let body = serde_json::Value::Object(arguments).to_string();
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }

    #[tool(description = "Never answers within a test's patience")]
    async fn slow_operation(&self) -> Result<CallToolResult, McpError> {
        tokio::time::sleep(SLOW_TOOL_DELAY).await;
        Ok(CallToolResult::success(vec![Content::text("done")]))
    }
}

#[tool_handler]
impl ServerHandler for KubeMock {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Fake Kubernetes MCP server".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Serve [`KubeMock`] on `transport` until the peer hangs up
pub async fn spawn_fake_server(transport: InMemoryTransport) -> JoinHandle<()> {
    let channel = Box::new(transport)
        .open()
        .await
        .expect("Failed to open server end");
    let (reader, writer, _) = channel.into_parts();

    tokio::spawn(async move {
        match KubeMock::new().serve((reader, writer)).await {
            Ok(server) => {
                let _ = server.waiting().await;
            }
            Err(e) => eprintln!("Fake MCP server failed to start: {}", e),
        }
    })
}

/// Client wired to a fresh fake server, not yet connected
pub async fn fake_client() -> (McpClient, JoinHandle<()>) {
    let (client_end, server_end) = InMemoryTransport::pair();
    let server = spawn_fake_server(server_end).await;
    let client = McpClient::with_transport(ServerConfig::default(), client_end);
    (client, server)
}

/// Client wired to a fresh fake server and connected
pub async fn connected_client() -> (McpClient, JoinHandle<()>) {
    let (mut client, server) = fake_client().await;
    client
        .connect(&CancellationToken::new())
        .await
        .expect("Failed to connect to fake server");
    (client, server)
}
