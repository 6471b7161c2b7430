//! Main client implementation for the TriML MCP client
//!
//! [`McpClient`] moves through `Unconnected -> Connected -> Closed`. Discovery
//! and invocation require `Connected` and fail fast with
//! [`ClientError::NotConnected`] otherwise; `close` is always safe.
//!
//! One client serves a single logical caller: `connect` and `close` take
//! `&mut self`. Separate clients own separate transports and are independent.

use crate::mcp::client::catalog::ToolInfo;
use crate::mcp::client::config::ServerConfig;
use crate::mcp::client::error::{ClientError, Result};
use crate::mcp::client::session::{ClientIdentity, Session, reap};
use crate::mcp::client::transport::{ProcessTransport, Transport};
use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParam, CallToolResult, JsonObject};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
// first `npx` run downloads the server package
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Connection state for MCP client (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
    Closed,
}

enum SessionState {
    Unconnected,
    Connected(Session),
    Closed,
}

/// Where `connect` gets its channel from, fixed at construction
enum TransportSource {
    /// Spawn a fresh process transport from the held config on every connect
    Process,
    /// Caller-supplied transport; `None` once an earlier connect opened it
    Injected(Option<Box<dyn Transport>>),
}

/// High-level MCP client with ergonomic APIs (Domain Entity)
pub struct McpClient {
    config: ServerConfig,
    source: TransportSource,
    state: SessionState,
    timeout: Duration,
    connect_timeout: Duration,
    shutdown_grace: Duration,
}

impl McpClient {
    /// Client that spawns the server described by `config` on `connect`
    pub fn new(config: ServerConfig) -> Self {
        Self::build(config, TransportSource::Process)
    }

    /// Client that connects over `transport` instead of spawning the server.
    /// Use for tests with an in-memory transport.
    pub fn with_transport<T>(config: ServerConfig, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self::build(config, TransportSource::Injected(Some(Box::new(transport))))
    }

    fn build(config: ServerConfig, source: TransportSource) -> Self {
        Self {
            config,
            source,
            state: SessionState::Unconnected,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Set the deadline for each request/response round trip
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the deadline for opening the transport plus the handshake
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long `close` waits for the server process before killing it
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        match self.state {
            SessionState::Unconnected => ConnectionState::Unconnected,
            SessionState::Connected(_) => ConnectionState::Connected,
            SessionState::Closed => ConnectionState::Closed,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    /// Open the transport and perform the MCP handshake.
    ///
    /// On failure the client keeps its previous state. Calling this on a
    /// connected client replaces the session; the old one is dropped, not closed.
    pub async fn connect(&mut self, ct: &CancellationToken) -> Result<()> {
        let transport: Box<dyn Transport> = match &mut self.source {
            TransportSource::Process => Box::new(ProcessTransport::new(self.config.clone())),
            TransportSource::Injected(slot) => slot.take().ok_or(ClientError::TransportConsumed)?,
        };

        tracing::info!(transport = %transport.describe(), "Connecting to MCP server");

        let channel = self
            .guard("open", ct, self.connect_timeout, transport.open())
            .await??;
        let (reader, writer, process) = channel.into_parts();

        let handshake = ClientIdentity.serve((reader, writer));
        let service = match self.guard("connect", ct, self.connect_timeout, handshake).await {
            Ok(Ok(service)) => service,
            Ok(Err(e)) => {
                self.discard(process).await;
                return Err(ClientError::Handshake(e));
            }
            Err(e) => {
                self.discard(process).await;
                return Err(e);
            }
        };

        if self.is_connected() {
            tracing::warn!("connect called on a connected client; previous session dropped");
        }
        self.state = SessionState::Connected(Session::new(service, process));
        tracing::info!("MCP session established");
        Ok(())
    }

    /// List the server's tools in the order the server returns them
    pub async fn list_tools(&self, ct: &CancellationToken) -> Result<Vec<ToolInfo>> {
        let session = self.session()?;
        let listed = self
            .guard(
                "list_tools",
                ct,
                self.timeout,
                session.peer().list_tools(Default::default()),
            )
            .await??;

        tracing::debug!(count = listed.tools.len(), "Listed tools");
        Ok(listed.tools.into_iter().map(ToolInfo::from).collect())
    }

    /// Call a tool and return its result unmodified.
    ///
    /// `arguments` are not validated here; the server is the only judge.
    pub async fn call_tool(
        &self,
        ct: &CancellationToken,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult> {
        let session = self.session()?;
        let request = CallToolRequestParam {
            name: name.to_string().into(),
            arguments,
        };

        tracing::debug!(tool = %name, "Calling tool");
        let result = self
            .guard("call_tool", ct, self.timeout, session.peer().call_tool(request))
            .await??;
        Ok(result)
    }

    /// Close the session and wait for the server process to exit.
    ///
    /// Succeeds trivially when there is nothing to close.
    pub async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Connected(session) => {
                tracing::info!("Closing MCP session");
                session.close(self.shutdown_grace).await
            }
            SessionState::Unconnected | SessionState::Closed => {
                tracing::debug!("close called without an active session");
                Ok(())
            }
        }
    }

    fn session(&self) -> Result<&Session> {
        match &self.state {
            SessionState::Connected(session) => Ok(session),
            SessionState::Unconnected | SessionState::Closed => Err(ClientError::NotConnected),
        }
    }

    /// Reap the process of a failed connect attempt
    async fn discard(&self, process: Option<tokio::process::Child>) {
        if let Some(child) = process {
            if let Err(e) = reap(child, self.shutdown_grace).await {
                tracing::warn!(error = %e, "Failed to reap MCP server after failed connect");
            }
        }
    }

    /// Run `fut` unless `ct` fires or `deadline` elapses first.
    ///
    /// The losing future is dropped; rmcp matches responses by request id, so a
    /// late response to an abandoned request is discarded.
    async fn guard<F>(
        &self,
        operation: &str,
        ct: &CancellationToken,
        deadline: Duration,
        fut: F,
    ) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = ct.cancelled() => Err(ClientError::Cancelled {
                operation: operation.to_string(),
            }),
            outcome = tokio::time::timeout(deadline, fut) => {
                outcome.map_err(|_| ClientError::timeout(operation, deadline))
            }
        }
    }
}
