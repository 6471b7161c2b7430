//! Live MCP session: the running rmcp service plus the subprocess it talks to

use crate::mcp::client::error::{ClientError, Result};
use rmcp::{
    ClientHandler, RoleClient,
    model::{ClientCapabilities, ClientInfo, Implementation},
    service::{Peer, RunningService},
};
use std::time::Duration;
use tokio::process::Child;

/// Client name sent in the `initialize` handshake
pub const CLIENT_NAME: &str = "TriML";

/// Client version sent in the `initialize` handshake
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed identity this client presents to every server
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIdentity;

impl ClientHandler for ClientIdentity {
    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: CLIENT_NAME.to_string(),
                version: CLIENT_VERSION.to_string(),
            },
        }
    }
}

/// Owns the rmcp service and, for process transports, the server child.
///
/// Dropping a session without [`close`](Session::close) still stops the
/// service and kills the child (`kill_on_drop`), but nothing waits for it.
pub(crate) struct Session {
    service: RunningService<RoleClient, ClientIdentity>,
    process: Option<Child>,
}

impl Session {
    pub(crate) fn new(
        service: RunningService<RoleClient, ClientIdentity>,
        process: Option<Child>,
    ) -> Self {
        Self { service, process }
    }

    pub(crate) fn peer(&self) -> &Peer<RoleClient> {
        self.service.peer()
    }

    /// Stop the service, then wait for the subprocess to exit
    pub(crate) async fn close(self, grace: Duration) -> Result<()> {
        let Session { service, process } = self;

        let stopped = service
            .cancel()
            .await
            .map_err(|e| ClientError::Shutdown(format!("MCP service task failed: {}", e)));

        // reap the child even when the service task failed
        let reaped = match process {
            Some(child) => reap(child, grace).await,
            None => Ok(()),
        };

        let reason = stopped?;
        tracing::debug!(reason = ?reason, "MCP service stopped");
        reaped
    }
}

/// Wait up to `grace` for the child to exit on its own, then kill it.
///
/// Closing the service drops the child's stdin, which is the server's cue to exit.
pub(crate) async fn reap(mut child: Child, grace: Duration) -> Result<()> {
    let pid = child.id();
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(pid = ?pid, status = %status, "MCP server process exited");
            Ok(())
        }
        Ok(Err(e)) => Err(ClientError::Shutdown(format!(
            "Failed to wait for MCP server process: {}",
            e
        ))),
        Err(_) => {
            tracing::warn!(
                pid = ?pid,
                grace = ?grace,
                "MCP server did not exit in time, killing it"
            );
            child.kill().await.map_err(|e| {
                ClientError::Shutdown(format!("Failed to kill MCP server process: {}", e))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_identity_is_fixed() {
        let info = ClientIdentity.get_info();
        assert_eq!(info.client_info.name, "TriML");
        assert_eq!(info.client_info.version, env!("CARGO_PKG_VERSION"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reap_waits_for_exiting_child() {
        let child = tokio::process::Command::new("sh")
            .args(["-c", "exit 0"])
            .spawn()
            .unwrap();
        reap(child, Duration::from_secs(5)).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reap_kills_stuck_child() {
        let child = tokio::process::Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let started = std::time::Instant::now();
        reap(child, Duration::from_millis(100)).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
