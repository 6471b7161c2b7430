//! Transport abstraction layer for MCP communication
//!
//! A [`Transport`] knows how to open one bidirectional byte channel to a tool
//! server. Opening consumes the transport, so a value can be opened at most once.

use crate::mcp::client::config::ServerConfig;
use crate::mcp::client::error::{ClientError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::process::Child;

/// Buffer size of each direction of an in-memory channel
const IN_MEMORY_BUFFER: usize = 64 * 1024;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Abstraction over different MCP transport mechanisms
#[async_trait]
pub trait Transport: Send {
    /// Open the channel, taking ownership of whatever backs it
    async fn open(self: Box<Self>) -> Result<Channel>;

    /// Short human-readable description used in logs
    fn describe(&self) -> String;
}

/// An open byte channel, plus the subprocess behind it if there is one
pub struct Channel {
    reader: BoxedReader,
    writer: BoxedWriter,
    process: Option<Child>,
}

impl Channel {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            process: None,
        }
    }

    fn with_process(mut self, child: Child) -> Self {
        self.process = Some(child);
        self
    }

    pub fn has_process(&self) -> bool {
        self.process.is_some()
    }

    /// Split into the read half, the write half and the owned subprocess
    pub fn into_parts(self) -> (BoxedReader, BoxedWriter, Option<Child>) {
        (self.reader, self.writer, self.process)
    }
}

/// Spawns the MCP server as a subprocess and talks to it over stdin/stdout
#[derive(Debug, Clone)]
pub struct ProcessTransport {
    config: ServerConfig,
}

impl ProcessTransport {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn open(self: Box<Self>) -> Result<Channel> {
        let program = self.config.command();
        if program.trim().is_empty() {
            return Err(ClientError::config("Command cannot be empty"));
        }

        let mut cmd = self.config.to_command();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| {
            tracing::error!(command = %program, error = %source, "Failed to spawn MCP server process");
            ClientError::Spawn {
                command: program.to_string(),
                source,
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::transport("Failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::transport("Failed to capture stdout"))?;

        tracing::debug!(command = %program, pid = ?child.id(), "Spawned MCP server process");
        Ok(Channel::new(stdout, stdin).with_process(child))
    }

    fn describe(&self) -> String {
        let mut line = self.config.command().to_string();
        for arg in self.config.args() {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// One end of a pre-connected in-process channel, with no process behind it
#[derive(Debug)]
pub struct InMemoryTransport {
    stream: DuplexStream,
}

impl InMemoryTransport {
    /// Two linked endpoints; bytes written to one are read from the other
    pub fn pair() -> (Self, Self) {
        let (a, b) = tokio::io::duplex(IN_MEMORY_BUFFER);
        (Self { stream: a }, Self { stream: b })
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn open(self: Box<Self>) -> Result<Channel> {
        let (reader, writer) = tokio::io::split(self.stream);
        Ok(Channel::new(reader, writer))
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_in_memory_pair_is_linked() {
        let (left, right) = InMemoryTransport::pair();
        let (_, mut left_writer, left_process) = Box::new(left).open().await.unwrap().into_parts();
        let (mut right_reader, _, _) = Box::new(right).open().await.unwrap().into_parts();
        assert!(left_process.is_none());

        left_writer.write_all(b"ping\n").await.unwrap();
        left_writer.flush().await.unwrap();

        let mut buf = [0u8; 5];
        right_reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping\n");
    }

    #[tokio::test]
    async fn test_process_transport_rejects_empty_command() {
        let transport = ProcessTransport::new(ServerConfig::new("  ", vec![]));
        let result = Box::new(transport).open().await;
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_process_transport_spawn_error_is_surfaced() {
        let transport =
            ProcessTransport::new(ServerConfig::new("triml-no-such-binary-4c1d", vec![]));
        match Box::new(transport).open().await {
            Err(ClientError::Spawn { command, source }) => {
                assert_eq!(command, "triml-no-such-binary-4c1d");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            Err(other) => panic!("Expected ClientError::Spawn, got {other}"),
            Ok(_) => panic!("Expected spawn to fail"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_transport_wires_stdio() {
        let transport = ProcessTransport::new(ServerConfig::new("cat", vec![]));
        let channel = Box::new(transport).open().await.unwrap();
        assert!(channel.has_process());

        let (mut reader, mut writer, process) = channel.into_parts();
        let mut child = process.unwrap();

        writer.write_all(b"hello\n").await.unwrap();
        writer.flush().await.unwrap();
        let mut buf = [0u8; 6];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\n");

        drop(writer);
        let status = child.wait().await.unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_describe() {
        let transport = ProcessTransport::new(ServerConfig::default().with_read_only());
        assert_eq!(
            transport.describe(),
            "npx -y kubernetes-mcp-server@latest --read-only"
        );
        let (memory, _) = InMemoryTransport::pair();
        assert_eq!(memory.describe(), "in-memory");
    }
}
