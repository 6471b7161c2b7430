//! triml CLI entrypoint
//! Starts the Kubernetes MCP server, then lists or calls its tools.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use std::path::PathBuf;
use std::time::Duration;
use triml::mcp::client::{
    CancellationToken, JsonObject, McpClient, ServerConfig, extract_text, for_each_text,
};

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "triml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

/// How to launch the MCP server
#[derive(clap::Args, Debug)]
struct ServerArgs {
    /// TOML file with `command`, `args` and `env`
    #[arg(long)]
    config: Option<PathBuf>,
    /// Command to run the MCP server (overrides the config file)
    #[arg(long)]
    server_command: Option<String>,
    /// Arguments for the server command (replace the configured ones)
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    server_args: Vec<String>,
    /// Start the server in read-only mode
    #[arg(long)]
    read_only: bool,
    /// Kubeconfig file passed as a server flag
    #[arg(long)]
    kubeconfig: Option<PathBuf>,
    /// Kubeconfig file passed through the KUBECONFIG environment variable
    #[arg(long)]
    kubeconfig_env: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List available tools from the server
    #[command(name = "list-tools")]
    ListTools,
    /// Call a tool with JSON arguments
    Call {
        /// Name of the tool to call
        tool_name: String,
        /// JSON object with the tool arguments
        #[arg(long)]
        args: Option<String>,
        /// Print all text parts as one block instead of one per line
        #[arg(long)]
        joined: bool,
    },
}

impl ServerArgs {
    fn to_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if self.server_command.is_some() || !self.server_args.is_empty() {
            let command = self.server_command.as_deref().unwrap_or(config.command());
            let mut rebuilt = ServerConfig::new(command, self.server_args.clone());
            if let Some(env) = config.env() {
                rebuilt = rebuilt.with_env(env.iter().cloned());
            }
            config = rebuilt;
        }
        if self.read_only {
            config = config.with_read_only();
        }
        if let Some(path) = &self.kubeconfig {
            config = config.with_kubeconfig(path);
        }
        if let Some(path) = &self.kubeconfig_env {
            config = config.with_kubeconfig_env(path);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries tool output only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.server.to_config()?;

    let ct = CancellationToken::new();
    let ctrl_c = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    let mut client =
        McpClient::new(config).with_timeout(Duration::from_secs(cli.timeout_secs));
    client
        .connect(&ct)
        .await
        .context("Failed to connect to MCP server")?;

    let outcome = match &cli.command {
        Commands::ListTools => run_list_tools(&client, &ct).await,
        Commands::Call {
            tool_name,
            args,
            joined,
        } => run_call(&client, &ct, tool_name, args.as_deref(), *joined).await,
    };

    client
        .close()
        .await
        .context("Failed to close MCP session")?;
    outcome
}

/// Print the tool catalog
async fn run_list_tools(client: &McpClient, ct: &CancellationToken) -> anyhow::Result<()> {
    info!("Listing tools from MCP server");

    let tools = client
        .list_tools(ct)
        .await
        .context("Failed to list tools from MCP server")?;

    if tools.is_empty() {
        println!("No tools available from the MCP server.");
    } else {
        for tool in &tools {
            println!("{}\t{}", tool.name, tool.description_or_empty());
        }
    }
    info!(count = tools.len(), "Listed tools");
    Ok(())
}

/// Call one tool and print its text output
async fn run_call(
    client: &McpClient,
    ct: &CancellationToken,
    tool_name: &str,
    args: Option<&str>,
    joined: bool,
) -> anyhow::Result<()> {
    let arguments = parse_arguments(args)?;
    info!(tool = %tool_name, "Calling tool");

    let result = client
        .call_tool(ct, tool_name, arguments)
        .await
        .with_context(|| format!("Failed to call tool '{}'", tool_name))?;

    if joined {
        println!("{}", extract_text(Some(&result)));
    } else {
        let mut print = |text: &str| println!("{}", text);
        for_each_text(Some(&result), Some(&mut print));
    }

    if result.is_error.unwrap_or(false) {
        anyhow::bail!("Tool '{}' reported an error", tool_name);
    }
    Ok(())
}

/// Parse `--args` into a JSON object; absent means no arguments
fn parse_arguments(args: Option<&str>) -> anyhow::Result<Option<JsonObject>> {
    let Some(json_str) = args else {
        return Ok(None);
    };
    let value: serde_json::Value =
        serde_json::from_str(json_str).context("Failed to parse JSON arguments")?;
    match value {
        serde_json::Value::Object(map) => Ok(Some(map)),
        other => anyhow::bail!("Tool arguments must be a JSON object, got: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("triml").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments(None).unwrap().is_none());
        let map = parse_arguments(Some(r#"{"namespace": "default"}"#))
            .unwrap()
            .unwrap();
        assert_eq!(map["namespace"], "default");
        assert!(parse_arguments(Some("[1, 2]")).is_err());
        assert!(parse_arguments(Some("{not json")).is_err());
    }

    #[test]
    fn test_default_server_config() {
        let cli = parse(&["list-tools"]);
        assert_eq!(cli.server.to_config().unwrap(), ServerConfig::default());
        assert!(matches!(cli.command, Commands::ListTools));
    }

    #[test]
    fn test_server_flags_build_config() {
        let cli = parse(&[
            "--server-command",
            "kubernetes-mcp-server",
            "--server-arg",
            "--log-level",
            "--server-arg",
            "2",
            "--read-only",
            "--kubeconfig",
            "/etc/kube/config",
            "call",
            "pods_list",
            "--joined",
        ]);
        let config = cli.server.to_config().unwrap();
        assert_eq!(config.command(), "kubernetes-mcp-server");
        assert_eq!(
            config.args(),
            [
                "--log-level",
                "2",
                "--read-only",
                "--kubeconfig",
                "/etc/kube/config"
            ]
        );
        match cli.command {
            Commands::Call {
                tool_name, joined, ..
            } => {
                assert_eq!(tool_name, "pods_list");
                assert!(joined);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_kubeconfig_env_flag() {
        let cli = parse(&["--kubeconfig-env", "/tmp/kube", "list-tools"]);
        let config = cli.server.to_config().unwrap();
        let env = config.env().unwrap();
        assert_eq!(
            env.iter()
                .filter(|e| e.to_string_lossy().starts_with("KUBECONFIG="))
                .count(),
            1
        );
        assert!(env.contains(&OsString::from("KUBECONFIG=/tmp/kube")));
    }
}
