//! Server launch configuration for the Kubernetes MCP server
//!
//! A [`ServerConfig`] describes how to start the tool server: the command, its
//! arguments, and optionally a full replacement environment. Every `with_*`
//! method returns a new value and leaves the receiver untouched, so a base
//! configuration can be reused across many derived variants.

use crate::mcp::client::error::Result;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Flag that puts the server into read-only mode
pub const READ_ONLY_FLAG: &str = "--read-only";

/// Flag that points the server at a kubeconfig file (followed by the path)
pub const KUBECONFIG_FLAG: &str = "--kubeconfig";

/// Environment variable the server reads its kubeconfig path from
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

const DEFAULT_COMMAND: &str = "npx";
const DEFAULT_ARGS: [&str; 2] = ["-y", "kubernetes-mcp-server@latest"];

/// Launch description for the MCP server subprocess (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    command: String,
    args: Vec<String>,
    /// `KEY=VALUE` entries. `None` inherits the caller's environment.
    #[serde(with = "env_entries", skip_serializing_if = "Option::is_none")]
    env: Option<Vec<OsString>>,
}

impl Default for ServerConfig {
    /// Runs the Kubernetes MCP server through `npx`
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            args: DEFAULT_ARGS.iter().map(|a| a.to_string()).collect(),
            env: None,
        }
    }
}

impl ServerConfig {
    pub fn new<S: Into<String>>(command: S, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: None,
        }
    }

    /// Load a configuration from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> Option<&[OsString]> {
        self.env.as_deref()
    }

    /// Returns a copy with [`READ_ONLY_FLAG`] appended to the arguments
    pub fn with_read_only(&self) -> Self {
        let mut out = self.clone();
        out.args.push(READ_ONLY_FLAG.to_string());
        out
    }

    /// Returns a copy with [`KUBECONFIG_FLAG`] and `path` appended to the arguments.
    ///
    /// The path is passed through as-is; the server decides whether it is usable.
    pub fn with_kubeconfig(&self, path: impl AsRef<Path>) -> Self {
        let mut out = self.clone();
        out.args.push(KUBECONFIG_FLAG.to_string());
        out.args.push(path.as_ref().to_string_lossy().into_owned());
        out
    }

    /// Returns a copy whose environment is the current process environment with
    /// `KUBECONFIG` replaced by `path`.
    ///
    /// Reads the ambient environment once; it is never modified. Entries are
    /// kept byte for byte, including values that are not valid UTF-8.
    pub fn with_kubeconfig_env(&self, path: impl AsRef<OsStr>) -> Self {
        let inherited = std::env::vars_os().map(|(mut entry, value)| {
            entry.push("=");
            entry.push(value);
            entry
        });
        self.with_kubeconfig_env_from(inherited, path)
    }

    /// Like [`with_kubeconfig_env`](Self::with_kubeconfig_env) but starting from
    /// an explicit base environment instead of the process one.
    pub fn with_kubeconfig_env_from<I, S>(&self, base: I, path: impl AsRef<OsStr>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let prefix = format!("{KUBECONFIG_ENV}=");
        let mut env: Vec<OsString> = base
            .into_iter()
            .map(Into::<OsString>::into)
            .filter(|entry| !entry.as_encoded_bytes().starts_with(prefix.as_bytes()))
            .collect();
        let mut kubeconfig = OsString::from(prefix);
        kubeconfig.push(path);
        env.push(kubeconfig);

        let mut out = self.clone();
        out.env = Some(env);
        out
    }

    /// Returns a copy whose subprocess environment is exactly `env`.
    ///
    /// This replaces inheritance; nothing from the caller's environment is merged in.
    pub fn with_env<I, S>(&self, env: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut out = self.clone();
        out.env = Some(env.into_iter().map(Into::into).collect());
        out
    }

    /// Build the command that launches the server.
    ///
    /// When an environment is set the child sees only that environment. Stdio
    /// wiring is left to the transport; stderr is inherited for diagnostics.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).stderr(Stdio::inherit());

        if let Some(env) = &self.env {
            cmd.env_clear();
            for entry in env {
                match split_entry(entry) {
                    Some((key, value)) if !key.is_empty() => {
                        cmd.env(key, value);
                    }
                    _ => tracing::warn!(
                        entry = %entry.to_string_lossy(),
                        "Skipping malformed environment entry"
                    ),
                }
            }
        }

        cmd
    }
}

/// Split `KEY=VALUE` at the first `=`
#[cfg(unix)]
fn split_entry(entry: &OsStr) -> Option<(&OsStr, &OsStr)> {
    use std::os::unix::ffi::OsStrExt;

    let bytes = entry.as_bytes();
    let eq = bytes.iter().position(|b| *b == b'=')?;
    Some((OsStr::from_bytes(&bytes[..eq]), OsStr::from_bytes(&bytes[eq + 1..])))
}

#[cfg(not(unix))]
fn split_entry(entry: &OsStr) -> Option<(&OsStr, &OsStr)> {
    let (key, value) = entry.to_str()?.split_once('=')?;
    Some((OsStr::new(key), OsStr::new(value)))
}

/// TOML keeps environment entries as plain strings
mod env_entries {
    use serde::{Deserialize, Deserializer, Serializer, ser::Error};
    use std::ffi::OsString;

    pub fn serialize<S>(env: &Option<Vec<OsString>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let Some(entries) = env else {
            return serializer.serialize_none();
        };
        let entries = entries
            .iter()
            .map(|entry| {
                entry.to_str().ok_or_else(|| {
                    S::Error::custom(format!(
                        "environment entry is not valid UTF-8: {}",
                        entry.to_string_lossy()
                    ))
                })
            })
            .collect::<Result<Vec<&str>, S::Error>>()?;
        serializer.serialize_some(&entries)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<OsString>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let env = Option::<Vec<String>>::deserialize(deserializer)?;
        Ok(env.map(|entries| entries.into_iter().map(OsString::from).collect()))
    }
}
