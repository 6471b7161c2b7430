//! Model Context Protocol support for TriML
//!
//! All MCP traffic in the project goes through [`client`].

pub mod client;
