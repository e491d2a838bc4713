//! Model Context Protocol (MCP) server implementation.
//!
//! Exposes the secure note [`Catalog`](crate::catalog::Catalog) as MCP tools.
//! The server speaks JSON-RPC 2.0 over a newline-delimited stdio transport.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        MCP Server                        │
//! │                                                          │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────┐   │
//! │   │  Transport  │───▶│   Server    │───▶│  Catalog   │   │
//! │   │   (stdio)   │    │ (lifecycle) │    │  (tools)   │   │
//! │   └─────────────┘    └─────────────┘    └────────────┘   │
//! │                                               │          │
//! │                                               ▼          │
//! │                                        ┌────────────┐    │
//! │                                        │  op CLI    │    │
//! │                                        └────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! Versions 2025-06-18, 2025-03-26 and 2024-11-05 are accepted.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{LineTransport, StdioTransport};
