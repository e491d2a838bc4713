//! op-secure-notes-mcp: MCP server for 1Password secure notes
//!
//! This library exposes a small set of tools that let an AI assistant read
//! and maintain secure notes in one 1Password vault, by driving the `op` CLI.
//!
//! # Architecture
//!
//! The server holds no secrets of its own. Every tool call becomes one or
//! two `op` invocations, and every outcome (including failures) is returned
//! to the client as a single text item:
//!
//! - **Catalog**: tool registry, precondition checks and the response envelope
//! - **Vault**: the [`VaultStore`](vault::VaultStore) seam and its `op` CLI adapter
//! - **MCP**: JSON-RPC lifecycle over stdio
//!
//! # Modules
//!
//! - [`catalog`] - Tool registry, dispatcher and the secure note tools
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types
//! - [`mcp`] - MCP protocol implementation
//! - [`vault`] - 1Password CLI adapter

pub mod catalog;
pub mod config;
pub mod error;
pub mod mcp;
pub mod vault;
