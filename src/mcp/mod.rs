//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the AcademiaDePolitie student-data API as MCP tools
//! and resources. The server communicates over stdio transport using
//! newline-delimited JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────────┐     │
//! │   │  Transport  │───▶│ Dispatcher  │───▶│ Tools /      │     │
//! │   │   (stdio)   │    │  (routing)  │    │ Resources    │     │
//! │   └─────────────┘    └─────────────┘    └──────────────┘     │
//! │                                                │             │
//! │                                                ▼             │
//! │                                         ┌──────────────┐     │
//! │                                         │ Backend HTTP │     │
//! │                                         └──────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION};
pub use server::{Dispatcher, McpServer};
pub use transport::{LineTransport, StdioTransport};
