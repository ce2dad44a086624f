//! academiadepolitie-mcp: MCP server for AcademiaDePolitie student data
//!
//! This library adapts the AcademiaDePolitie internal API to the Model
//! Context Protocol so AI assistants can read a student's profile,
//! recent activity, progress and peer matches.
//!
//! # Architecture
//!
//! Each JSON-RPC line read from stdin is dispatched on its own, and a
//! `tools/call` becomes exactly one HTTP `GET` against the backend:
//!
//! - **Dispatcher**: routes `initialize`, `tools/*` and `resources/*`
//! - **Parameter mapping**: turns typed tool arguments into backend query parameters
//! - **Backend client**: performs the authenticated request
//!
//! # Modules
//!
//! - [`backend`]: HTTP client for the internal API
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`install`]: Client configuration installer
//! - [`mcp`]: MCP protocol implementation
//! - [`tools`]: Tool and resource registries

pub mod backend;
pub mod config;
pub mod error;
pub mod install;
pub mod mcp;
pub mod tools;
