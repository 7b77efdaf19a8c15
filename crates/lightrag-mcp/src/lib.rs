//! MCP Server for LightRAG
//!
//! This crate exposes a LightRAG server's document, query, knowledge-graph and
//! system endpoints as Model Context Protocol tools, so MCP clients (Claude
//! Desktop, IDE agents) can drive retrieval-augmented generation over stdio.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client ]
//!        | (JSON-RPC over stdio)
//!        v
//! [ server ]  -- protocol handling, one task per request
//!        |
//!        v
//! [ dispatch ] -- defaults, validation, rendering   [ tools ] -- catalogue
//!        |
//!        v
//! [ lightrag-client ] -- HTTP gateway
//!        |
//!        v
//! [ LightRAG server ]
//! ```
//!
//! # Tools
//!
//! The server exposes 26 tools in four groups:
//! - Documents (insert, upload, list, delete, status)
//! - Query (plain, streamed and cited retrieval)
//! - Graph (entities, relations, structure)
//! - System (health, status, cache, config, workspace)

pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::{ConfigFile, ConfigOverrides, resolve};
pub use dispatch::{Dispatcher, ToolName, ToolOutcome};
pub use error::{Error, Result};
pub use server::LightRagMcpServer;
pub use tools::{ToolCatalogue, ToolContent, ToolDefinition, ToolResult, get_tool_definitions};
