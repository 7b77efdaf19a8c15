//! HTTP client for the LightRAG server
//!
//! This crate is the network layer of the LightRAG MCP adapter. It wraps the
//! LightRAG REST API in one typed async method per operation and owns the
//! single long-lived HTTP session (connection pool, default headers, timeout)
//! shared by every in-flight call.
//!
//! # Architecture
//!
//! ```text
//! [ lightrag-mcp (Dispatcher) ]
//!        | (typed Rust calls)
//!        v
//! [ lightrag-client (LightRagClient) ]
//!        | (HTTP/JSON, one request per call)
//!        v
//! [ LightRAG server ]
//! ```
//!
//! # Request rules
//!
//! - Every request carries `Content-Type: application/json`.
//! - `Authorization: Bearer <key>` is sent when an API key is configured.
//! - `LIGHTRAG-WORKSPACE: <name>` is sent on every request when a workspace
//!   is configured.
//! - Non-2xx statuses, transport failures and undecodable bodies all surface
//!   as [`Error`]. There are no retries.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{LightRagClient, WORKSPACE_HEADER};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{Error, Result};
pub use types::{CacheType, QueryMode, QueryParams, TextDocument};
