//! Shared test utilities for the lightrag-mcp workspace.
//!
//! This crate provides a stand-in LightRAG server so client and dispatcher
//! tests exercise real HTTP without a live backend. It is a dev-dependency
//! only and is never published.
//!
//! # Modules
//!
//! - [`backend`]: [`StubBackend`], an in-process HTTP server that records
//!   every request and answers with canned or overridden responses

pub mod backend;

pub use axum::http::StatusCode;
pub use backend::{RecordedRequest, StubBackend, StubResponse, unreachable_url};
