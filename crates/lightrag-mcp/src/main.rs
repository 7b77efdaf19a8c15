//! LightRAG MCP Server
//!
//! A Model Context Protocol server that exposes a LightRAG instance to
//! agentic clients like Claude Desktop, Windsurf, and Cursor.
//!
//! # Usage
//!
//! ```bash
//! lightrag-mcp [--server-url <url>] [--api-key <key>] [--workspace <name>] [--config <file>]
//! ```
//!
//! # Environment Variables
//!
//! - `LIGHTRAG_SERVER_URL`, `LIGHTRAG_API_KEY`, `LIGHTRAG_WORKSPACE`,
//!   `LIGHTRAG_TIMEOUT_SECS`: connection settings
//! - `LIGHTRAG_MCP_CONFIG`: path to a TOML config file
//! - `RUST_LOG`: Control log verbosity (default: `lightrag_mcp=info`)
//!
//! # Protocol
//!
//! The server communicates via JSON-RPC 2.0 over stdio:
//! - Requests/responses go through stdout
//! - Logs go to stderr (to avoid interfering with the protocol)

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lightrag_mcp::{ConfigFile, ConfigOverrides, LightRagMcpServer};
use tracing_subscriber::EnvFilter;

/// MCP server for LightRAG
#[derive(Parser)]
#[command(name = "lightrag-mcp")]
#[command(about = "MCP server for LightRAG")]
#[command(version)]
struct Args {
    /// Base URL of the LightRAG server [default: http://localhost:9621]
    #[arg(long, env = "LIGHTRAG_SERVER_URL")]
    server_url: Option<String>,

    /// API key sent as a bearer token
    #[arg(long, env = "LIGHTRAG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Workspace sent with every request
    #[arg(long, env = "LIGHTRAG_WORKSPACE")]
    workspace: Option<String>,

    /// Per-request timeout in seconds [default: 300]
    #[arg(long, env = "LIGHTRAG_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// TOML config file with a [lightrag] table
    #[arg(short, long, env = "LIGHTRAG_MCP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging to stderr (stdout is reserved for MCP protocol)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lightrag_mcp=info,lightrag_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let server = match start(args) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error starting LightRAG MCP server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serve(server).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("LightRAG MCP server stopped with error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn start(args: Args) -> lightrag_mcp::Result<LightRagMcpServer> {
    let file = args.config.as_deref().map(ConfigFile::load).transpose()?;
    let overrides = ConfigOverrides {
        server_url: args.server_url,
        api_key: args.api_key,
        workspace: args.workspace,
        timeout_secs: args.timeout_secs,
    };
    let config = lightrag_mcp::resolve(overrides, file)?;

    tracing::info!(server_url = %config.base_url, workspace = ?config.workspace, "Starting lightrag-mcp server");

    LightRagMcpServer::new(config)
}

async fn serve(server: LightRagMcpServer) -> lightrag_mcp::Result<()> {
    let result = tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    };

    server.shutdown();
    result
}
