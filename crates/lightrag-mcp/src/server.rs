//! MCP Server implementation
//!
//! Reads newline-delimited JSON-RPC messages, handles each one on its own
//! task and writes responses back through a single writer task, so a slow
//! query never blocks a `tools/list` or `ping` behind it.

use std::sync::Arc;

use lightrag_client::{ClientConfig, LightRagClient};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::dispatch::Dispatcher;
use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InitializeParams, InitializeResult,
    JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR, ToolCallParams,
};
use crate::tools::{ToolCatalogue, ToolDefinition};
use crate::{Error, Result};

/// MCP Server for LightRAG
///
/// Cloning is cheap; clones share one dispatcher and one HTTP session.
///
/// # Example
///
/// ```ignore
/// use lightrag_client::ClientConfig;
/// use lightrag_mcp::LightRagMcpServer;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = LightRagMcpServer::new(ClientConfig::default())?;
///     server.run().await?;
///     server.shutdown();
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LightRagMcpServer {
    dispatcher: Arc<Dispatcher>,
}

impl LightRagMcpServer {
    /// Create a server talking to the LightRAG instance described by `config`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = LightRagClient::new(config)?;
        let dispatcher = Dispatcher::new(client, ToolCatalogue::default())?;
        Ok(Self::with_dispatcher(dispatcher))
    }

    pub fn with_dispatcher(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Get available tools
    pub fn tools(&self) -> &[ToolDefinition] {
        self.dispatcher.list_capabilities()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve MCP over the process's stdin and stdout until stdin closes
    pub async fn run(&self) -> Result<()> {
        tracing::info!(tools = self.tools().len(), "MCP server ready, listening on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve MCP over an arbitrary line-oriented transport
    ///
    /// Returns once `reader` hits end of input and every in-flight request has
    /// been answered. Stops reading early if `writer` fails, and reports that
    /// write error.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut in_flight = JoinSet::new();
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => line,
                    None => break,
                },
                _ = tx.closed() => {
                    tracing::warn!("Output closed, no longer reading input");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            tracing::debug!(request = %line, "Received message");

            let server = self.clone();
            let tx = tx.clone();
            let line = line.to_string();
            in_flight.spawn(async move {
                if let Some(response) = server.reply_to(&line).await {
                    // Receiver only goes away if the writer failed; that error
                    // is reported when the writer task is joined.
                    let _ = tx.send(response);
                }
            });

            while let Some(finished) = in_flight.try_join_next() {
                log_join_error(finished);
            }
        }

        tracing::debug!(pending = in_flight.len(), "Input closed, draining requests");
        while let Some(finished) = in_flight.join_next().await {
            log_join_error(finished);
        }
        drop(tx);

        match writer_task.await {
            Ok(result) => Ok(result?),
            Err(e) => Err(Error::Io(std::io::Error::other(e))),
        }
    }

    /// Release the HTTP session
    ///
    /// If clones are still alive the session closes when the last one drops.
    pub fn shutdown(self) {
        match Arc::try_unwrap(self.dispatcher) {
            Ok(dispatcher) => dispatcher.close(),
            Err(_) => tracing::debug!("Server still shared, session closes on last drop"),
        }
        tracing::info!("MCP server stopped");
    }

    /// Handle a single MCP message
    ///
    /// Returns the JSON-RPC response as a string, or an empty string for
    /// notifications. Fails only when `message` is not valid JSON.
    pub async fn handle_message(&self, message: &str) -> Result<String> {
        let value: Value = serde_json::from_str(message)?;
        let fallback_id = value.get("id").cloned().filter(|id| !id.is_null());

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let response = JsonRpcResponse::error(
                    fallback_id.or(Some(Value::Null)),
                    INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                );
                return Ok(serde_json::to_string(&response)?);
            }
        };

        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return Ok(String::new());
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id, request.params)?,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await?,
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        serde_json::to_string(&response).map_err(Error::from)
    }

    async fn reply_to(&self, line: &str) -> Option<String> {
        let response = match self.handle_message(line).await {
            Ok(response) if response.is_empty() => return None,
            Ok(response) => return Some(response),
            Err(Error::Json(e)) => {
                tracing::warn!(error = %e, "Unparseable message");
                JsonRpcResponse::error(Some(Value::Null), PARSE_ERROR, format!("Parse error: {}", e))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Request failed");
                JsonRpcResponse::error(None, INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        };
        serde_json::to_string(&response).ok()
    }

    /// Handle the initialize request
    fn handle_initialize(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        if let Ok(params) = serde_json::from_value::<InitializeParams>(params) {
            tracing::info!(
                client = params.client_info.as_ref().map(|c| c.name.as_str()),
                protocol_version = %params.protocol_version,
                "Client initializing"
            );
        }

        let result = InitializeResult::current();
        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.tools() }))
    }

    /// Handle tools/call request
    ///
    /// Tool failures are successful responses whose result carries `isError`.
    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let tool_params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return Ok(JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                ));
            }
        };

        let outcome = self
            .dispatcher
            .invoke(&tool_params.name, tool_params.arguments)
            .await;
        let tool_result = outcome.into_tool_result();
        Ok(JsonRpcResponse::success(id, serde_json::to_value(tool_result)?))
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

fn log_join_error(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Request task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncReadExt;

    fn server() -> LightRagMcpServer {
        LightRagMcpServer::new(ClientConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn server_loads_tools() {
        let server = server();
        assert_eq!(server.tools().len(), 26);

        let tool_names: Vec<&str> = server.tools().iter().map(|t| t.name.as_str()).collect();
        assert!(tool_names.contains(&"query_text"));
        assert!(tool_names.contains(&"insert_text"));
        assert!(tool_names.contains(&"get_workspace_info"));
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let request = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#;

        let response = server().handle_message(request).await.unwrap();
        assert!(response.contains("lightrag-mcp"));
        assert!(response.contains("capabilities"));
        assert!(response.contains("protocolVersion"));
    }

    #[tokio::test]
    async fn test_handle_initialized_notification() {
        let server = server();
        for request in [
            r#"{"jsonrpc":"2.0","method":"initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#,
        ] {
            let response = server.handle_message(request).await.unwrap();
            assert!(response.is_empty(), "{} should not be answered", request);
        }
    }

    #[tokio::test]
    async fn test_handle_ping() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(parsed, json!({"jsonrpc": "2.0", "id": "p", "result": {}}));
    }

    #[tokio::test]
    async fn test_handle_tools_list() {
        let request = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#;

        let response = server().handle_message(request).await.unwrap();
        let parsed: Value = serde_json::from_str(&response).unwrap();
        let tools = parsed["result"]["tools"].as_array().unwrap();

        assert_eq!(tools.len(), 26);
        assert_eq!(tools[0]["name"], "insert_text");
        assert!(tools[0].get("inputSchema").is_some());
        assert!(tools[0].get("input_schema").is_none());
    }

    #[tokio::test]
    async fn test_handle_unknown_method() {
        let request = r#"{"jsonrpc":"2.0","id":4,"method":"unknown/method","params":{}}"#;

        let response = server().handle_message(request).await.unwrap();
        assert!(response.contains("error"));
        assert!(response.contains("-32601"));
        assert!(response.contains("Method not found"));
    }

    #[tokio::test]
    async fn test_handle_tools_call_unknown_tool() {
        let request = r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"unknown_tool","arguments":{}}}"#;

        let response = server().handle_message(request).await.unwrap();
        let parsed: Value = serde_json::from_str(&response).unwrap();

        assert_eq!(parsed["result"]["content"][0]["text"], "Unknown tool: unknown_tool");
        assert!(parsed["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn test_handle_tools_call_without_name() {
        let request = r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"arguments":{}}}"#;

        let response = server().handle_message(request).await.unwrap();
        let parsed: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(parsed["error"]["code"], INVALID_PARAMS);
        assert_eq!(parsed["id"], 6);
    }

    #[tokio::test]
    async fn test_handle_tools_call_invalid_arguments() {
        let request = r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"query_text","arguments":{}}}"#;

        let response = server().handle_message(request).await.unwrap();
        let parsed: Value = serde_json::from_str(&response).unwrap();
        let text = parsed["result"]["content"][0]["text"].as_str().unwrap();

        assert_eq!(parsed["result"]["isError"], true);
        assert!(text.starts_with("Error executing query_text: "));
        assert!(text.contains("query"));
    }

    #[tokio::test]
    async fn test_handle_invalid_json() {
        let result = server().handle_message(r#"{"invalid json"#).await;
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_handle_request_without_method() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":8}"#)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(parsed["error"]["code"], INVALID_REQUEST);
        assert_eq!(parsed["id"], 8);
    }

    #[tokio::test]
    async fn test_response_format() {
        let request = r#"{"jsonrpc":"2.0","id":10,"method":"initialize","params":{}}"#;

        let response = server().handle_message(request).await.unwrap();

        let parsed: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["id"], 10);
        assert!(parsed.get("result").is_some());
        assert!(parsed.get("error").is_none());
    }

    #[tokio::test]
    async fn test_serve_answers_each_request_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
            "not json\n",
        );
        let (writer, mut reader) = tokio::io::duplex(1 << 20);

        server().serve(input.as_bytes(), writer).await.unwrap();

        let mut output = String::new();
        reader.read_to_string(&mut output).await.unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        let by_id = |id: Value| responses.iter().find(|r| r["id"] == id).unwrap();
        assert_eq!(by_id(json!(1))["result"]["serverInfo"]["name"], "lightrag-mcp");
        assert_eq!(by_id(json!(2))["result"]["tools"].as_array().unwrap().len(), 26);
        assert_eq!(by_id(Value::Null)["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_serve_stops_reading_when_output_fails() {
        let (mut client_input, server_input) = tokio::io::duplex(1 << 16);
        let (writer, output) = tokio::io::duplex(1 << 16);
        drop(output);

        client_input
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .unwrap();

        // Input stays open, so only the failed writer can end the loop
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            server().serve(BufReader::new(server_input), writer),
        )
        .await
        .expect("serve kept reading after its output failed");

        assert!(matches!(result, Err(Error::Io(_))));
        drop(client_input);
    }

    #[tokio::test]
    async fn test_shutdown_with_live_clone() {
        let server = server();
        let clone = server.clone();
        server.shutdown();
        assert_eq!(clone.tools().len(), 26);
        clone.shutdown();
    }
}
