//! Tool dispatch
//!
//! Routes a `tools/call` by name to the matching gateway operation. Every
//! invocation goes through the same steps: look up the tool, fill in declared
//! defaults, validate the arguments against the catalogue, call the gateway
//! and render the outcome as text. Nothing in here talks to the protocol layer.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lightrag_client::{CacheType, LightRagClient, QueryMode, QueryParams, TextDocument};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::tools::{ParamKind, ToolCatalogue, ToolDefinition, ToolResult};
use crate::{Error, Result};

macro_rules! tool_names {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Closed set of tools the dispatcher knows how to execute
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ToolName {
            $($variant),*
        }

        impl ToolName {
            /// Every tool, in catalogue order
            pub const ALL: &'static [ToolName] = &[$(ToolName::$variant),*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ToolName::$variant => $name),*
                }
            }
        }

        impl FromStr for ToolName {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok(ToolName::$variant),)*
                    other => Err(Error::UnknownTool(other.to_string())),
                }
            }
        }
    };
}

tool_names! {
    InsertText => "insert_text",
    InsertTexts => "insert_texts",
    UploadDocument => "upload_document",
    UploadDocuments => "upload_documents",
    ScanDocuments => "scan_documents",
    GetDocuments => "get_documents",
    GetDocumentsPaginated => "get_documents_paginated",
    DeleteDocument => "delete_document",
    ClearDocuments => "clear_documents",
    DocumentStatus => "document_status",
    QueryText => "query_text",
    QueryTextStream => "query_text_stream",
    QueryWithCitation => "query_with_citation",
    GetKnowledgeGraph => "get_knowledge_graph",
    GetGraphStructure => "get_graph_structure",
    GetEntities => "get_entities",
    GetRelations => "get_relations",
    CheckEntityExists => "check_entity_exists",
    UpdateEntity => "update_entity",
    DeleteEntity => "delete_entity",
    DeleteRelation => "delete_relation",
    GetHealth => "get_health",
    GetStatus => "get_status",
    ClearCache => "clear_cache",
    GetConfig => "get_config",
    GetWorkspaceInfo => "get_workspace_info",
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Rendered backend result (or the unknown-tool notice)
    Ok(String),
    /// `Error executing <tool>: <message>`
    Failure(String),
}

impl ToolOutcome {
    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Ok(text) | ToolOutcome::Failure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::Failure(_))
    }

    pub fn into_tool_result(self) -> ToolResult {
        match self {
            ToolOutcome::Ok(text) => ToolResult::text(text),
            ToolOutcome::Failure(text) => ToolResult::error(text),
        }
    }
}

/// What a gateway call produced, before rendering
enum Output {
    Json(Value),
    Text(String),
}

impl Output {
    fn render(self) -> Result<String> {
        match self {
            Output::Json(value) => Ok(serde_json::to_string_pretty(&value)?),
            Output::Text(text) => Ok(text),
        }
    }
}

/// Routes tool calls to the LightRAG gateway
///
/// Construction verifies that the catalogue and the executable tool set agree
/// exactly, so a listed tool can always be invoked.
#[derive(Debug)]
pub struct Dispatcher {
    client: LightRagClient,
    catalogue: ToolCatalogue,
    routes: HashMap<String, ToolName>,
}

impl Dispatcher {
    pub fn new(client: LightRagClient, catalogue: ToolCatalogue) -> Result<Self> {
        let mut routes = HashMap::new();
        for definition in catalogue.definitions() {
            let tool: ToolName = definition.name.parse().map_err(|_| {
                Error::Registration(format!("no handler for tool '{}'", definition.name))
            })?;
            if routes.insert(definition.name.clone(), tool).is_some() {
                return Err(Error::Registration(format!(
                    "tool '{}' is declared more than once",
                    definition.name
                )));
            }
        }

        if let Some(missing) = ToolName::ALL
            .iter()
            .find(|tool| !routes.contains_key(tool.as_str()))
        {
            return Err(Error::Registration(format!(
                "handler '{}' has no catalogue entry",
                missing
            )));
        }

        tracing::debug!(tools = routes.len(), "tool dispatcher ready");
        Ok(Self {
            client,
            catalogue,
            routes,
        })
    }

    /// The catalogue, in declaration order
    pub fn list_capabilities(&self) -> &[ToolDefinition] {
        self.catalogue.definitions()
    }

    pub fn client(&self) -> &LightRagClient {
        &self.client
    }

    /// Run one tool call; never fails, errors become [`ToolOutcome::Failure`]
    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolOutcome {
        let (Some(tool), Some(definition)) = (self.routes.get(name), self.catalogue.get(name))
        else {
            tracing::warn!(tool = name, "unknown tool requested");
            return ToolOutcome::Ok(format!("Unknown tool: {}", name));
        };

        tracing::debug!(tool = name, group = ?definition.group, "invoking tool");
        let result = match prepare_arguments(definition, arguments) {
            Ok(arguments) => self.execute(*tool, arguments).await,
            Err(e) => Err(e),
        };

        match result.and_then(Output::render) {
            Ok(text) => ToolOutcome::Ok(text),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                ToolOutcome::Failure(format!("Error executing {}: {}", name, e))
            }
        }
    }

    /// Release the underlying HTTP client
    pub fn close(self) {
        self.client.close();
    }

    async fn execute(&self, tool: ToolName, arguments: Map<String, Value>) -> Result<Output> {
        let client = &self.client;
        let json = match tool {
            // Documents
            ToolName::InsertText => {
                let args: InsertTextArgs = parse(arguments)?;
                client
                    .insert_text(&args.text, args.description.as_deref())
                    .await?
            }
            ToolName::InsertTexts => {
                let args: InsertTextsArgs = parse(arguments)?;
                client.insert_texts(&args.texts).await?
            }
            ToolName::UploadDocument => {
                let args: UploadDocumentArgs = parse(arguments)?;
                client
                    .upload_document(&args.file_path, args.chunk_size, args.chunk_overlap)
                    .await?
            }
            ToolName::UploadDocuments => {
                let args: UploadDocumentsArgs = parse(arguments)?;
                client.upload_documents(&args.file_paths).await?
            }
            ToolName::ScanDocuments => client.scan_documents().await?,
            ToolName::GetDocuments => client.get_documents().await?,
            ToolName::GetDocumentsPaginated => {
                let args: PaginationArgs = parse(arguments)?;
                client
                    .get_documents_paginated(args.page, args.page_size)
                    .await?
            }
            ToolName::DeleteDocument => {
                let args: DocumentIdArgs = parse(arguments)?;
                client.delete_document(&args.document_id).await?
            }
            ToolName::ClearDocuments => client.clear_documents().await?,
            ToolName::DocumentStatus => {
                let args: DocumentStatusArgs = parse(arguments)?;
                client.document_status(args.document_id.as_deref()).await?
            }

            // Query
            ToolName::QueryText => {
                let args: QueryTextArgs = parse(arguments)?;
                let params = QueryParams {
                    query: args.query,
                    mode: args.mode,
                    only_need_context: args.only_need_context,
                    top_k: args.top_k,
                    max_tokens: args.max_tokens,
                };
                client.query(&params).await?
            }
            ToolName::QueryTextStream => {
                let args: QueryStreamArgs = parse(arguments)?;
                let text = client
                    .query_stream(&args.query, args.mode, args.only_need_context)
                    .await?;
                return Ok(Output::Text(text));
            }
            ToolName::QueryWithCitation => {
                let args: CitationArgs = parse(arguments)?;
                client.query_with_citation(&args.query, args.mode).await?
            }

            // Graph
            ToolName::GetKnowledgeGraph => client.get_knowledge_graph().await?,
            ToolName::GetGraphStructure => client.get_graph_structure().await?,
            ToolName::GetEntities => {
                let args: LimitArgs = parse(arguments)?;
                client.get_entities(args.limit).await?
            }
            ToolName::GetRelations => {
                let args: LimitArgs = parse(arguments)?;
                client.get_relations(args.limit).await?
            }
            ToolName::CheckEntityExists => {
                let args: EntityNameArgs = parse(arguments)?;
                client.check_entity_exists(&args.entity_name).await?
            }
            ToolName::UpdateEntity => {
                let args: UpdateEntityArgs = parse(arguments)?;
                client
                    .update_entity(&args.entity_id, &args.properties)
                    .await?
            }
            ToolName::DeleteEntity => {
                let args: EntityIdArgs = parse(arguments)?;
                client.delete_entity(&args.entity_id).await?
            }
            ToolName::DeleteRelation => {
                let args: RelationIdArgs = parse(arguments)?;
                client.delete_relation(&args.relation_id).await?
            }

            // System
            ToolName::GetHealth => client.get_health().await?,
            ToolName::GetStatus => client.get_status().await?,
            ToolName::ClearCache => {
                let args: ClearCacheArgs = parse(arguments)?;
                client.clear_cache(args.cache_type).await?
            }
            ToolName::GetConfig => client.get_config().await?,
            ToolName::GetWorkspaceInfo => client.get_workspace_info().await?,
        };

        Ok(Output::Json(json))
    }
}

// ============================================================================
// Argument preparation
// ============================================================================

/// Normalize raw call arguments against a tool definition
///
/// `null` counts as an empty object. Absent or `null` optional keys take the
/// declared default when there is one and are dropped otherwise. Keys the
/// definition does not declare are passed through untouched.
pub fn prepare_arguments(definition: &ToolDefinition, arguments: Value) -> Result<Map<String, Value>> {
    let mut arguments = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(Error::invalid_arguments(format!(
                "arguments must be an object, got {}",
                json_type_name(&other)
            )));
        }
    };

    for param in &definition.params {
        let present = arguments.get(param.name).is_some_and(|v| !v.is_null());
        if present {
            continue;
        }
        arguments.remove(param.name);
        if param.required {
            return Err(Error::invalid_arguments(format!(
                "missing required argument '{}'",
                param.name
            )));
        }
        if let Some(default) = &param.default {
            arguments.insert(param.name.to_string(), default.clone());
        }
    }

    for param in &definition.params {
        if let Some(value) = arguments.get(param.name) {
            check_kind(param.name, &param.kind, value)?;
        }
    }

    Ok(arguments)
}

fn check_kind(name: &str, kind: &ParamKind, value: &Value) -> Result<()> {
    let ok = match kind {
        ParamKind::String => value.is_string(),
        ParamKind::Identifier => value.as_str().is_some_and(|s| !s.is_empty()),
        ParamKind::Integer => value.is_i64() || value.is_u64(),
        ParamKind::Boolean => value.is_boolean(),
        ParamKind::Object => value.is_object(),
        ParamKind::StringArray => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        ParamKind::DocumentArray => value.as_array().is_some_and(|items| {
            items
                .iter()
                .all(|item| item.get("content").is_some_and(Value::is_string))
        }),
        ParamKind::Enum(allowed) => {
            let Some(s) = value.as_str() else {
                return Err(type_mismatch(name, kind, value));
            };
            if !allowed.iter().any(|v| *v == s) {
                return Err(Error::invalid_arguments(format!(
                    "'{}' must be one of [{}], got '{}'",
                    name,
                    allowed.join(", "),
                    s
                )));
            }
            true
        }
    };

    if ok {
        Ok(())
    } else {
        Err(type_mismatch(name, kind, value))
    }
}

fn type_mismatch(name: &str, kind: &ParamKind, value: &Value) -> Error {
    let expected = match kind {
        ParamKind::Identifier => "a non-empty string",
        ParamKind::StringArray => "array of strings",
        ParamKind::DocumentArray => "array of objects with a string 'content'",
        other => other.json_type(),
    };
    Error::invalid_arguments(format!(
        "'{}' must be {}, got {}",
        name,
        expected,
        json_type_name(value)
    ))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse<T: DeserializeOwned>(arguments: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| Error::invalid_arguments(e.to_string()))
}

// ============================================================================
// Typed arguments
// ============================================================================

#[derive(Debug, Deserialize)]
struct InsertTextArgs {
    text: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertTextsArgs {
    texts: Vec<TextDocument>,
}

#[derive(Debug, Deserialize)]
struct UploadDocumentArgs {
    file_path: String,
    #[serde(default)]
    chunk_size: Option<u64>,
    #[serde(default)]
    chunk_overlap: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UploadDocumentsArgs {
    file_paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PaginationArgs {
    page: u64,
    page_size: u64,
}

#[derive(Debug, Deserialize)]
struct DocumentIdArgs {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentStatusArgs {
    #[serde(default)]
    document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryTextArgs {
    query: String,
    mode: QueryMode,
    only_need_context: bool,
    top_k: u64,
    #[serde(default)]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct QueryStreamArgs {
    query: String,
    mode: QueryMode,
    only_need_context: bool,
}

#[derive(Debug, Deserialize)]
struct CitationArgs {
    query: String,
    mode: QueryMode,
}

#[derive(Debug, Deserialize)]
struct LimitArgs {
    #[serde(default)]
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EntityNameArgs {
    entity_name: String,
}

#[derive(Debug, Deserialize)]
struct UpdateEntityArgs {
    entity_id: String,
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct EntityIdArgs {
    entity_id: String,
}

#[derive(Debug, Deserialize)]
struct RelationIdArgs {
    relation_id: String,
}

#[derive(Debug, Deserialize)]
struct ClearCacheArgs {
    cache_type: CacheType,
}
