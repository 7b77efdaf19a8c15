//! MCP tool catalogue
//!
//! This module holds the static descriptors advertised through `tools/list`.
//! It is a pure data source: argument defaulting and validation against these
//! descriptors happen in [`crate::dispatch`].
//!
//! # Tool Groups
//!
//! ## Documents
//! - `insert_text`, `insert_texts` - Insert raw text
//! - `upload_document`, `upload_documents` - Ingest files by path
//! - `scan_documents` - Scan the server input directory
//! - `get_documents`, `get_documents_paginated` - List documents
//! - `delete_document`, `clear_documents` - Remove documents
//! - `document_status` - Processing status
//!
//! ## Query
//! - `query_text` - Retrieval query (naive, local, global, hybrid, mix)
//! - `query_text_stream` - Streamed query, returned once complete
//! - `query_with_citation` - Query with source citations
//!
//! ## Graph
//! - `get_knowledge_graph`, `get_graph_structure`
//! - `get_entities`, `get_relations`
//! - `check_entity_exists`, `update_entity`, `delete_entity`, `delete_relation`
//!
//! ## System
//! - `get_health`, `get_status`, `clear_cache`, `get_config`, `get_workspace_info`

use lightrag_client::{CacheType, QueryMode, QueryParams};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Logical grouping of tools; only used for documentation and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroup {
    Documents,
    Query,
    Graph,
    System,
}

/// Declared type of one tool argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// Non-empty string naming one item; it ends up as a URL path segment
    Identifier,
    Integer,
    Boolean,
    Object,
    StringArray,
    /// Array of `{content, title?, metadata?}` objects
    DocumentArray,
    /// String restricted to the listed values
    Enum(&'static [&'static str]),
}

impl ParamKind {
    /// JSON Schema `type` keyword for this kind
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String | ParamKind::Identifier | ParamKind::Enum(_) => "string",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
            ParamKind::StringArray | ParamKind::DocumentArray => "array",
        }
    }
}

/// One declared argument of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            default: None,
        }
    }

    /// Value used when the caller omits this argument
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(self.kind.json_type()));
        schema.insert("description".to_string(), json!(self.description));
        match &self.kind {
            ParamKind::Enum(values) => {
                schema.insert("enum".to_string(), json!(values));
            }
            ParamKind::Identifier => {
                schema.insert("minLength".to_string(), json!(1));
            }
            ParamKind::StringArray => {
                schema.insert("items".to_string(), json!({"type": "string"}));
            }
            ParamKind::DocumentArray => {
                schema.insert(
                    "items".to_string(),
                    json!({
                        "type": "object",
                        "properties": {
                            "content": {"type": "string"},
                            "title": {"type": "string"},
                            "metadata": {"type": "object"}
                        },
                        "required": ["content"]
                    }),
                );
            }
            _ => {}
        }
        if let Some(default) = &self.default {
            schema.insert("default".to_string(), default.clone());
        }
        Value::Object(schema)
    }
}

/// Tool definition for MCP protocol
///
/// Serializes to the `tools/list` wire shape: `{name, description, inputSchema}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip)]
    pub group: ToolGroup,
    #[serde(skip)]
    pub params: Vec<ParamSpec>,
}

impl ToolDefinition {
    pub fn new(
        name: &str,
        group: ToolGroup,
        description: &str,
        params: Vec<ParamSpec>,
    ) -> Self {
        let properties: Map<String, Value> = params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();

        let mut input_schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            input_schema["required"] = json!(required);
        }

        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
            group,
            params,
        }
    }

    /// Look up a declared argument by name
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// The ordered, read-only set of tools this server exposes
#[derive(Debug, Clone)]
pub struct ToolCatalogue {
    tools: Vec<ToolDefinition>,
}

impl ToolCatalogue {
    /// Wrap an explicit list of definitions
    pub fn from_definitions(tools: Vec<ToolDefinition>) -> Self {
        Self { tools }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolCatalogue {
    fn default() -> Self {
        Self::from_definitions(get_tool_definitions())
    }
}

/// Result from a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content types for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }
}

fn query_mode() -> ParamSpec {
    ParamSpec::optional(
        "mode",
        ParamKind::Enum(QueryMode::NAMES),
        "Query mode: naive, local, global, hybrid, or mix",
    )
    .with_default(QueryMode::default().as_str())
}

fn only_need_context() -> ParamSpec {
    ParamSpec::optional(
        "only_need_context",
        ParamKind::Boolean,
        "Return only the retrieved context without generating an answer",
    )
    .with_default(false)
}

/// Get all available tool definitions
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    use ToolGroup::*;

    vec![
        // Documents
        ToolDefinition::new(
            "insert_text",
            Documents,
            "Insert a single text document into LightRAG",
            vec![
                ParamSpec::required("text", ParamKind::String, "Text content to insert"),
                ParamSpec::optional("description", ParamKind::String, "Optional description of the text"),
            ],
        ),
        ToolDefinition::new(
            "insert_texts",
            Documents,
            "Insert multiple text documents into LightRAG in batch",
            vec![ParamSpec::required(
                "texts",
                ParamKind::DocumentArray,
                "Array of text documents with optional title and metadata",
            )],
        ),
        ToolDefinition::new(
            "upload_document",
            Documents,
            "Upload a document file to LightRAG",
            vec![
                ParamSpec::required("file_path", ParamKind::String, "Path to the file to upload"),
                ParamSpec::optional("chunk_size", ParamKind::Integer, "Custom chunk size for document splitting"),
                ParamSpec::optional("chunk_overlap", ParamKind::Integer, "Overlap size between chunks"),
            ],
        ),
        ToolDefinition::new(
            "upload_documents",
            Documents,
            "Upload multiple documents in batch",
            vec![ParamSpec::required(
                "file_paths",
                ParamKind::StringArray,
                "Array of file paths to upload",
            )],
        ),
        ToolDefinition::new(
            "scan_documents",
            Documents,
            "Scan for new documents in the configured input directory",
            vec![],
        ),
        ToolDefinition::new(
            "get_documents",
            Documents,
            "Retrieve all documents from LightRAG",
            vec![],
        ),
        ToolDefinition::new(
            "get_documents_paginated",
            Documents,
            "Retrieve documents with pagination support",
            vec![
                ParamSpec::required("page", ParamKind::Integer, "Page number (1-based)"),
                ParamSpec::required("page_size", ParamKind::Integer, "Number of documents per page (1-100)"),
            ],
        ),
        ToolDefinition::new(
            "delete_document",
            Documents,
            "Delete a specific document by ID",
            vec![ParamSpec::required(
                "document_id",
                ParamKind::Identifier,
                "ID of the document to delete",
            )],
        ),
        ToolDefinition::new(
            "clear_documents",
            Documents,
            "Clear all documents from LightRAG",
            vec![],
        ),
        ToolDefinition::new(
            "document_status",
            Documents,
            "Get processing status for documents",
            vec![ParamSpec::optional(
                "document_id",
                ParamKind::String,
                "Optional specific document ID to check",
            )],
        ),
        // Query
        ToolDefinition::new(
            "query_text",
            Query,
            "Query LightRAG with text using various retrieval modes",
            vec![
                ParamSpec::required("query", ParamKind::String, "Query text"),
                query_mode(),
                only_need_context(),
                ParamSpec::optional("top_k", ParamKind::Integer, "Number of top results to retrieve")
                    .with_default(QueryParams::DEFAULT_TOP_K),
                ParamSpec::optional("max_tokens", ParamKind::Integer, "Maximum tokens in response"),
            ],
        ),
        ToolDefinition::new(
            "query_text_stream",
            Query,
            "Stream query results from LightRAG and return the full text once complete",
            vec![
                ParamSpec::required("query", ParamKind::String, "Query text"),
                query_mode(),
                only_need_context(),
            ],
        ),
        ToolDefinition::new(
            "query_with_citation",
            Query,
            "Query LightRAG and get results with source citations",
            vec![ParamSpec::required("query", ParamKind::String, "Query text"), query_mode()],
        ),
        // Graph
        ToolDefinition::new(
            "get_knowledge_graph",
            Graph,
            "Retrieve the complete knowledge graph from LightRAG",
            vec![],
        ),
        ToolDefinition::new(
            "get_graph_structure",
            Graph,
            "Get the structure and statistics of the knowledge graph",
            vec![],
        ),
        ToolDefinition::new(
            "get_entities",
            Graph,
            "Retrieve all entities from the knowledge graph",
            vec![ParamSpec::optional(
                "limit",
                ParamKind::Integer,
                "Maximum number of entities to retrieve",
            )],
        ),
        ToolDefinition::new(
            "get_relations",
            Graph,
            "Retrieve all relationships from the knowledge graph",
            vec![ParamSpec::optional(
                "limit",
                ParamKind::Integer,
                "Maximum number of relations to retrieve",
            )],
        ),
        ToolDefinition::new(
            "check_entity_exists",
            Graph,
            "Check if an entity exists in the knowledge graph",
            vec![ParamSpec::required(
                "entity_name",
                ParamKind::String,
                "Name of the entity to check",
            )],
        ),
        ToolDefinition::new(
            "update_entity",
            Graph,
            "Update properties of an entity in the knowledge graph",
            vec![
                ParamSpec::required("entity_id", ParamKind::Identifier, "ID of the entity to update"),
                ParamSpec::required("properties", ParamKind::Object, "Properties to update"),
            ],
        ),
        ToolDefinition::new(
            "delete_entity",
            Graph,
            "Delete an entity from the knowledge graph",
            vec![ParamSpec::required(
                "entity_id",
                ParamKind::Identifier,
                "ID of the entity to delete",
            )],
        ),
        ToolDefinition::new(
            "delete_relation",
            Graph,
            "Delete a relationship from the knowledge graph",
            vec![ParamSpec::required(
                "relation_id",
                ParamKind::Identifier,
                "ID of the relation to delete",
            )],
        ),
        // System
        ToolDefinition::new(
            "get_health",
            System,
            "Check LightRAG server health and status",
            vec![],
        ),
        ToolDefinition::new(
            "get_status",
            System,
            "Get detailed system status and statistics",
            vec![],
        ),
        ToolDefinition::new(
            "clear_cache",
            System,
            "Clear LightRAG's internal cache",
            vec![
                ParamSpec::optional(
                    "cache_type",
                    ParamKind::Enum(CacheType::NAMES),
                    "Type of cache to clear (default: all)",
                )
                .with_default(CacheType::default().as_str()),
            ],
        ),
        ToolDefinition::new(
            "get_config",
            System,
            "Get current LightRAG server configuration",
            vec![],
        ),
        ToolDefinition::new(
            "get_workspace_info",
            System,
            "Get information about the current workspace",
            vec![],
        ),
    ]
}
