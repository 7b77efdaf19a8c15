//! Request payload types for the LightRAG API

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Retrieval strategy used by `/query`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Naive,
    Local,
    Global,
    #[default]
    Hybrid,
    Mix,
}

impl QueryMode {
    /// Wire names of every mode, in declaration order
    pub const NAMES: &'static [&'static str] = &["naive", "local", "global", "hybrid", "mix"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Local => "local",
            Self::Global => "global",
            Self::Hybrid => "hybrid",
            Self::Mix => "mix",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(Self::Naive),
            "local" => Ok(Self::Local),
            "global" => Ok(Self::Global),
            "hybrid" => Ok(Self::Hybrid),
            "mix" => Ok(Self::Mix),
            other => Err(format!("unknown query mode: {}", other)),
        }
    }
}

/// Cache partition targeted by `/cache/clear`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    #[default]
    All,
    Llm,
    Embedding,
    Query,
}

impl CacheType {
    /// Wire names of every cache type, in declaration order
    pub const NAMES: &'static [&'static str] = &["all", "llm", "embedding", "query"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Llm => "llm",
            Self::Embedding => "embedding",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a batch text insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDocument {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl TextDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
            metadata: None,
        }
    }
}

/// Parameters of a non-streaming `/query` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParams {
    pub query: String,
    pub mode: QueryMode,
    pub only_need_context: bool,
    pub top_k: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl QueryParams {
    /// Default `top_k` used by the LightRAG tools
    pub const DEFAULT_TOP_K: u64 = 60;

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: QueryMode::default(),
            only_need_context: false,
            top_k: Self::DEFAULT_TOP_K,
            max_tokens: None,
        }
    }
}

// Wire bodies. Optional fields are omitted rather than sent as null.

#[derive(Debug, Serialize)]
pub(crate) struct InsertTextBody<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InsertTextsBody<'a> {
    pub texts: &'a [TextDocument],
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadDocumentBody<'a> {
    pub file_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadDocumentsBody<'a> {
    pub file_paths: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct StreamQueryBody<'a> {
    pub query: &'a str,
    pub mode: QueryMode,
    pub only_need_context: bool,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CitationQueryBody<'a> {
    pub query: &'a str,
    pub mode: QueryMode,
    pub with_citation: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateEntityBody<'a> {
    pub properties: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClearCacheBody {
    pub cache_type: CacheType,
}
