//! LightRAG HTTP client
//!
//! [`LightRagClient`] owns the one HTTP session used by the adapter. Every
//! public method performs exactly one request and returns either the decoded
//! JSON body or, for streamed queries, the concatenated response text.

use futures::StreamExt;
use reqwest::{Method, Url, header};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::types::{
    CacheType, CitationQueryBody, ClearCacheBody, InsertTextBody, InsertTextsBody, QueryMode,
    QueryParams, StreamQueryBody, TextDocument, UpdateEntityBody, UploadDocumentBody,
    UploadDocumentsBody,
};
use crate::{Error, Result};

/// Header carrying the workspace tag
pub const WORKSPACE_HEADER: &str = "lightrag-workspace";

type Query<'a> = &'a [(&'a str, String)];

/// Client for the LightRAG REST API
///
/// Cloning is cheap and shares the underlying connection pool, so one client
/// can serve any number of concurrent calls.
///
/// # Example
///
/// ```ignore
/// use lightrag_client::{ClientConfig, LightRagClient};
///
/// let client = LightRagClient::new(ClientConfig::default().with_workspace("docs"))?;
/// let health = client.get_health().await?;
/// client.close();
/// ```
#[derive(Debug, Clone)]
pub struct LightRagClient {
    http: reqwest::Client,
    base_url: Url,
    workspace: Option<String>,
}

impl LightRagClient {
    /// Build the HTTP session from a configuration
    ///
    /// Fails if the base URL cannot be parsed or a credential cannot be sent
    /// as a header value.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let raw_url = config.normalized_base_url();
        let base_url = Url::parse(raw_url).map_err(|e| Error::InvalidUrl {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: raw_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .default_headers(default_headers(&config)?)
            .timeout(config.timeout)
            .build()?;

        info!(
            base_url = %base_url,
            workspace = ?config.workspace,
            authenticated = config.api_key.is_some(),
            "LightRAG client ready"
        );

        Ok(Self {
            http,
            base_url,
            workspace: config.workspace,
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Workspace sent with every request, if any
    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    /// Release the connection pool
    ///
    /// Dropping the last clone has the same effect; this makes the release
    /// explicit at shutdown.
    pub fn close(self) {
        debug!(base_url = %self.base_url, "Closing LightRAG client");
        drop(self.http);
    }

    // ========================================================================
    // Document Management
    // ========================================================================

    /// Insert a single text document
    pub async fn insert_text(&self, text: &str, description: Option<&str>) -> Result<Value> {
        let body = InsertTextBody {
            text,
            description: description.filter(|d| !d.is_empty()),
        };
        self.post(&["documents", "text"], &body).await
    }

    /// Insert several text documents in one batch
    pub async fn insert_texts(&self, texts: &[TextDocument]) -> Result<Value> {
        self.post(&["documents", "texts"], &InsertTextsBody { texts })
            .await
    }

    /// Ask the server to ingest a file by path
    pub async fn upload_document(
        &self,
        file_path: &str,
        chunk_size: Option<u64>,
        chunk_overlap: Option<u64>,
    ) -> Result<Value> {
        let body = UploadDocumentBody {
            file_path,
            chunk_size: positive(chunk_size),
            chunk_overlap: positive(chunk_overlap),
        };
        self.post(&["documents", "upload"], &body).await
    }

    /// Ask the server to ingest several files by path
    pub async fn upload_documents(&self, file_paths: &[String]) -> Result<Value> {
        self.post(
            &["documents", "upload", "batch"],
            &UploadDocumentsBody { file_paths },
        )
        .await
    }

    /// Scan the server's input directory for new documents
    pub async fn scan_documents(&self) -> Result<Value> {
        self.request_json::<()>(Method::POST, &["documents", "scan"], None, &[])
            .await
    }

    /// List all documents
    pub async fn get_documents(&self) -> Result<Value> {
        self.get(&["documents"], &[]).await
    }

    /// List documents one page at a time
    pub async fn get_documents_paginated(&self, page: u64, page_size: u64) -> Result<Value> {
        let query = [("page", page.to_string()), ("page_size", page_size.to_string())];
        self.get(&["documents", "paginated"], &query).await
    }

    /// Delete one document
    pub async fn delete_document(&self, document_id: &str) -> Result<Value> {
        self.delete(&["documents", document_id]).await
    }

    /// Delete every document
    pub async fn clear_documents(&self) -> Result<Value> {
        self.delete(&["documents"]).await
    }

    /// Processing status of one document, or of all documents
    pub async fn document_status(&self, document_id: Option<&str>) -> Result<Value> {
        match document_id.filter(|id| !id.is_empty()) {
            Some(id) => self.get(&["documents", id, "status"], &[]).await,
            None => self.get(&["documents", "status"], &[]).await,
        }
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Run a retrieval query and wait for the full answer
    pub async fn query(&self, params: &QueryParams) -> Result<Value> {
        let params = QueryParams {
            max_tokens: positive(params.max_tokens),
            ..params.clone()
        };
        self.post(&["query"], &params).await
    }

    /// Run a streamed query and return the concatenated text once complete
    pub async fn query_stream(
        &self,
        query: &str,
        mode: QueryMode,
        only_need_context: bool,
    ) -> Result<String> {
        let body = StreamQueryBody {
            query,
            mode,
            only_need_context,
            stream: true,
        };
        self.request_text_stream(Method::POST, &["query"], Some(&body), &[])
            .await
    }

    /// Run a query that returns source citations
    pub async fn query_with_citation(&self, query: &str, mode: QueryMode) -> Result<Value> {
        let body = CitationQueryBody {
            query,
            mode,
            with_citation: true,
        };
        self.post(&["query"], &body).await
    }

    // ========================================================================
    // Knowledge Graph
    // ========================================================================

    /// Fetch the complete knowledge graph
    pub async fn get_knowledge_graph(&self) -> Result<Value> {
        self.get(&["graph"], &[]).await
    }

    /// Fetch graph structure and statistics
    pub async fn get_graph_structure(&self) -> Result<Value> {
        self.get(&["graph", "structure"], &[]).await
    }

    /// List entities, optionally capped
    pub async fn get_entities(&self, limit: Option<u64>) -> Result<Value> {
        let query = limit_query(limit);
        self.get(&["graph", "entities"], &query).await
    }

    /// List relations, optionally capped
    pub async fn get_relations(&self, limit: Option<u64>) -> Result<Value> {
        let query = limit_query(limit);
        self.get(&["graph", "relations"], &query).await
    }

    /// Check whether an entity with the given name exists
    pub async fn check_entity_exists(&self, entity_name: &str) -> Result<Value> {
        let query = [("name", entity_name.to_string())];
        self.get(&["graph", "entity", "exists"], &query).await
    }

    /// Replace properties of an entity
    pub async fn update_entity(
        &self,
        entity_id: &str,
        properties: &Map<String, Value>,
    ) -> Result<Value> {
        self.request_json(
            Method::PUT,
            &["graph", "entity", entity_id],
            Some(&UpdateEntityBody { properties }),
            &[],
        )
        .await
    }

    /// Delete an entity
    pub async fn delete_entity(&self, entity_id: &str) -> Result<Value> {
        self.delete(&["graph", "entity", entity_id]).await
    }

    /// Delete a relation
    pub async fn delete_relation(&self, relation_id: &str) -> Result<Value> {
        self.delete(&["graph", "relation", relation_id]).await
    }

    // ========================================================================
    // System
    // ========================================================================

    pub async fn get_health(&self) -> Result<Value> {
        self.get(&["health"], &[]).await
    }

    pub async fn get_status(&self) -> Result<Value> {
        self.get(&["status"], &[]).await
    }

    pub async fn clear_cache(&self, cache_type: CacheType) -> Result<Value> {
        self.post(&["cache", "clear"], &ClearCacheBody { cache_type })
            .await
    }

    pub async fn get_config(&self) -> Result<Value> {
        self.get(&["config"], &[]).await
    }

    pub async fn get_workspace_info(&self) -> Result<Value> {
        self.get(&["workspace", "info"], &[]).await
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    async fn get(&self, segments: &[&str], query: Query<'_>) -> Result<Value> {
        self.request_json::<()>(Method::GET, segments, None, query)
            .await
    }

    async fn post<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<Value> {
        self.request_json(Method::POST, segments, Some(body), &[])
            .await
    }

    async fn delete(&self, segments: &[&str]) -> Result<Value> {
        self.request_json::<()>(Method::DELETE, segments, None, &[])
            .await
    }

    /// Send a request and decode the whole body as JSON
    async fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        query: Query<'_>,
    ) -> Result<Value> {
        let response = self.send(method, segments, body, query).await?;
        let url = response.url().to_string();
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Decode { url, source })
    }

    /// Send a request and buffer the streamed body into one string
    async fn request_text_stream<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        query: Query<'_>,
    ) -> Result<String> {
        let response = self.send(method, segments, body, query).await?;

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            chunks += 1;
        }
        debug!(chunks, bytes = buffer.len(), "Stream complete");

        // Decode once so multi-byte characters split across chunks survive.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        query: Query<'_>,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "Sending LightRAG request");

        let mut request = self.http.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                method,
                url,
                status,
                body,
            });
        }
        Ok(response)
    }

    /// Resolve path segments against the base URL, percent-encoding each one
    ///
    /// An empty segment is rejected: `["documents", ""]` would otherwise
    /// address the collection instead of one item.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::EmptySegment {
                path: format!("/{}", segments.join("/")),
            });
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn default_headers(config: &ClientConfig) -> Result<header::HeaderMap> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    if let Some(api_key) = &config.api_key {
        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(
            |e| Error::InvalidHeader {
                name: "Authorization",
                reason: e.to_string(),
            },
        )?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }

    if let Some(workspace) = &config.workspace {
        let value =
            header::HeaderValue::from_str(workspace).map_err(|e| Error::InvalidHeader {
                name: "LIGHTRAG-WORKSPACE",
                reason: e.to_string(),
            })?;
        headers.insert(header::HeaderName::from_static(WORKSPACE_HEADER), value);
    }

    Ok(headers)
}

fn positive(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v > 0)
}

fn limit_query(limit: Option<u64>) -> Vec<(&'static str, String)> {
    positive(limit)
        .map(|l| vec![("limit", l.to_string())])
        .unwrap_or_default()
}
