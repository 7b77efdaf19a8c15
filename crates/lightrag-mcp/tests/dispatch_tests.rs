//! Dispatcher integration tests against a stub LightRAG backend.

use std::time::Duration;

use lightrag_client::{ClientConfig, LightRagClient};
use lightrag_mcp::{Dispatcher, ToolCatalogue, ToolOutcome};
use lightrag_test_utils::{StatusCode, StubBackend, StubResponse, unreachable_url};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn dispatcher_for(config: ClientConfig) -> Dispatcher {
    let client = LightRagClient::new(config).unwrap();
    Dispatcher::new(client, ToolCatalogue::default()).unwrap()
}

fn dispatcher(backend: &StubBackend) -> Dispatcher {
    dispatcher_for(ClientConfig::new(backend.url()))
}

fn ok_text(outcome: ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Ok(text) => text,
        ToolOutcome::Failure(text) => panic!("expected success, got failure: {}", text),
    }
}

#[tokio::test]
async fn test_query_text_sends_defaults() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    let text = ok_text(dispatcher.invoke("query_text", json!({"query": "what is rust?"})).await);

    assert!(text.contains("Answer for: what is rust?"));
    let request = backend.last_request().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/query");
    assert_eq!(
        request.body.unwrap(),
        json!({
            "query": "what is rust?",
            "mode": "hybrid",
            "only_need_context": false,
            "top_k": 60
        })
    );
}

#[tokio::test]
async fn test_query_text_forwards_caller_values() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    ok_text(
        dispatcher
            .invoke(
                "query_text",
                json!({"query": "q", "mode": "mix", "top_k": 5, "max_tokens": 512, "only_need_context": true}),
            )
            .await,
    );

    let body = backend.last_request().unwrap().body.unwrap();
    assert_eq!(body["mode"], "mix");
    assert_eq!(body["top_k"], 5);
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["only_need_context"], true);
}

#[tokio::test]
async fn test_query_with_citation_flags_body() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    ok_text(
        dispatcher
            .invoke("query_with_citation", json!({"query": "q", "mode": "local"}))
            .await,
    );

    let body = backend.last_request().unwrap().body.unwrap();
    assert_eq!(body, json!({"query": "q", "mode": "local", "with_citation": true}));
}

#[tokio::test]
async fn test_headers_carry_workspace_and_key() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher_for(
        ClientConfig::new(backend.url())
            .with_workspace("ws1")
            .with_api_key("tok"),
    );

    ok_text(dispatcher.invoke("get_health", json!({})).await);

    let request = backend.last_request().unwrap();
    assert_eq!(request.header("lightrag-workspace"), Some("ws1"));
    assert_eq!(request.header("authorization"), Some("Bearer tok"));
}

#[rstest]
#[case("scan_documents", json!({}), "POST", "/documents/scan")]
#[case("get_documents_paginated", json!({"page": 2, "page_size": 10}), "GET", "/documents/paginated")]
#[case("clear_documents", json!({}), "DELETE", "/documents")]
#[case("document_status", json!({}), "GET", "/documents/status")]
#[case("document_status", json!({"document_id": "d1"}), "GET", "/documents/d1/status")]
#[case("upload_document", json!({"file_path": "/data/a.pdf"}), "POST", "/documents/upload")]
#[case("upload_documents", json!({"file_paths": ["/a", "/b"]}), "POST", "/documents/upload/batch")]
#[case("get_knowledge_graph", json!({}), "GET", "/graph")]
#[case("get_graph_structure", json!({}), "GET", "/graph/structure")]
#[case("get_entities", json!({"limit": 5}), "GET", "/graph/entities")]
#[case("get_relations", json!({}), "GET", "/graph/relations")]
#[case("check_entity_exists", json!({"entity_name": "Rust"}), "GET", "/graph/entity/exists")]
#[case("update_entity", json!({"entity_id": "e1", "properties": {"kind": "lang"}}), "PUT", "/graph/entity/e1")]
#[case("delete_entity", json!({"entity_id": "e1"}), "DELETE", "/graph/entity/e1")]
#[case("delete_relation", json!({"relation_id": "r1"}), "DELETE", "/graph/relation/r1")]
#[case("get_status", json!({}), "GET", "/status")]
#[case("clear_cache", json!({}), "POST", "/cache/clear")]
#[case("get_config", json!({}), "GET", "/config")]
#[case("get_workspace_info", json!({}), "GET", "/workspace/info")]
#[tokio::test]
async fn test_tool_routes_to_endpoint(
    #[case] tool: &str,
    #[case] arguments: Value,
    #[case] method: &str,
    #[case] path: &str,
) {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    let outcome = dispatcher.invoke(tool, arguments).await;
    assert!(!outcome.is_failure(), "{} failed: {}", tool, outcome.text());

    let request = backend.last_request().unwrap();
    assert_eq!((request.method.as_str(), request.path.as_str()), (method, path));
}

#[tokio::test]
async fn test_clear_cache_defaults_to_all() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    ok_text(dispatcher.invoke("clear_cache", Value::Null).await);

    assert_eq!(
        backend.last_request().unwrap().body.unwrap(),
        json!({"cache_type": "all"})
    );
}

#[tokio::test]
async fn test_zero_limit_is_omitted() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    ok_text(dispatcher.invoke("get_entities", json!({"limit": 0})).await);
    assert_eq!(backend.last_request().unwrap().query, None);

    ok_text(dispatcher.invoke("get_entities", json!({"limit": 3})).await);
    assert_eq!(backend.last_request().unwrap().query.as_deref(), Some("limit=3"));
}

#[tokio::test]
async fn test_insert_texts_forwards_documents() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    let texts = json!([
        {"content": "one", "title": "First"},
        {"content": "two", "metadata": {"source": "test"}}
    ]);
    ok_text(dispatcher.invoke("insert_texts", json!({"texts": texts.clone()})).await);

    assert_eq!(backend.last_request().unwrap().body.unwrap(), json!({"texts": texts}));
    assert_eq!(backend.documents().len(), 2);
}

#[tokio::test]
async fn test_empty_description_is_omitted() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    ok_text(
        dispatcher
            .invoke("insert_text", json!({"text": "body", "description": ""}))
            .await,
    );

    assert_eq!(backend.last_request().unwrap().body.unwrap(), json!({"text": "body"}));
}

#[tokio::test]
async fn test_status_error_becomes_failure() {
    let backend = StubBackend::start().await;
    backend.respond(
        "DELETE",
        "/documents/doc-9",
        StubResponse::Json(StatusCode::INTERNAL_SERVER_ERROR, json!({"detail": "disk full"})),
    );
    let dispatcher = dispatcher(&backend);

    let outcome = dispatcher
        .invoke("delete_document", json!({"document_id": "doc-9"}))
        .await;

    assert!(outcome.is_failure());
    assert!(outcome.text().starts_with("Error executing delete_document: "));
    assert!(outcome.text().contains("LightRAG API request failed"));
    assert!(outcome.text().contains("500"));
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_backend() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    let outcome = dispatcher
        .invoke("get_documents_paginated", json!({"page": "one", "page_size": 10}))
        .await;

    assert!(outcome.is_failure());
    assert!(outcome.text().contains("'page' must be integer"));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_empty_document_id_never_reaches_backend() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);
    ok_text(dispatcher.invoke("insert_text", json!({"text": "keep me"})).await);

    let outcome = dispatcher
        .invoke("delete_document", json!({"document_id": ""}))
        .await;

    assert!(outcome.is_failure());
    assert_eq!(
        outcome.text(),
        "Error executing delete_document: invalid arguments: 'document_id' must be a non-empty string, got string"
    );
    assert!(backend.requests().iter().all(|r| r.method != "DELETE"));
    assert_eq!(backend.documents().len(), 1);
}

#[rstest]
#[case("delete_entity", json!({"entity_id": ""}))]
#[case("delete_relation", json!({"relation_id": ""}))]
#[case("update_entity", json!({"entity_id": "", "properties": {"kind": "lang"}}))]
#[tokio::test]
async fn test_empty_graph_id_never_reaches_backend(#[case] tool: &str, #[case] arguments: Value) {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    let outcome = dispatcher.invoke(tool, arguments).await;

    assert!(outcome.is_failure());
    assert!(outcome.text().contains("must be a non-empty string"));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_returns_notice() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);

    let outcome = dispatcher.invoke("nonexistent_tool", json!({})).await;

    assert_eq!(outcome, ToolOutcome::Ok("Unknown tool: nonexistent_tool".to_string()));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_failure() {
    let dispatcher = dispatcher_for(ClientConfig::new(unreachable_url().await));

    let outcome = dispatcher.invoke("get_health", json!({})).await;

    assert!(outcome.is_failure());
    assert!(outcome.text().starts_with("Error executing get_health: LightRAG API request failed"));
}

#[tokio::test]
async fn test_slow_backend_times_out_as_failure() {
    let backend = StubBackend::start().await;
    backend.respond(
        "GET",
        "/health",
        StubResponse::Delay(
            Duration::from_secs(5),
            Box::new(StubResponse::Json(StatusCode::OK, json!({"status": "healthy"}))),
        ),
    );
    let dispatcher =
        dispatcher_for(ClientConfig::new(backend.url()).with_timeout(Duration::from_millis(200)));

    let outcome = dispatcher.invoke("get_health", json!({})).await;

    assert!(outcome.is_failure());
    assert!(outcome.text().starts_with("Error executing get_health: LightRAG API request failed"));
}

#[tokio::test]
async fn test_malformed_json_is_failure() {
    let backend = StubBackend::start().await;
    backend.respond(
        "GET",
        "/health",
        StubResponse::Text(StatusCode::OK, "not json".to_string()),
    );
    let dispatcher = dispatcher(&backend);

    let outcome = dispatcher.invoke("get_health", json!({})).await;
    assert!(outcome.is_failure());
}

#[tokio::test]
async fn test_stream_output_is_verbatim() {
    let backend = StubBackend::start().await;
    backend.respond(
        "POST",
        "/query",
        StubResponse::Chunks(vec!["{\"partial\": ".to_string(), "true}\n".to_string()]),
    );
    let dispatcher = dispatcher(&backend);

    let text = ok_text(dispatcher.invoke("query_text_stream", json!({"query": "q"})).await);
    assert_eq!(text, "{\"partial\": true}\n");
}

#[tokio::test]
async fn test_close_releases_client() {
    let backend = StubBackend::start().await;
    let dispatcher = dispatcher(&backend);
    assert_eq!(dispatcher.client().base_url().as_str(), format!("{}/", backend.url()));
    dispatcher.close();
}
