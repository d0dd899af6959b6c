//! HTTP surface over a running router

mod common;

use std::sync::Arc;

use common::*;
use docqa::server::{state::AppState, RagServer};
use serde_json::{json, Value};
use tempfile::TempDir;

async fn spawn_server(dir: &TempDir) -> String {
    let config = test_config(dir.path());
    let service = service_with(
        config.clone(),
        Arc::new(FakeEmbedder::default()),
        Arc::new(ScriptedIndex::ranked("finance.pdf", 3)),
        Arc::new(FakeLlm::default()),
    );
    service.start().await.unwrap();

    let server = RagServer::with_state(config, AppState::from_service(Arc::new(service)));
    let router = server.build_router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_query_feedback_round_trip() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let ready = client.get(format!("{}/ready", base)).send().await.unwrap();
    assert!(ready.status().is_success());

    let first: Value = client
        .post(format!("{}/api/query", base))
        .json(&json!({ "question": "budget 2023" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["status"], "answered");
    assert_eq!(first["sources"].as_array().unwrap().len(), 3);
    assert_eq!(first["cited"][0], "finance.pdf::0");

    let feedback = client
        .post(format!("{}/api/feedback", base))
        .json(&json!({
            "query": "budget 2023",
            "ratings": [{ "id": "finance.pdf::1", "verdict": "no" }],
            "shown": ["finance.pdf::0", "finance.pdf::1", "finance.pdf::2"]
        }))
        .send()
        .await
        .unwrap();
    assert!(feedback.status().is_success());

    let second: Value = client
        .post(format!("{}/api/query", base))
        .json(&json!({ "question": "budget 2023" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = second["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["finance.pdf::0", "finance.pdf::2"]);
    assert_eq!(second["suppressed"], 1);

    let stats: Value = client
        .get(format!("{}/api/feedback/stats", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["rejected"], 1);

    let events: Value = client
        .get(format!("{}/api/feedback/events", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["document_id"], "finance.pdf::1");
    assert_eq!(events[0]["verdict"], "no");
    assert_eq!(events[0]["query"], "budget 2023");
}

#[tokio::test]
async fn test_rating_unknown_document_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/feedback", base))
        .json(&json!({
            "query": "budget 2023",
            "ratings": [{ "id": "other.pdf::9", "verdict": "yes" }],
            "shown": ["finance.pdf::0"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "unknown_document");
}
