use async_trait::async_trait;
use campus_query::fuzzy_matcher::FuzzyMatcher;
use campus_query::http::handle_request;
use campus_query::knowledge::KnowledgePipeline;
use campus_query::llm::ScriptedCompletion;
use campus_query::placement_engine::PlacementEngine;
use campus_query::store::{PlacementStore, StudentPlacementRecord};
use campus_query::{AskResponse, CollegeAssistant, Result};
use std::sync::Arc;
use tempfile::TempDir;

struct CannedKnowledge;

#[async_trait]
impl KnowledgePipeline for CannedKnowledge {
    async fn answer(&self, _question: &str) -> Result<String> {
        Ok("Classes start at 9 AM.".to_string())
    }
}

fn assistant(dir: &TempDir, llm: ScriptedCompletion) -> CollegeAssistant {
    let store = PlacementStore::new(dir.path().join("students.db"));
    store
        .create(&[
            StudentPlacementRecord::placed("CSE", "Amazon", "SDE", 44.0),
            StudentPlacementRecord::placed("IT", "Amazon", "SDE", 44.0),
        ])
        .unwrap();
    let engine = PlacementEngine::from_store(Arc::new(llm), FuzzyMatcher::default(), store).unwrap();
    CollegeAssistant::new(engine, Arc::new(CannedKnowledge))
}

fn post_ask(body: &str) -> String {
    format!(
        "POST /ask HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

fn response_body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

#[tokio::test]
async fn test_ask_placement_question() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedCompletion::new()
        .reply(r#"{"company": "amazon", "department": null}"#)
        .reply("SELECT COUNT(*) FROM students WHERE LOWER(Company) LIKE '%amazon%' AND Placed = 'Yes';");
    let assistant = assistant(&dir, llm);

    let response = handle_request(&post_ask(r#"{"question": "How many got placed in Amazon?"}"#), &assistant).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    let parsed: AskResponse = serde_json::from_str(response_body(&response)).unwrap();
    assert_eq!(parsed.answer, "2 students were placed in Amazon.");
}

#[tokio::test]
async fn test_ask_general_question() {
    let dir = TempDir::new().unwrap();
    let assistant = assistant(&dir, ScriptedCompletion::new());

    let response = handle_request(&post_ask(r#"{"question": "When do classes start?"}"#), &assistant).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    let parsed: AskResponse = serde_json::from_str(response_body(&response)).unwrap();
    assert_eq!(parsed.answer, "Classes start at 9 AM.");
}

#[tokio::test]
async fn test_bad_body_and_unknown_route() {
    let dir = TempDir::new().unwrap();
    let assistant = assistant(&dir, ScriptedCompletion::new());

    let bad = handle_request(&post_ask(r#"{"q": 1}"#), &assistant).await;
    assert!(bad.starts_with("HTTP/1.1 400 Bad Request"));
    let error: serde_json::Value = serde_json::from_str(response_body(&bad)).unwrap();
    assert!(error["error"].as_str().unwrap().starts_with("Invalid request body"));

    let missing = handle_request("GET /nowhere HTTP/1.1\r\n\r\n", &assistant).await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"));

    let health = handle_request("GET /health HTTP/1.1\r\n\r\n", &assistant).await;
    assert!(health.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(response_body(&health), r#"{"status":"ok"}"#);

    let preflight = handle_request("OPTIONS /ask HTTP/1.1\r\n\r\n", &assistant).await;
    assert!(preflight.starts_with("HTTP/1.1 204 No Content"));
}
