mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

use common::{StubModel, create_test_server};

const THREE_QUESTIONS: &str = "Here are your flashcards:\n```json\n[\n\"What is a variable in Python?\",\n\"What does `len()` return?\",\n\"How do you define a function?\"\n]\n```";

#[tokio::test]
async fn test_generate_flashcards_end_to_end() {
    let stub = Arc::new(StubModel::replying(THREE_QUESTIONS));
    let server = create_test_server(stub.clone());

    let response = server
        .post("/api/flashcards")
        .json(&json!({ "topic": "Python", "level": "beginner", "count": 3 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "questions": [
                "What is a variable in Python?",
                "What does `len()` return?",
                "How do you define a function?"
            ]
        })
    );
    assert_eq!(stub.count_calls(), 1);
    assert_eq!(stub.generate_calls(), 1);
}

#[tokio::test]
async fn test_generate_flashcards_missing_level() {
    let stub = Arc::new(StubModel::replying(THREE_QUESTIONS));
    let server = create_test_server(stub.clone());

    let response = server
        .post("/api/flashcards")
        .json(&json!({ "topic": "Python" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("topic and level"));
    assert_eq!(stub.generate_calls(), 0);
}

#[tokio::test]
async fn test_generate_flashcards_invalid_body() {
    let server = create_test_server(Arc::new(StubModel::replying(THREE_QUESTIONS)));

    let response = server.post("/api/flashcards").text("not json").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing required fields: topic and level");
}

#[tokio::test]
async fn test_generate_flashcards_string_count() {
    let stub = Arc::new(StubModel::replying(THREE_QUESTIONS));
    let server = create_test_server(stub.clone());

    for count in [json!("3"), json!(3.5), json!(0)] {
        let response = server
            .post("/api/flashcards")
            .json(&json!({ "topic": "Rust", "level": "beginner", "count": count }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "count must be a positive integer");
    }
    assert_eq!(stub.generate_calls(), 0);
}

#[tokio::test]
async fn test_generate_flashcards_mistyped_field() {
    let stub = Arc::new(StubModel::replying(THREE_QUESTIONS));
    let server = create_test_server(stub.clone());

    let response = server
        .post("/api/flashcards")
        .json(&json!({ "topic": 42, "level": "beginner" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Invalid request body:"));
    assert!(error.contains("topic"));
    assert_eq!(stub.generate_calls(), 0);
}

#[tokio::test]
async fn test_generate_flashcards_token_limit() {
    let stub = Arc::new(StubModel::replying(THREE_QUESTIONS).with_token_count(501));
    let server = create_test_server(stub.clone());

    let response = server
        .post("/api/flashcards")
        .json(&json!({ "topic": "Python", "level": "beginner" }))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["error_type"], "token_limit_exceeded");
    assert!(body["error"].as_str().unwrap().contains("501"));
    assert_eq!(stub.generate_calls(), 0);
}

#[tokio::test]
async fn test_generate_flashcards_rate_limited_message() {
    let server = create_test_server(Arc::new(StubModel::failing("429: Rate Limit Exceeded")));

    let response = server
        .post("/api/flashcards")
        .json(&json!({ "topic": "Python", "level": "beginner" }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"], "API rate limit exceeded. Please try again later.");
    assert!(body.get("error_type").is_none());
}

#[tokio::test]
async fn test_evaluate_answer_rate_limited_typed() {
    let mut stub = StubModel::replying("");
    stub.rate_limited = true;
    let server = create_test_server(Arc::new(stub));

    let response = server
        .post("/api/evaluate")
        .json(&json!({ "question": "What is Python?", "answer": "A language" }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_generate_flashcards_unparseable_reply() {
    let server = create_test_server(Arc::new(StubModel::replying("Sorry, I can't do that.")));

    let response = server
        .post("/api/flashcards")
        .json(&json!({ "topic": "Python", "level": "beginner" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to generate flashcards:")
    );
}

#[tokio::test]
async fn test_evaluate_answer_end_to_end() {
    let server = create_test_server(Arc::new(StubModel::replying(
        "```json\n{\"rating\": 4, \"feedback\": \"Correct, but mention dynamic typing.\"}\n```",
    )));

    let response = server
        .post("/api/evaluate")
        .json(&json!({ "question": "What is Python?", "answer": "A programming language" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["rating"], 4.0);
    assert_eq!(body["feedback"], "Correct, but mention dynamic typing.");
}

#[tokio::test]
async fn test_evaluate_answer_missing_answer() {
    let server = create_test_server(Arc::new(StubModel::replying("")));

    let response = server
        .post("/api/evaluate")
        .json(&json!({ "question": "What is Python?" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing required fields: question and answer");
}

#[tokio::test]
async fn test_evaluate_answer_sequence_reply_is_server_error() {
    let server = create_test_server(Arc::new(StubModel::replying(r#"Result: ["4", "good"]"#)));

    let response = server
        .post("/api/evaluate")
        .json(&json!({ "question": "Q", "answer": "A" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Failed to evaluate answer: invalid response format");
}

#[tokio::test]
async fn test_health_reports_provider() {
    let server = create_test_server(Arc::new(StubModel::replying("")));

    let response = server.get("/api/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "status": "ok", "provider": "Stub", "model": "stub-model" }));
}
