#![allow(dead_code)]

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;

const FAQS: &[(i64, &str, &str, &str, f64)] = &[
    (1, "Refund policy", "billing", "refunds", 0.93),
    (2, "Refund timeline", "billing", "refunds", 0.88),
    (3, "Cancelling an order", "orders", "changes", 0.71),
    (4, "Return shipping labels", "shipping", "returns", 0.66),
    (5, "Store credit", "billing", "credit", 0.52),
    (6, "Damaged items", "orders", "claims", 0.41),
    (7, "Gift cards", "billing", "gift cards", 0.18),
];

/// In-process stand-in for the FAQ backend.
pub fn fake_backend() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search-faq", post(search))
        .route("/chat", post(chat))
        .route("/simple-chat", post(simple_chat))
        .route("/generate-course-lesson", post(lesson))
        .route("/generate-mcq", post(mcq))
        .route("/flagged", get(flagged))
        .route("/plain", get(plain))
        .route("/wrong-shape", get(wrong_shape))
        .route("/echo-headers", post(echo_headers))
}

/// Backend that fails every request with a 500.
pub fn failing_backend() -> Router {
    Router::new().fallback(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") })
}

pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on.
pub async fn offline_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model": "gpt-4o-mini",
        "provider": "azure_openai",
        "faq_records": FAQS.len(),
    }))
}

async fn search(Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].as_str().unwrap_or_default().to_string();
    let max_results = body["max_results"].as_u64().unwrap_or(5) as usize;
    let results: Vec<Value> = FAQS
        .iter()
        .take(max_results)
        .map(|(id, title, category, sub_category, score)| {
            json!({
                "content": format!("{} answer", title),
                "metadata": {
                    "id": id,
                    "title": title,
                    "category": category,
                    "sub_category": sub_category,
                },
                "similarity_score": score,
            })
        })
        .collect();
    Json(json!({
        "query": query,
        "count": results.len(),
        "results": results,
        "status": "success",
    }))
}

fn chat_reply(message: &str, system_prompt: &str) -> Value {
    json!({
        "response": format!("{} | {}", system_prompt, message),
        "faq_context": "Refund policy: refunds are issued within 5 business days.",
        "usage": { "prompt_tokens": 42, "completion_tokens": 18, "total_tokens": 60 },
        "faq_used": true,
        "status": "success",
    })
}

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    Json(chat_reply(
        body["message"].as_str().unwrap_or_default(),
        body["system_prompt"].as_str().unwrap_or_default(),
    ))
}

async fn simple_chat(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let message = params.get("message").cloned().unwrap_or_default();
    let mut reply = chat_reply(&message, "simple");
    reply["faq_context"] = Value::Null;
    Json(reply)
}

async fn lesson(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "topic": body["topic"],
        "lesson_content": format!(
            "# {} ({}, {})",
            body["topic"].as_str().unwrap_or_default(),
            body["difficulty_level"].as_str().unwrap_or_default(),
            body["lesson_duration"].as_str().unwrap_or_default()
        ),
        "status": "success",
    }))
}

async fn mcq(Json(body): Json<Value>) -> Json<Value> {
    let count = body["number_of_questions"].as_u64().unwrap_or(0);
    let questions: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "question": format!("Question {}?", i),
                "options": ["A", "B", "C", "D"],
                "correct_answer": "B",
            })
        })
        .collect();
    Json(json!({
        "topic": body["topic"],
        "total_questions": count,
        "questions": questions,
    }))
}

async fn flagged() -> Json<Value> {
    Json(json!({ "error": "index offline", "status": "error" }))
}

async fn plain() -> &'static str {
    "definitely not json"
}

async fn wrong_shape() -> Json<Value> {
    Json(json!({ "query": 5, "results": "none" }))
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "status": "ok", "model": content_type }))
}
