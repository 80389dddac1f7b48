use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use super::openai::OpenAiCompatibleProvider;
use super::provider::CompletionProvider;
use super::types::{ChatMessage, ChatRequest};

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<Value>>>,
    auth: Arc<Mutex<Option<String>>>,
}

async fn spawn_endpoint(status: StatusCode, reply: Value) -> (String, Captured) {
    let captured = Captured::default();
    let state = (captured.clone(), status, reply);

    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State((captured, status, reply)): State<(Captured, StatusCode, Value)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    *captured.body.lock().expect("lock") = Some(body);
                    *captured.auth.lock().expect("lock") = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    (status, Json(reply))
                },
            ),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}", addr), captured)
}

#[tokio::test]
async fn test_complete_returns_first_choice() {
    let reply = json!({"choices": [{"message": {"role": "assistant", "content": "שלום"}}]});
    let (base_url, captured) = spawn_endpoint(StatusCode::OK, reply).await;

    let provider =
        OpenAiCompatibleProvider::new(base_url, "tour-model".to_string(), Some("secret".into()));
    let mut request = ChatRequest::new(vec![
        ChatMessage::system("be brief"),
        ChatMessage::user("hello"),
    ]);
    request.json_mode = true;

    let text = provider.complete(request).await.expect("complete");
    assert_eq!(text, "שלום");

    let body = captured.body.lock().expect("lock").clone().expect("body");
    assert_eq!(body["model"], "tour-model");
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(
        captured.auth.lock().expect("lock").as_deref(),
        Some("Bearer secret")
    );
}

#[tokio::test]
async fn test_error_status_is_an_error() {
    let (base_url, _) = spawn_endpoint(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "model not loaded"}),
    )
    .await;

    let provider = OpenAiCompatibleProvider::new(base_url, "m".to_string(), None);
    let err = provider
        .complete(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let provider = OpenAiCompatibleProvider::new(format!("http://{}", addr), "m".to_string(), None);
    assert!(provider
        .complete(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .is_err());
}

#[tokio::test]
#[ignore]
async fn test_live_local_endpoint() {
    let provider = OpenAiCompatibleProvider::new(
        "http://localhost:1234".to_string(),
        "local-model".to_string(),
        None,
    );
    match provider
        .complete(ChatRequest::new(vec![ChatMessage::user("Hello")]))
        .await
    {
        Ok(text) => println!("Completion: {}", text),
        Err(e) => panic!("Failed to reach local endpoint: {}", e),
    }
}
