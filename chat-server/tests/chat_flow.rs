//! Router-level tests: inbound HTTP through summarization, retrieval and the
//! streamed answer, against a mocked chat endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use futures::{StreamExt, stream};
use http::{Request, StatusCode};
use lento_chat_server::orchestrator::SUMMARIZE_PROMPT;
use lento_chat_server::{
    AppState, ChatClient, ChatCompletionRequest, ChatConfig, ChatError, FrameStream,
    OpenAIChatClient, build_router,
};
use lento_retrieval::{ContextRetriever, RetrievalError};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Returns a fixed context and records every question it was asked.
#[derive(Default)]
struct RecordingRetriever {
    questions: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl ContextRetriever for RecordingRetriever {
    async fn retrieve(&self, question: &str) -> lento_retrieval::Result<String> {
        self.questions.lock().unwrap().push(question.to_string());
        if self.fail {
            return Err(RetrievalError::UnknownCandidate(9));
        }
        Ok("检索到以下1篇文档：\n\n第1篇文档：\n\nX is a letter.\n\n".to_string())
    }
}

fn router(server: &MockServer, retriever: Arc<RecordingRetriever>, config: ChatConfig) -> Router {
    let client = OpenAIChatClient::new(&ChatConfig {
        base_url: format!("{}/v1", server.uri()),
        ..config
    });
    build_router(AppState::new(
        Arc::new(client),
        retriever,
        "summary-model",
        "所有",
        30,
    ))
}

async fn mount_summary(server: &MockServer, question: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "summary-model", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": question}}]
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_answer(server: &MockServer) {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"A \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"letter.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

async fn upstream_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_end_to_end_flow() {
    let server = MockServer::start().await;
    mount_summary(&server, "What exactly is X?").await;
    mount_answer(&server).await;
    let retriever = Arc::new(RecordingRetriever::default());

    let response = router(&server, retriever.clone(), ChatConfig::default())
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "model": "caller-model",
                "messages": [
                    {"role": "system", "content": "Be terse"},
                    {"role": "user", "content": "What is X?"}
                ],
                "stream": false,
                "temperature": 0.3
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert_eq!(
        body_string(response).await,
        concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"A \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"letter.\"}}]}\n\n",
            "data: [DONE]\n\n",
        )
    );

    assert_eq!(
        *retriever.questions.lock().unwrap(),
        vec!["What exactly is X?".to_string()]
    );

    let bodies = upstream_bodies(&server).await;
    assert_eq!(bodies.len(), 2);

    let summary = &bodies[0];
    assert_eq!(summary["model"], "summary-model");
    assert_eq!(summary["temperature"], 0.3);
    assert_eq!(
        summary["messages"],
        json!([
            {"role": "system", "content": SUMMARIZE_PROMPT},
            {"role": "user", "content": "1. [role=user] What is X?\n\n"}
        ])
    );

    let answer = &bodies[1];
    assert_eq!(answer["model"], "caller-model");
    assert_eq!(answer["stream"], true);
    assert_eq!(answer["temperature"], 0.3);
    assert_eq!(answer["messages"][0], json!({"role": "system", "content": "Be terse"}));
    let user = answer["messages"][1]["content"].as_str().unwrap();
    assert!(user.starts_with("请根据以下检索到的信息，回答用户的原始问题：What exactly is X?\n\n"));
    assert!(user.ends_with("X is a letter.\n\n"));
}

#[tokio::test]
async fn test_without_system_message_sends_empty_system_prompt() {
    let server = MockServer::start().await;
    mount_summary(&server, "q").await;
    mount_answer(&server).await;

    let response = router(&server, Arc::default(), ChatConfig::default())
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_string(response).await;

    let bodies = upstream_bodies(&server).await;
    assert_eq!(bodies[1]["messages"][0], json!({"role": "system", "content": ""}));
}

#[tokio::test]
async fn test_developer_role_is_accepted_and_transcribed() {
    let server = MockServer::start().await;
    mount_summary(&server, "q").await;
    mount_answer(&server).await;

    let response = router(&server, Arc::default(), ChatConfig::default())
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "model": "m",
                "messages": [
                    {"role": "developer", "content": "cite sources"},
                    {"role": "user", "content": "hi"}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_string(response).await;

    let bodies = upstream_bodies(&server).await;
    assert_eq!(
        bodies[0]["messages"][1]["content"],
        "0. [role=developer] cite sources\n\n1. [role=user] hi\n\n"
    );
    assert_eq!(bodies[1]["messages"][0], json!({"role": "system", "content": ""}));
}

#[tokio::test]
async fn test_empty_messages_rejected_without_upstream_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = router(&server, Arc::default(), ChatConfig::default())
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "m", "messages": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("messages"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = MockServer::start().await;
    let response = router(&server, Arc::default(), ChatConfig::default())
        .oneshot(post_json("/v1/chat/completions", json!({"messages": "nope"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await.get("error").is_some());
}

#[tokio::test]
async fn test_summarization_failure_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .expect(1)
        .mount(&server)
        .await;
    let retriever = Arc::new(RecordingRetriever::default());

    let response = router(&server, retriever.clone(), ChatConfig::default())
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("model crashed"));
    assert!(retriever.questions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_retrieval_failure_skips_answer() {
    let server = MockServer::start().await;
    mount_summary(&server, "q").await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let retriever = Arc::new(RecordingRetriever {
        fail: true,
        ..Default::default()
    });

    let response = router(&server, retriever, ChatConfig::default())
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_summarization_timeout_is_gateway_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = ChatConfig {
        summary_timeout: Duration::from_millis(100),
        ..ChatConfig::default()
    };
    let response = router(&server, Arc::default(), config)
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

/// Summarizes to a fixed question and streams one frame followed by an error.
struct BrokenStreamClient;

#[async_trait]
impl ChatClient for BrokenStreamClient {
    async fn complete(&self, _request: &ChatCompletionRequest) -> lento_chat_server::Result<String> {
        Ok("q".to_string())
    }

    async fn stream(&self, _request: &ChatCompletionRequest) -> lento_chat_server::Result<FrameStream> {
        Ok(stream::iter(vec![
            Ok("{\"partial\":true}".to_string()),
            Err(ChatError::Stream("upstream went away".to_string())),
        ])
        .boxed())
    }
}

#[tokio::test]
async fn test_mid_stream_error_emits_error_event() {
    let app = build_router(AppState::new(
        Arc::new(BrokenStreamClient),
        Arc::new(RecordingRetriever::default()),
        "summary-model",
        "所有",
        0,
    ));

    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(
        body,
        "data: {\"partial\":true}\n\nevent: error\ndata: {\"error\":\"stream error: upstream went away\"}\n\n"
    );
    assert!(!body.contains("[DONE]"));
}

#[tokio::test]
async fn test_tool_definition_and_call() {
    let server = MockServer::start().await;
    let retriever = Arc::new(RecordingRetriever::default());
    let app = router(&server, retriever.clone(), ChatConfig::default());

    let response = app
        .clone()
        .oneshot(Request::get("/v1/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let tools = body_json(response).await;
    assert_eq!(tools[0]["type"], "function");
    assert_eq!(tools[0]["function"]["name"], "retrieve_documents");
    assert_eq!(
        tools[0]["function"]["description"],
        "当用户查询所有问题时调用此函数"
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/tools/retrieve_documents",
            json!({"arguments": "{\"question\": \"What is X?\"}"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert!(result["result"].as_str().unwrap().contains("X is a letter."));

    let response = app
        .oneshot(post_json("/v1/tools/retrieve_documents", json!({"arguments": "not json"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"result": null}));

    assert_eq!(
        *retriever.questions.lock().unwrap(),
        vec!["What is X?".to_string()]
    );
}

#[tokio::test]
async fn test_tool_call_retrieval_failure_is_null() {
    let server = MockServer::start().await;
    let retriever = Arc::new(RecordingRetriever {
        fail: true,
        ..Default::default()
    });

    let response = router(&server, retriever, ChatConfig::default())
        .oneshot(post_json(
            "/v1/tools/retrieve_documents",
            json!({"question": "q"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"result": null}));
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let response = router(&server, Arc::default(), ChatConfig::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true, "documents": 30}));
}
