#![cfg(feature = "http-api")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use linebridge_core::config::{AiConfig, Config, EnvelopeFormat, NoMatchPolicy};
use linebridge_core::error::ProviderError;
use linebridge_core::provider::LlmProvider;
use linebridge_core::responder::AiResponder;
use linebridge_core::router::FALLBACK_TEXT;
use linebridge_core::service::http::{create_router, MAX_BODY_BYTES};
use linebridge_core::service::AppState;
use linebridge_core::types::{CompletionResponse, FinishReason, Message, TokenUsage};

struct CountingProvider {
    reply: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for CountingProvider {
    async fn chat(
        &self,
        _messages: &[Message],
        _model: &str,
        _max_tokens: u32,
        _temperature: f64,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionResponse {
            content: Some(self.reply.to_string()),
            finish_reason: FinishReason::Stop,
            usage: TokenUsage::default(),
        })
    }

    fn default_model(&self) -> &str {
        "counting"
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn counting(reply: &'static str) -> Arc<CountingProvider> {
    Arc::new(CountingProvider {
        reply,
        calls: AtomicUsize::new(0),
    })
}

fn app(config: Config) -> axum::Router {
    create_router(Arc::new(AppState::new(config)))
}

fn app_with(config: Config, provider: Arc<CountingProvider>) -> axum::Router {
    let ai = AiConfig {
        api_key: "test-key".into(),
        ..config.ai.clone()
    };
    let responder = AiResponder::new(&ai, provider);
    create_router(Arc::new(AppState::with_responder(config, responder)))
}

async fn post(app: axum::Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn messages(value: &Value) -> &Vec<Value> {
    value["fulfillmentResponse"]["messages"].as_array().unwrap()
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app(Config::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_payment_tag() {
    let (status, value) = post(app(Config::default()), r#"{"tag": "direct_payment_query"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let text = messages(&value)[0]["text"]["text"][0].as_str().unwrap();
    assert!(text.contains("已繳清"));
    assert!(text.contains("2026/01/15 (下一期)"));
}

#[tokio::test]
async fn test_mbti_keyword_is_rich_payload() {
    let (status, value) = post(app(Config::default()), r#"{"text": "彩虹城市AI助理 查MBTI"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let line = &messages(&value)[0]["payload"]["line"];
    assert_eq!(line["type"], "flex");
    assert!(line["altText"].as_str().unwrap().starts_with("MBTI 分析結果"));

    let bubble = &line["contents"];
    assert_eq!(bubble["type"], "bubble");
    assert_eq!(bubble["body"]["type"], "box");
    assert_eq!(bubble["body"]["layout"], "vertical");
    let body = bubble["body"]["contents"].as_array().unwrap();
    let kinds: Vec<&str> = body.iter().map(|c| c["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["text", "separator", "text", "text"]);
    assert_eq!(body[0]["text"], "MBTI 分析結果");
    assert_eq!(body[2]["text"], "您的問題：彩虹城市AI助理 查MBTI");
    assert_eq!(body[3]["text"], "AI 分析功能目前尚未開放，敬請期待。");
    assert_eq!(bubble["footer"]["type"], "box");
    assert_eq!(bubble["footer"]["contents"][0]["type"], "text");
    assert_eq!(bubble["footer"]["contents"][0]["text"], "彩虹城市AI助理 · 僅供參考");
}

#[tokio::test]
async fn test_hello_is_never_rich() {
    let (status, value) = post(app(Config::default()), r#"{"text": "hello"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({"fulfillmentResponse": {"messages": []}}));
}

#[tokio::test]
async fn test_hello_with_fallback_policy() {
    let mut config = Config::default();
    config.envelope.no_match = NoMatchPolicy::Fallback;
    let (_, value) = post(app(config), r#"{"text": "hello"}"#).await;
    assert_eq!(messages(&value)[0]["text"]["text"][0], FALLBACK_TEXT);
}

#[tokio::test]
async fn test_links_tag_in_cx_shape() {
    let body = json!({
        "fulfillmentInfo": {"tag": "direct_links_query"},
        "sessionInfo": {"session": "projects/p/locations/l/agents/a/sessions/s"},
        "text": "anything"
    });
    let (_, value) = post(app(Config::default()), body.to_string()).await;
    let template = &messages(&value)[0]["payload"]["line"]["template"];
    assert_eq!(template["type"], "carousel");
    assert_eq!(template["columns"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_menu_tag_quick_reply() {
    let (_, value) = post(app(Config::default()), r#"{"tag": "direct_menu"}"#).await;
    let items = messages(&value)[0]["payload"]["line"]["quickReply"]["items"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(items.len(), 3);
    assert!(items
        .iter()
        .all(|i| i["action"]["text"].as_str().unwrap().starts_with("彩虹城市AI助理 ")));
}

#[tokio::test]
async fn test_malformed_bodies_still_200() {
    for body in ["", "not json", "[]", "{\"text\": 5}"] {
        let (status, value) = post(app(Config::default()), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(messages(&value).len(), 0);
    }
}

#[tokio::test]
async fn test_oversized_body_is_200_with_envelope() {
    let padding = "x".repeat(MAX_BODY_BYTES + 6 * 1024);
    let body = json!({"tag": "direct_payment_query", "padding": padding}).to_string();
    assert!(body.len() > MAX_BODY_BYTES);

    let (status, value) = post(app(Config::default()), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({"fulfillmentResponse": {"messages": []}}));
}

#[tokio::test]
async fn test_body_at_limit_is_routed() {
    let overhead = json!({"tag": "direct_payment_query", "padding": ""}).to_string().len();
    let padding = "x".repeat(MAX_BODY_BYTES - overhead);
    let body = json!({"tag": "direct_payment_query", "padding": padding}).to_string();
    assert_eq!(body.len(), MAX_BODY_BYTES);

    let (status, value) = post(app(Config::default()), body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(messages(&value)[0]["text"]["text"][0]
        .as_str()
        .unwrap()
        .contains("已繳清"));
}

#[tokio::test]
async fn test_es_envelope() {
    let mut config = Config::default();
    config.envelope.format = EnvelopeFormat::Es;
    let (_, value) = post(app(config), r#"{"queryResult": {"queryText": "彩虹城市AI助理 繳費"}}"#).await;
    assert!(value["fulfillmentMessages"][0]["text"]["text"][0]
        .as_str()
        .unwrap()
        .contains("已繳清"));
}

#[tokio::test]
async fn test_analysis_uses_model_reply() {
    let provider = counting("你可能是 INTJ。");
    let (_, value) = post(
        app_with(Config::default(), provider.clone()),
        r#"{"text": "彩虹城市AI助理 MBTI 我喜歡獨處"}"#,
    )
    .await;
    let body = &messages(&value)[0]["payload"]["line"]["contents"]["body"]["contents"];
    assert_eq!(body[3]["text"], "你可能是 INTJ。");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_static_branches_never_call_model() {
    let provider = counting("unused");
    let app = app_with(Config::default(), provider.clone());
    for body in [
        r#"{"tag": "direct_payment_query"}"#,
        r#"{"tag": "direct_links_query"}"#,
        r#"{"text": "hello"}"#,
        r#"{"text": "彩虹城市AI助理"}"#,
        r#"{"text": "彩虹城市AI助理 天氣"}"#,
    ] {
        post(app.clone(), body).await;
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ai_chat_fallback() {
    let mut config = Config::default();
    config.routing.ai_chat_fallback = true;
    let provider = counting("今天晴天。");
    let (_, value) = post(
        app_with(config, provider.clone()),
        r#"{"text": "彩虹城市AI助理 今天天氣如何"}"#,
    )
    .await;
    assert_eq!(messages(&value)[0]["text"]["text"][0], "今天晴天。");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
