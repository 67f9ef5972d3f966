//! Per-request log lines for POST /ask
//!
//! Captures JSON log output at the default `info` level and checks that every
//! request, including rejected bodies, leaves one line with its model,
//! prompt size, elapsed time and outcome.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use ollamaverse::{config::Config, handlers::AppState, server::build_router, telemetry};
use serde_json::{Value, json};
use std::io;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

/// In-memory sink for the JSON formatter
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    /// Install a subscriber writing here for the current thread
    fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        tracing_subscriber::registry()
            .with(EnvFilter::new(telemetry::default_directive("info")))
            .with(fmt::layer().json().with_writer(move || sink.clone()))
            .set_default()
    }

    /// Every captured event carrying the given message
    fn events(&self, message: &str) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|event| event["fields"]["message"] == message)
            .collect()
    }
}

fn create_app(backend_url: &str) -> Router {
    let config: Config = format!(
        r#"
[server]
request_timeout_seconds = 5
probe_timeout_seconds = 1

[[models]]
key = "smollm2"
base_url = "{backend_url}"
backend_model = "smollm2:135m-instruct-q8_0"
"#
    )
    .parse()
    .expect("should parse test config");
    let state = AppState::new(Arc::new(config)).expect("AppState::new should succeed");
    build_router(state)
}

async fn post(app: Router, body: String) -> StatusCode {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
    .status()
}

#[tokio::test]
async fn test_success_line_carries_prompt_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "hey" })))
        .mount(&server)
        .await;

    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let body = json!({ "model": "smollm2", "prompt": "héllo" }).to_string();
    assert_eq!(post(create_app(&server.uri()), body).await, StatusCode::OK);

    let events = logs.events("Chat request completed");
    assert_eq!(events.len(), 1);
    let fields = &events[0]["fields"];
    assert_eq!(events[0]["level"], "INFO");
    assert_eq!(fields["model"], "smollm2");
    assert_eq!(fields["prompt_chars"], 5);
    assert_eq!(fields["response_chars"], 3);
    assert_eq!(fields["outcome"], "success");
    assert!(fields["elapsed_seconds"].is_f64());
}

#[tokio::test]
async fn test_failure_line_carries_prompt_size() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let body = json!({ "model": "smollm2", "prompt": "héllo" }).to_string();
    assert_eq!(
        post(create_app(UNREACHABLE_URL), body).await,
        StatusCode::SERVICE_UNAVAILABLE
    );

    let events = logs.events("Chat request failed");
    assert_eq!(events.len(), 1);
    let fields = &events[0]["fields"];
    assert_eq!(events[0]["level"], "WARN");
    assert_eq!(fields["model"], "smollm2");
    assert_eq!(fields["prompt_chars"], 5);
    assert_eq!(fields["outcome"], "backend_unavailable");
    assert!(fields["elapsed_seconds"].is_f64());
}

#[tokio::test]
async fn test_rejected_body_is_logged_at_warn() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    assert_eq!(
        post(create_app(UNREACHABLE_URL), "{not json".to_string()).await,
        StatusCode::BAD_REQUEST
    );

    let events = logs.events("Chat request failed");
    assert_eq!(events.len(), 1);
    let fields = &events[0]["fields"];
    assert_eq!(events[0]["level"], "WARN");
    assert_eq!(fields["model"], "unconfigured");
    assert_eq!(fields["prompt_chars"], 0);
    assert_eq!(fields["outcome"], "invalid_body");
    assert!(fields["elapsed_seconds"].is_f64());
}
