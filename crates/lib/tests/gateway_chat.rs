//! Integration tests: serve the real router on a free port and drive `POST /chat` over HTTP.
//! The LLM and the judge collector are replaced with in-process fakes.

use async_trait::async_trait;
use serde_json::json;
use snare::config::Config;
use snare::gateway::{self, GatewayState};
use snare::llm::{Generator, LlmError, ModelInfo, FALLBACK_REPLY};
use snare::persona::Persona;
use snare::report::{JudgeReport, ReportError, Reporter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const KEY: &str = "buildathon2026";

#[derive(Default)]
struct FakeGenerator {
    fail: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

#[async_trait]
impl Generator for FakeGenerator {
    fn backend(&self) -> &'static str {
        "fake"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if self.fail {
            Err(LlmError::Api("503 overloaded".to_string()))
        } else {
            Ok("  Ok beta, which button do I press?  ".to_string())
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        Ok(Vec::new())
    }
}

struct ChannelReporter(mpsc::UnboundedSender<JudgeReport>);

#[async_trait]
impl Reporter for ChannelReporter {
    async fn send(&self, report: &JudgeReport) -> Result<(), ReportError> {
        let _ = self.0.send(report.clone());
        Ok(())
    }
}

struct Harness {
    base: String,
    generator: Arc<FakeGenerator>,
    reports: mpsc::UnboundedReceiver<JudgeReport>,
    client: reqwest::Client,
}

/// Reports the payload on the channel only after `delay`, then fails.
struct SlowFailingReporter {
    delay: Duration,
    tx: mpsc::UnboundedSender<JudgeReport>,
}

#[async_trait]
impl Reporter for SlowFailingReporter {
    async fn send(&self, report: &JudgeReport) -> Result<(), ReportError> {
        tokio::time::sleep(self.delay).await;
        let _ = self.tx.send(report.clone());
        Err(ReportError::Rejected("503 collector down".to_string()))
    }
}

async fn start(fail: bool) -> Harness {
    start_with(fail, |tx| Arc::new(ChannelReporter(tx)) as Arc<dyn Reporter>).await
}

async fn start_with(
    fail: bool,
    reporter: impl FnOnce(mpsc::UnboundedSender<JudgeReport>) -> Arc<dyn Reporter>,
) -> Harness {
    let generator = Arc::new(FakeGenerator {
        fail,
        ..Default::default()
    });
    let (tx, rx) = mpsc::unbounded_channel();
    let mut state = GatewayState::new(
        Config::default(),
        Persona::default(),
        generator.clone(),
        Some(reporter(tx)),
    );
    state.api_key = Some(KEY.to_string());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, gateway::router(state)).await;
    });

    Harness {
        base: format!("http://{}", addr),
        generator,
        reports: rx,
        client: reqwest::Client::new(),
    }
}

fn body(text: &str, history: usize) -> serde_json::Value {
    let history: Vec<_> = (0..history)
        .map(|i| {
            json!({
                "sender": if i % 2 == 0 { "scammer" } else { "user" },
                "text": format!("line {}", i),
                "timestamp": i
            })
        })
        .collect();
    json!({
        "sessionId": "test-123",
        "message": { "sender": "scammer", "text": text, "timestamp": 123456 },
        "conversationHistory": history,
        "metadata": { "channel": "SMS", "language": "en" }
    })
}

impl Harness {
    async fn post(&self, key: Option<&str>, body: &serde_json::Value) -> reqwest::Response {
        let mut req = self.client.post(format!("{}/chat", self.base)).json(body);
        if let Some(k) = key {
            req = req.header("x-api-key", k);
        }
        req.send().await.expect("send")
    }

    async fn next_report(&mut self) -> Option<JudgeReport> {
        tokio::time::timeout(Duration::from_millis(500), self.reports.recv())
            .await
            .ok()
            .flatten()
    }
}

#[tokio::test]
async fn health_reports_running() {
    let h = start(false).await;
    let resp = h.client.get(format!("{}/", h.base)).send().await.unwrap();
    assert!(resp.status().is_success());
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["runtime"], "running");
    assert_eq!(json["backend"], "fake");
    assert_eq!(json["port"], 10000);
}

#[tokio::test]
async fn valid_key_gets_persona_reply() {
    let h = start(false).await;
    let resp = h.post(Some(KEY), &body("Hello, I am from the bank.", 2)).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["reply"], "Ok beta, which button do I press?");

    let prompt = h.generator.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("CONVERSATION HISTORY:\nscammer: line 0\nuser: line 1\n"));
    assert!(prompt.ends_with("scammer: Hello, I am from the bank.\nRamesh:"));
}

#[tokio::test]
async fn wrong_key_is_rejected_before_generation() {
    let h = start(false).await;
    let resp = h.post(Some("nope"), &body("pay to rahul@okicici", 0)).await;
    assert_eq!(resp.status().as_u16(), 401);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["detail"], "Invalid API Key");

    let resp = h.post(None, &body("hi", 0)).await;
    assert_eq!(resp.status().as_u16(), 401);

    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_failure_still_succeeds_with_fallback() {
    let h = start(true).await;
    let resp = h.post(Some(KEY), &body("Give me your UPI PIN immediately.", 0)).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["reply"], FALLBACK_REPLY);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn long_conversation_is_reported_without_intel() {
    let mut h = start(false).await;
    let resp = h.post(Some(KEY), &body("are you there?", 7)).await;
    assert_eq!(resp.status().as_u16(), 200);

    let report = h.next_report().await.expect("report scheduled");
    assert_eq!(report.session_id, "test-123");
    assert!(report.scam_detected);
    assert_eq!(report.total_messages_exchanged, 8);
    assert!(report.extracted_intelligence.is_empty());
    assert_eq!(report.agent_notes, "Scammer detected. Ramesh engaged to waste time.");
}

#[tokio::test]
async fn intel_in_latest_message_is_reported() {
    let mut h = start(false).await;
    let resp = h
        .post(Some(KEY), &body("pay to rahul@okicici or call 9876543210", 1))
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let report = h.next_report().await.expect("report scheduled");
    assert_eq!(report.total_messages_exchanged, 2);
    assert_eq!(report.extracted_intelligence.upi_ids, vec!["rahul@okicici"]);
    assert_eq!(report.extracted_intelligence.phone_numbers, vec!["9876543210"]);
    assert!(report.extracted_intelligence.bank_accounts.is_empty());
}

#[tokio::test]
async fn slow_failing_report_does_not_delay_or_fail_reply() {
    let delay = Duration::from_secs(2);
    let mut h = start_with(false, move |tx| {
        Arc::new(SlowFailingReporter { delay, tx }) as Arc<dyn Reporter>
    })
    .await;

    let started = Instant::now();
    let resp = h.post(Some(KEY), &body("pay rahul@okicici", 0)).await;
    let elapsed = started.elapsed();
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["reply"], "Ok beta, which button do I press?");
    assert!(elapsed < Duration::from_secs(1), "reply took {:?}", elapsed);

    let report = tokio::time::timeout(Duration::from_secs(5), h.reports.recv())
        .await
        .expect("reporter ran")
        .expect("report delivered");
    assert_eq!(report.extracted_intelligence.upi_ids, vec!["rahul@okicici"]);
}

#[tokio::test]
async fn short_conversation_without_intel_is_not_reported() {
    let mut h = start(false).await;
    let resp = h.post(Some(KEY), &body("hello uncle", 5)).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(h.next_report().await.is_none());
}

#[tokio::test]
async fn history_is_not_scanned() {
    let mut h = start(false).await;
    let mut b = body("ok?", 1);
    b["conversationHistory"][0]["text"] = json!("send to rahul@okicici");
    let resp = h.post(Some(KEY), &b).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(h.next_report().await.is_none());
}

#[tokio::test]
async fn malformed_body_is_unprocessable() {
    let h = start(false).await;
    let resp = h.post(Some(KEY), &json!({ "sessionId": "x" })).await;
    assert_eq!(resp.status().as_u16(), 422);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn refuses_public_bind_without_key() {
    if std::env::var("API_SECRET_KEY").is_ok() {
        return;
    }
    let mut config = Config::default();
    config.server.bind = "0.0.0.0".to_string();
    config.server.api_key = None;
    let err = gateway::run_gateway(config, "/nonexistent/config.json".into())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("without an api key"));
}
