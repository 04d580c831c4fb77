mod common;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::post, Json, Router};
use common::{config_for, scripted, spawn_dev_backend, spawn_router, EventLog, RecordingWidgetFactory};
use deepguard::core::orchestrator::{INIT_FAILED_ALERT, VERIFY_FAILED_ALERT};
use deepguard::core::{
    AlertPresenter, AuthGate, DetectorAdapter, FileIdentityStore, FlowOutcome, FlowState,
    HeadlessPage, Page, VerificationOrchestrator,
};
use deepguard::protocol::{AlertCategory, VerificationResult};
use deepguard::{Config, DeepGuardError, Result, Session, SessionApi, SessionClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    page: Arc<HeadlessPage>,
    log: EventLog,
    orchestrator: VerificationOrchestrator,
}

fn harness(config: &Config, api: Arc<dyn SessionApi>) -> Harness {
    let page = Arc::new(HeadlessPage::new([config.detector.container_id.clone()]));
    let log = EventLog::default();
    let detector = DetectorAdapter::new(
        Box::new(RecordingWidgetFactory { log: log.clone(), delay: Duration::from_millis(20) }),
        config.detector.region.clone(),
        Duration::from_secs(config.detector.completion_timeout_secs),
    );
    let alerts = AlertPresenter::new(page.clone(), Duration::from_millis(config.alerts.dismiss_delay_ms));
    let orchestrator = VerificationOrchestrator::new(config, api, detector, alerts, page.clone() as Arc<dyn Page>);
    Harness { page, log, orchestrator }
}

/// In-process backend that records each call into the shared log.
struct FakeApi {
    log: EventLog,
    result: Option<VerificationResult>,
    created: AtomicUsize,
}

impl FakeApi {
    fn new(log: EventLog, result: Option<VerificationResult>) -> Self {
        Self { log, result, created: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl SessionApi for FakeApi {
    async fn create_session(&self) -> Result<Session> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.push("create-session");
        Ok(Session::new(format!("s{}", n)))
    }

    async fn verify(&self, session: Session) -> Result<VerificationResult> {
        self.log.push(format!("verify:{}", session.id()));
        self.result
            .clone()
            .ok_or_else(|| DeepGuardError::Verification("backend responded with status 502".into()))
    }

    async fn submit_feedback(&self, _user_id: &str, _description: &str) -> Result<String> {
        Ok("ok".into())
    }
}

#[tokio::test]
async fn live_result_renders_without_alert() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, _state) = spawn_dev_backend(scripted(true, 92.0, Some(0.3)), dir.path().join("feedback")).await;
    let config = config_for(&base_url);
    let client = Arc::new(SessionClient::new(&config.backend).unwrap());
    let mut h = harness(&config, client);

    let outcome = h.orchestrator.run().await;

    assert_eq!(
        outcome,
        FlowOutcome::Resolved {
            result: VerificationResult { is_live: true, confidence: 92.0, risk_score: Some(0.3) },
            risk_alert: None,
        }
    );
    let state = h.page.snapshot();
    assert_eq!(state.result_text.as_deref(), Some("Result: ✅ LIVE | Confidence: 92%"));
    assert!(state.alert_history.is_empty());
    assert!(matches!(h.orchestrator.state(), FlowState::Resolved(_)));
}

#[tokio::test]
async fn high_risk_fake_raises_one_deepfake_alert() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, _state) = spawn_dev_backend(scripted(false, 40.0, Some(0.85)), dir.path().join("feedback")).await;
    let config = config_for(&base_url);
    let client = Arc::new(SessionClient::new(&config.backend).unwrap());
    let mut h = harness(&config, client);

    let outcome = h.orchestrator.run().await;

    assert!(matches!(outcome, FlowOutcome::Resolved { risk_alert: Some(AlertCategory::Deepfake), .. }));
    let state = h.page.snapshot();
    assert_eq!(state.result_text.as_deref(), Some("Result: ❌ FAKE | Confidence: 40%"));
    assert_eq!(state.alert_history.len(), 1);
    assert_eq!(state.alert_history[0].category, Some(AlertCategory::Deepfake));
}

#[tokio::test]
async fn high_risk_live_raises_transaction_alert() {
    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(
        log,
        Some(VerificationResult { is_live: true, confidence: 97.0, risk_score: Some(0.95) }),
    ));
    let mut h = harness(&config_for("http://127.0.0.1:1"), api);

    h.orchestrator.run().await;

    let history = h.page.snapshot().alert_history;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].category, Some(AlertCategory::Transaction));
}

#[tokio::test]
async fn absent_risk_score_only_renders_text() {
    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(
        log,
        Some(VerificationResult { is_live: false, confidence: 12.0, risk_score: None }),
    ));
    let mut h = harness(&config_for("http://127.0.0.1:1"), api);

    h.orchestrator.run().await;

    let state = h.page.snapshot();
    assert_eq!(state.result_text.as_deref(), Some("Result: ❌ FAKE | Confidence: 12%"));
    assert!(state.alert_history.is_empty());
}

#[tokio::test]
async fn steps_run_in_order() {
    let config = config_for("http://127.0.0.1:1");
    let page = Arc::new(HeadlessPage::new(["liveness-container"]));
    // Widget and API share one log so the interleaving is visible
    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(
        log.clone(),
        Some(VerificationResult { is_live: true, confidence: 92.0, risk_score: None }),
    ));
    let detector = DetectorAdapter::new(
        Box::new(RecordingWidgetFactory { log: log.clone(), delay: Duration::from_millis(20) }),
        "ap-south-1",
        Duration::from_secs(5),
    );
    let alerts = AlertPresenter::new(page.clone(), Duration::from_millis(4000));
    let mut orchestrator = VerificationOrchestrator::new(&config, api, detector, alerts, page);

    orchestrator.run().await;

    assert_eq!(
        log.events(),
        vec![
            "create-session".to_string(),
            "create-widget:ap-south-1".to_string(),
            "mount:liveness-container:s1".to_string(),
            "complete".to_string(),
            "verify:s1".to_string(),
        ]
    );
}

#[tokio::test]
async fn create_session_failure_never_mounts() {
    let app = Router::new().route(
        "/api/create-session",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base_url = spawn_router(app).await;
    let config = config_for(&base_url);
    let client = Arc::new(SessionClient::new(&config.backend).unwrap());
    let mut h = harness(&config, client);

    let outcome = h.orchestrator.run().await;

    assert!(matches!(outcome, FlowOutcome::Failed(ref reason) if reason.contains("500")));
    assert!(matches!(h.orchestrator.state(), FlowState::Failed(_)));
    assert!(h.log.events().is_empty(), "widget must not be created or mounted");
    let state = h.page.snapshot();
    assert_eq!(state.result_text, None);
    assert_eq!(state.alert_history.len(), 1);
    assert_eq!(state.alert_history[0].text, INIT_FAILED_ALERT);
}

#[tokio::test]
async fn verification_failure_aborts_with_alert() {
    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(log.clone(), None));
    let mut h = harness(&config_for("http://127.0.0.1:1"), api);

    let outcome = h.orchestrator.run().await;

    assert!(matches!(outcome, FlowOutcome::Failed(_)));
    let state = h.page.snapshot();
    assert_eq!(state.result_text, None);
    assert_eq!(state.alert_history.len(), 1);
    assert_eq!(state.alert_history[0].text, VERIFY_FAILED_ALERT);
    assert_eq!(log.count("verify:s1"), 1);
}

#[tokio::test]
async fn missing_container_fails_before_verify() {
    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(
        log.clone(),
        Some(VerificationResult { is_live: true, confidence: 92.0, risk_score: None }),
    ));
    let mut config = config_for("http://127.0.0.1:1");
    config.detector.container_id = "not-on-this-page".into();
    let page = Arc::new(HeadlessPage::new(["liveness-container"]));
    let detector = DetectorAdapter::new(
        Box::new(RecordingWidgetFactory { log: log.clone(), delay: Duration::from_millis(1) }),
        "ap-south-1",
        Duration::from_secs(5),
    );
    let alerts = AlertPresenter::new(page.clone(), Duration::from_millis(4000));
    let mut orchestrator = VerificationOrchestrator::new(&config, api, detector, alerts, page.clone());

    let outcome = orchestrator.run().await;

    assert!(matches!(outcome, FlowOutcome::Failed(ref reason) if reason.contains("container")));
    assert_eq!(log.events(), vec!["create-session".to_string()]);
    assert_eq!(page.snapshot().alert_history[0].text, INIT_FAILED_ALERT);
}

#[tokio::test]
async fn unauthenticated_visitor_is_redirected_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(log.clone(), None));
    let mut config = config_for("http://127.0.0.1:1");
    config.auth.enabled = true;
    let h = harness(&config, api);
    let gate = AuthGate::new(
        Box::new(FileIdentityStore::new(dir.path().join("identity.json"))),
        config.auth.login_url.clone(),
    );
    let mut orchestrator = h.orchestrator.with_auth_gate(gate);

    let outcome = orchestrator.run().await;

    assert_eq!(outcome, FlowOutcome::Redirected);
    assert!(log.events().is_empty());
    let state = h.page.snapshot();
    assert_eq!(state.redirected_to.as_deref(), Some("/login.html"));
    assert!(state.alert_history.is_empty());
}

#[tokio::test]
async fn signed_in_visitor_runs_the_flow() {
    let dir = tempfile::tempdir().unwrap();
    let identity_file = dir.path().join("identity.json");
    FileIdentityStore::new(identity_file.clone()).sign_in("officer@bank.example").unwrap();

    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(
        log.clone(),
        Some(VerificationResult { is_live: true, confidence: 92.0, risk_score: Some(0.1) }),
    ));
    let h = harness(&config_for("http://127.0.0.1:1"), api);
    let gate = AuthGate::new(Box::new(FileIdentityStore::new(identity_file)), "/login.html");
    let mut orchestrator = h.orchestrator.with_auth_gate(gate);

    let outcome = orchestrator.run().await;

    assert!(matches!(outcome, FlowOutcome::Resolved { .. }));
    assert_eq!(orchestrator.identity().map(|i| i.email.as_str()), Some("officer@bank.example"));
    assert_eq!(h.page.snapshot().sign_out_label.as_deref(), Some("officer@bank.example"));
}

#[tokio::test]
async fn orchestrator_runs_only_once() {
    let log = EventLog::default();
    let api = Arc::new(FakeApi::new(
        log.clone(),
        Some(VerificationResult { is_live: true, confidence: 92.0, risk_score: None }),
    ));
    let mut h = harness(&config_for("http://127.0.0.1:1"), api);

    h.orchestrator.run().await;
    let second = h.orchestrator.run().await;

    assert!(matches!(second, FlowOutcome::Failed(_)));
    assert_eq!(log.count("create-session"), 1);
}

#[tokio::test]
async fn session_ids_are_never_reused() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, state) = spawn_dev_backend(scripted(true, 92.0, None), dir.path().join("feedback")).await;
    let client = SessionClient::new(&config_for(&base_url).backend).unwrap();

    let first = client.create_session().await.unwrap();
    let second = client.create_session().await.unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(state.active_sessions(), 2);
}

#[tokio::test]
async fn reissued_session_id_is_rejected() {
    let app = Router::new().route(
        "/api/create-session",
        post(|| async { Json(serde_json::json!({ "session_id": "s1" })) }),
    );
    let base_url = spawn_router(app).await;
    let client = SessionClient::new(&config_for(&base_url).backend).unwrap();

    assert_eq!(client.create_session().await.unwrap().id(), "s1");
    let err = client.create_session().await.unwrap_err();
    assert!(matches!(err, DeepGuardError::SessionCreation(ref msg) if msg.contains("reissued")));
}

#[tokio::test]
async fn malformed_session_payload_is_rejected() {
    let app = Router::new().route(
        "/api/create-session",
        post(|| async { Json(serde_json::json!({ "id": "s1" })) }),
    );
    let base_url = spawn_router(app).await;
    let client = SessionClient::new(&config_for(&base_url).backend).unwrap();

    let err = client.create_session().await.unwrap_err();
    assert!(matches!(err, DeepGuardError::SessionCreation(ref msg) if msg.contains("malformed")));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let app = Router::new().route(
        "/api/create-session",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(serde_json::json!({ "session_id": "late" }))
        }),
    );
    let base_url = spawn_router(app).await;
    let mut config = config_for(&base_url);
    config.backend.request_timeout_ms = 200;
    let client = SessionClient::new(&config.backend).unwrap();

    let err = client.create_session().await.unwrap_err();
    assert!(matches!(err, DeepGuardError::SessionCreation(ref msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn verifying_a_session_twice_is_refused_by_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, _state) = spawn_dev_backend(scripted(true, 92.0, None), dir.path().join("feedback")).await;
    let client = SessionClient::new(&config_for(&base_url).backend).unwrap();

    let session = client.create_session().await.unwrap();
    let replay = Session::new(session.id());
    client.verify(session).await.unwrap();

    let err = client.verify(replay).await.unwrap_err();
    assert!(matches!(err, DeepGuardError::Verification(ref msg) if msg.contains("409")));
}

#[tokio::test]
async fn slow_verification_times_out() {
    let app = Router::new().route(
        "/api/verify-session",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(serde_json::json!({ "is_live": true, "confidence": 99 }))
        }),
    );
    let base_url = spawn_router(app).await;
    let mut config = config_for(&base_url);
    config.backend.request_timeout_ms = 200;
    let client = SessionClient::new(&config.backend).unwrap();

    let err = client.verify(Session::new("s1")).await.unwrap_err();
    assert!(matches!(err, DeepGuardError::Verification(ref msg) if msg.contains("timed out after 200 ms")));
}

#[tokio::test]
async fn malformed_verification_payload_is_rejected() {
    let app = Router::new().route(
        "/api/verify-session",
        post(|| async { Json(serde_json::json!({ "live": "yes" })) }),
    );
    let base_url = spawn_router(app).await;
    let client = SessionClient::new(&config_for(&base_url).backend).unwrap();

    let err = client.verify(Session::new("s1")).await.unwrap_err();
    assert!(matches!(err, DeepGuardError::Verification(ref msg) if msg.contains("malformed payload")));
}
