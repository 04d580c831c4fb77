mod common;

use axum::{http::StatusCode, routing::post, Json, Router};
use common::{config_for, scripted, spawn_dev_backend, spawn_router};
use deepguard::core::feedback::FEEDBACK_FAILED_MESSAGE;
use deepguard::core::{submit_feedback, HeadlessPage};
use deepguard::SessionClient;

#[tokio::test]
async fn feedback_is_stored_and_acknowledged() {
    let dir = tempfile::tempdir().unwrap();
    let feedback_dir = dir.path().join("feedback");
    let (base_url, _state) = spawn_dev_backend(scripted(true, 92.0, None), feedback_dir.clone()).await;
    let client = SessionClient::new(&config_for(&base_url).backend).unwrap();
    let page = HeadlessPage::new(Vec::<String>::new());

    let acknowledged = submit_feedback(&client, &page, "u-17", "caller asked me to read an OTP").await;

    assert!(acknowledged);
    assert_eq!(page.snapshot().messages, vec!["Feedback submitted successfully".to_string()]);

    let stored: Vec<_> = std::fs::read_dir(&feedback_dir).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(stored.len(), 1);
    let name = stored[0].file_name().into_string().unwrap();
    assert!(name.starts_with("u-17_") && name.ends_with(".json"));

    let record: serde_json::Value = serde_json::from_slice(&std::fs::read(stored[0].path()).unwrap()).unwrap();
    assert_eq!(record["user_id"], "u-17");
    assert_eq!(record["description"], "caller asked me to read an OTP");
}

#[tokio::test]
async fn unreachable_backend_shows_generic_error() {
    let mut config = config_for("http://127.0.0.1:9");
    config.backend.request_timeout_ms = 500;
    let client = SessionClient::new(&config.backend).unwrap();
    let page = HeadlessPage::new(Vec::<String>::new());

    let acknowledged = submit_feedback(&client, &page, "u-17", "suspicious call").await;

    assert!(!acknowledged);
    assert_eq!(page.snapshot().messages, vec![FEEDBACK_FAILED_MESSAGE.to_string()]);
}

#[tokio::test]
async fn backend_message_is_shown_on_error_status() {
    let app = Router::new().route(
        "/api/submit-feedback",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "bucket down" })),
            )
        }),
    );
    let base_url = spawn_router(app).await;
    let client = SessionClient::new(&config_for(&base_url).backend).unwrap();
    let page = HeadlessPage::new(Vec::<String>::new());

    assert!(submit_feedback(&client, &page, "u-17", "suspicious call").await);
    assert_eq!(page.snapshot().messages, vec!["bucket down".to_string()]);
}
