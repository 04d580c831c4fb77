use crate::backend::state::{BackendState, VerifyRejection};
use crate::service::protocol::{
    AlertEvent, CreateSessionResponse, FeedbackRequest, FeedbackResponse, HealthResponse,
    PublishAlertResponse, TranscriptAnalysisRequest, TranscriptAnalysisResponse,
    TransactionAnalysisResponse, TransactionBatchRequest, VerificationResult, VerifySessionRequest,
    ALERT_WS_PATH, ANALYZE_TRANSACTIONS_PATH, ANALYZE_TRANSCRIPT_PATH, CREATE_SESSION_PATH,
    HEALTH_PATH, PUBLISH_ALERT_PATH, SUBMIT_FEEDBACK_PATH, VERIFY_SESSION_PATH,
};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "detail": detail.into() })))
}

pub fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route(CREATE_SESSION_PATH, post(create_session))
        .route(VERIFY_SESSION_PATH, post(verify_session))
        .route(SUBMIT_FEEDBACK_PATH, post(submit_feedback))
        .route(PUBLISH_ALERT_PATH, post(publish_alert))
        .route(ANALYZE_TRANSCRIPT_PATH, post(analyze_transcript))
        .route(ANALYZE_TRANSACTIONS_PATH, post(analyze_transactions))
        .route(HEALTH_PATH, get(health))
        .route(ALERT_WS_PATH, get(alerts_ws))
        .with_state(state)
}

// The request body is `{}` or empty; nothing in it is read.
async fn create_session(State(state): State<Arc<BackendState>>) -> Json<CreateSessionResponse> {
    let session_id = state.create_session();
    info!("Created session {}", session_id);
    Json(CreateSessionResponse { session_id })
}

async fn verify_session(
    State(state): State<Arc<BackendState>>,
    Json(request): Json<VerifySessionRequest>,
) -> Result<Json<VerificationResult>, ApiError> {
    match state.verify_session(&request.session_id) {
        Ok(result) => Ok(Json(result)),
        Err(VerifyRejection::UnknownSession) => {
            warn!("Verification requested for unknown session {}", request.session_id);
            Err(api_error(StatusCode::NOT_FOUND, "Unknown session"))
        }
        Err(VerifyRejection::AlreadyVerified) => {
            warn!("Session {} verified twice", request.session_id);
            Err(api_error(StatusCode::CONFLICT, "Session already verified"))
        }
    }
}

async fn submit_feedback(
    State(state): State<Arc<BackendState>>,
    Json(feedback): Json<FeedbackRequest>,
) -> (StatusCode, Json<FeedbackResponse>) {
    match state.store_feedback(&feedback) {
        Ok(_) => (
            StatusCode::OK,
            Json(FeedbackResponse { message: "Feedback submitted successfully".into() }),
        ),
        Err(e) => {
            tracing::error!("Feedback submission failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FeedbackResponse { message: e.to_string() }),
            )
        }
    }
}

async fn publish_alert(
    State(state): State<Arc<BackendState>>,
    Json(event): Json<AlertEvent>,
) -> Json<PublishAlertResponse> {
    let delivered = state.publish_alert(event.category);
    debug!("Alert {} delivered to {} subscriber(s)", event.category, delivered);
    Json(PublishAlertResponse { delivered })
}

async fn analyze_transcript(
    State(state): State<Arc<BackendState>>,
    Json(request): Json<TranscriptAnalysisRequest>,
) -> Json<TranscriptAnalysisResponse> {
    Json(state.analyze_transcript(&request))
}

async fn analyze_transactions(
    State(state): State<Arc<BackendState>>,
    Json(request): Json<TransactionBatchRequest>,
) -> Result<Json<TransactionAnalysisResponse>, ApiError> {
    if let Some(tx) = request.transactions.iter().find(|tx| !tx.amount.is_finite() || tx.amount < 0.0) {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Invalid amount {} for user {}", tx.amount, tx.user_id),
        ));
    }
    Ok(Json(state.analyze_transactions(&request)))
}

async fn health(State(state): State<Arc<BackendState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        sessions_active: state.active_sessions(),
        alert_subscribers: state.alert_subscribers(),
    })
}

async fn alerts_ws(ws: WebSocketUpgrade, State(state): State<Arc<BackendState>>) -> impl IntoResponse {
    // Subscribe before upgrading so no event published after the handshake is missed
    let rx = state.subscribe_alerts();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    debug!("Alert subscriber connected");

    let forwarder = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    if ws_sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Alert subscriber lagged, {} alert(s) dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    forwarder.abort();
    debug!("Alert subscriber disconnected");
}
