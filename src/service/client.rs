use crate::common::config::BackendConfig;
use crate::common::{DeepGuardError, Result};
use crate::service::protocol::{
    AlertCategory, AlertEvent, CreateSessionRequest, CreateSessionResponse, FeedbackRequest,
    FeedbackResponse, HealthResponse, PublishAlertResponse, TranscriptAnalysisRequest,
    TranscriptAnalysisResponse, TransactionAnalysisResponse, TransactionBatchRequest,
    VerificationResult, VerifySessionRequest, ANALYZE_TRANSACTIONS_PATH, ANALYZE_TRANSCRIPT_PATH,
    CREATE_SESSION_PATH, HEALTH_PATH, PUBLISH_ALERT_PATH, SUBMIT_FEEDBACK_PATH, VERIFY_SESSION_PATH,
};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// A server-issued verification session.
///
/// Not `Clone`: the detector borrows it for mounting and `verify` consumes it,
/// so one session can only ever be scored once.
#[derive(Debug, PartialEq, Eq)]
pub struct Session {
    id: String,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Backend operations the verification flow depends on.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create_session(&self) -> Result<Session>;

    async fn verify(&self, session: Session) -> Result<VerificationResult>;

    /// Returns the backend's confirmation message.
    async fn submit_feedback(&self, user_id: &str, description: &str) -> Result<String>;
}

pub struct SessionClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    issued: Mutex<HashSet<String>>,
}

impl SessionClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            issued: Mutex::new(HashSet::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn describe_transport(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!("request timed out after {} ms", self.timeout.as_millis())
        } else if e.is_connect() {
            format!("backend unreachable: {}", e)
        } else {
            e.to_string()
        }
    }

    /// Records a freshly issued id; false if this client has seen it before.
    fn register_issued(&self, session_id: &str) -> Result<bool> {
        let mut issued = self.issued.lock()
            .map_err(|_| anyhow::anyhow!("session registry lock poisoned"))?;
        Ok(issued.insert(session_id.to_string()))
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.http
            .get(self.endpoint(HEALTH_PATH))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Pushes an alert to every subscriber of the backend's alert channel.
    ///
    /// Returns how many subscribers it reached.
    pub async fn publish_alert(&self, category: AlertCategory) -> Result<usize> {
        let response = self.http
            .post(self.endpoint(PUBLISH_ALERT_PATH))
            .json(&AlertEvent { category })
            .send()
            .await?
            .error_for_status()?;

        let body: PublishAlertResponse = response.json().await?;
        Ok(body.delivered)
    }

    /// Scores a call transcript for phishing; a risky one is broadcast as PHISHING.
    pub async fn analyze_transcript(&self, request: &TranscriptAnalysisRequest) -> Result<TranscriptAnalysisResponse> {
        let response = self.http
            .post(self.endpoint(ANALYZE_TRANSCRIPT_PATH))
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Scores a transaction batch; a risky one is broadcast as TRANSACTION.
    pub async fn analyze_transactions(&self, request: &TransactionBatchRequest) -> Result<TransactionAnalysisResponse> {
        let response = self.http
            .post(self.endpoint(ANALYZE_TRANSACTIONS_PATH))
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SessionApi for SessionClient {
    async fn create_session(&self) -> Result<Session> {
        let url = self.endpoint(CREATE_SESSION_PATH);
        tracing::debug!("Creating verification session at {}", url);

        let response = self.http
            .post(&url)
            .json(&CreateSessionRequest::default())
            .send()
            .await
            .map_err(|e| DeepGuardError::SessionCreation(self.describe_transport(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeepGuardError::SessionCreation(format!(
                "backend responded with status {}", status
            )));
        }

        let body: CreateSessionResponse = response.json().await
            .map_err(|e| DeepGuardError::SessionCreation(format!("malformed payload: {}", e)))?;

        if body.session_id.trim().is_empty() {
            return Err(DeepGuardError::SessionCreation("backend returned an empty session id".into()));
        }

        if !self.register_issued(&body.session_id)? {
            return Err(DeepGuardError::SessionCreation(format!(
                "backend reissued session id {}", body.session_id
            )));
        }

        tracing::info!("Session created: {}", body.session_id);
        Ok(Session::new(body.session_id))
    }

    async fn verify(&self, session: Session) -> Result<VerificationResult> {
        let url = self.endpoint(VERIFY_SESSION_PATH);
        tracing::debug!("Verifying session {} at {}", session.id(), url);

        let request = VerifySessionRequest {
            session_id: session.id,
        };

        let response = self.http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeepGuardError::Verification(self.describe_transport(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeepGuardError::Verification(format!(
                "backend responded with status {} for session {}", status, request.session_id
            )));
        }

        let result: VerificationResult = response.json().await
            .map_err(|e| DeepGuardError::Verification(format!("malformed payload: {}", e)))?;

        tracing::info!(
            "Session {} verified: is_live={} confidence={} risk_score={:?}",
            request.session_id, result.is_live, result.confidence, result.risk_score
        );
        Ok(result)
    }

    async fn submit_feedback(&self, user_id: &str, description: &str) -> Result<String> {
        let request = FeedbackRequest {
            user_id: user_id.to_string(),
            description: description.to_string(),
        };

        let response = self.http
            .post(self.endpoint(SUBMIT_FEEDBACK_PATH))
            .json(&request)
            .send()
            .await
            .map_err(|e| DeepGuardError::FeedbackSubmission(self.describe_transport(&e)))?;

        // The backend reports failures through the same message body
        let status = response.status();
        let body: FeedbackResponse = response.json().await
            .map_err(|e| DeepGuardError::FeedbackSubmission(format!(
                "unreadable response (status {}): {}", status, e
            )))?;

        if !status.is_success() {
            tracing::warn!("Feedback endpoint returned {}: {}", status, body.message);
        }
        Ok(body.message)
    }
}
