use crate::backend::risk::{score_transactions, score_transcript};
use crate::common::config::{AlertConfig, DevBackendConfig};
use crate::common::Result;
use crate::service::protocol::{
    AlertCategory, AlertEvent, FeedbackRequest, TranscriptAnalysisRequest,
    TranscriptAnalysisResponse, TransactionAnalysisResponse, TransactionBatchRequest,
    VerificationResult,
};
use rand::{Rng, thread_rng};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct SessionTable {
    /// Issued and not yet verified, with their creation time.
    pending: HashMap<String, Instant>,
    /// Verified ids, kept only to refuse a second verification.
    consumed: HashSet<String>,
}

impl SessionTable {
    fn is_known(&self, session_id: &str) -> bool {
        self.pending.contains_key(session_id) || self.consumed.contains(session_id)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyRejection {
    UnknownSession,
    AlreadyVerified,
}

/// In-memory state of the dev backend.
pub struct BackendState {
    sessions: Mutex<SessionTable>,
    scripted_result: VerificationResult,
    alert_threshold: f64,
    feedback_dir: PathBuf,
    alerts_tx: broadcast::Sender<String>,
}

impl BackendState {
    pub fn new(config: &DevBackendConfig, feedback_dir: PathBuf) -> Self {
        let (alerts_tx, _) = broadcast::channel(config.alert_channel_capacity);
        Self {
            sessions: Mutex::new(SessionTable::default()),
            scripted_result: VerificationResult {
                is_live: config.is_live,
                confidence: config.confidence,
                risk_score: config.risk_score,
            },
            alert_threshold: AlertConfig::default().risk_threshold,
            feedback_dir,
            alerts_tx,
        }
    }

    /// Analysis scores strictly above `threshold` are broadcast as alerts.
    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = threshold;
        self
    }

    fn sessions(&self) -> MutexGuard<'_, SessionTable> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create_session(&self) -> String {
        let mut sessions = self.sessions();
        loop {
            let session_id = generate_session_id();
            if !sessions.is_known(&session_id) {
                sessions.pending.insert(session_id.clone(), Instant::now());
                return session_id;
            }
        }
    }

    /// Scores a session; each session can be verified once.
    pub fn verify_session(&self, session_id: &str) -> std::result::Result<VerificationResult, VerifyRejection> {
        let mut sessions = self.sessions();
        let removed = sessions.pending.remove(session_id);
        let created_at = match removed {
            Some(created_at) => created_at,
            None if sessions.consumed.contains(session_id) => {
                return Err(VerifyRejection::AlreadyVerified);
            }
            None => return Err(VerifyRejection::UnknownSession),
        };
        sessions.consumed.insert(session_id.to_string());
        tracing::info!(
            "Session {} verified after {:.1}s",
            session_id,
            created_at.elapsed().as_secs_f32()
        );
        Ok(self.scripted_result.clone())
    }

    /// Sessions created but not yet verified.
    pub fn active_sessions(&self) -> usize {
        self.sessions().pending.len()
    }

    pub fn analyze_transcript(&self, request: &TranscriptAnalysisRequest) -> TranscriptAnalysisResponse {
        let risk = score_transcript(&request.transcript, request.sentiment);
        tracing::info!(
            "Transcript scored {:.2} ({} keyword(s), patterns: {:?})",
            risk.risk_score, risk.flagged_keywords.len(), risk.matched_patterns
        );

        let alerted = self.alert_if_risky(AlertCategory::Phishing, risk.risk_score);
        TranscriptAnalysisResponse {
            risk_score: risk.risk_score,
            flagged_keywords: risk.flagged_keywords,
            matched_patterns: risk.matched_patterns,
            alerted,
        }
    }

    pub fn analyze_transactions(&self, request: &TransactionBatchRequest) -> TransactionAnalysisResponse {
        let risk = score_transactions(&request.transactions);
        tracing::info!(
            "{} transaction(s) scored {:.2} (flagged users: {:?}, locations: {}, rapid: {})",
            request.transactions.len(), risk.risk_score, risk.flagged_users,
            risk.distinct_locations, risk.rapid_burst
        );

        let alerted = self.alert_if_risky(AlertCategory::Transaction, risk.risk_score);
        TransactionAnalysisResponse {
            risk_score: risk.risk_score,
            flagged_users: risk.flagged_users,
            distinct_locations: risk.distinct_locations,
            rapid_burst: risk.rapid_burst,
            alerted,
        }
    }

    fn alert_if_risky(&self, category: AlertCategory, risk_score: f64) -> bool {
        if risk_score <= self.alert_threshold {
            return false;
        }
        let delivered = self.publish_alert(category);
        tracing::warn!("Risk {:.2} above {}: {} alert sent to {} subscriber(s)",
            risk_score, self.alert_threshold, category, delivered);
        true
    }

    pub fn store_feedback(&self, feedback: &FeedbackRequest) -> Result<PathBuf> {
        fs::create_dir_all(&self.feedback_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let path = self.feedback_dir.join(format!(
            "{}_{}.json", sanitize_file_component(&feedback.user_id), timestamp
        ));

        let record = serde_json::json!({
            "user_id": feedback.user_id,
            "description": feedback.description,
            "received_at": chrono::Utc::now().to_rfc3339(),
        });
        fs::write(&path, serde_json::to_vec_pretty(&record)?)?;
        tracing::info!("Feedback from {} stored at {}", feedback.user_id, path.display());
        Ok(path)
    }

    /// Returns the number of connected alert subscribers reached.
    pub fn publish_alert(&self, category: AlertCategory) -> usize {
        let payload = match serde_json::to_string(&AlertEvent { category }) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode alert event: {}", e);
                return 0;
            }
        };
        self.alerts_tx.send(payload).unwrap_or(0)
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<String> {
        self.alerts_tx.subscribe()
    }

    pub fn alert_subscribers(&self) -> usize {
        self.alerts_tx.receiver_count()
    }
}

fn generate_session_id() -> String {
    let mut rng = thread_rng();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes[..]);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn sanitize_file_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "anonymous".to_string() } else { cleaned }
}
