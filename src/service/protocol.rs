use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

// Endpoint paths
pub const CREATE_SESSION_PATH: &str = "/api/create-session";
pub const VERIFY_SESSION_PATH: &str = "/api/verify-session";
pub const SUBMIT_FEEDBACK_PATH: &str = "/api/submit-feedback";
pub const HEALTH_PATH: &str = "/api/health";
pub const PUBLISH_ALERT_PATH: &str = "/api/alerts";
pub const ALERT_WS_PATH: &str = "/ws/alerts";
pub const ANALYZE_TRANSCRIPT_PATH: &str = "/api/analyze-transcript";
pub const ANALYZE_TRANSACTIONS_PATH: &str = "/api/analyze-transactions";

// Request types
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CreateSessionRequest {}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerifySessionRequest {
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedbackRequest {
    pub user_id: String,
    pub description: String,
}

/// Call sentiment as reported by the transcription side.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
    Mixed,
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Ok(Sentiment::Positive),
            "NEGATIVE" => Ok(Sentiment::Negative),
            "NEUTRAL" => Ok(Sentiment::Neutral),
            "MIXED" => Ok(Sentiment::Mixed),
            _ => Err(format!("unknown sentiment: {}", s)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TranscriptAnalysisRequest {
    pub transcript: String,
    #[serde(default)]
    pub sentiment: Sentiment,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub user_id: String,
    pub amount: f64,
    pub location: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransactionBatchRequest {
    pub transactions: Vec<TransactionRecord>,
}

// Response types
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// Backend verdict for one completed session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub is_live: bool,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedbackResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublishAlertResponse {
    pub delivered: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranscriptAnalysisResponse {
    pub risk_score: f64,
    pub flagged_keywords: Vec<String>,
    pub matched_patterns: Vec<String>,
    /// Whether a PHISHING alert was broadcast.
    pub alerted: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransactionAnalysisResponse {
    pub risk_score: f64,
    pub flagged_users: Vec<String>,
    pub distinct_locations: usize,
    pub rapid_burst: bool,
    /// Whether a TRANSACTION alert was broadcast.
    pub alerted: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub sessions_active: usize,
    #[serde(default)]
    pub alert_subscribers: usize,
}

// Real-time alert channel
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertCategory {
    Deepfake,
    Phishing,
    Transaction,
}

impl AlertCategory {
    pub const ALL: [AlertCategory; 3] = [
        AlertCategory::Deepfake,
        AlertCategory::Phishing,
        AlertCategory::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Deepfake => "DEEPFAKE",
            AlertCategory::Phishing => "PHISHING",
            AlertCategory::Transaction => "TRANSACTION",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown alert category: {}", s))
    }
}

/// Event pushed over the alert WebSocket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AlertEvent {
    #[serde(rename = "type")]
    pub category: AlertCategory,
}
