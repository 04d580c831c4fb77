use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeepGuardError {
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Detector mount failed: {0}")]
    Mount(String),

    #[error("No authenticated identity: {0}")]
    AuthResolution(String),

    #[error("Feedback submission failed: {0}")]
    FeedbackSubmission(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for DeepGuardError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        DeepGuardError::WebSocket(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeepGuardError>;
