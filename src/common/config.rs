use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::common::error::{DeepGuardError, Result};
use crate::common::paths;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub dev_backend: DevBackendConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_alert_ws_path")]
    pub alert_ws_path: String,
}

fn default_base_url() -> String { "http://127.0.0.1:8000".to_string() }
fn default_request_timeout() -> u64 { 10_000 }
fn default_alert_ws_path() -> String { "/ws/alerts".to_string() }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
            alert_ws_path: default_alert_ws_path(),
        }
    }
}

impl BackendConfig {
    /// WebSocket URL of the alert channel, derived from `base_url`.
    pub fn alert_ws_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}{}", ws_base, self.alert_ws_path)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_container")]
    pub container_id: String,
    #[serde(default = "default_capture_url")]
    pub capture_url: String,
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_secs: u64,
    /// Delay before the simulated widget reports completion (dev mode only)
    #[serde(default = "default_simulated_delay")]
    pub simulated_delay_ms: u64,
}

fn default_region() -> String { "ap-south-1".to_string() }
fn default_container() -> String { "liveness-container".to_string() }
fn default_capture_url() -> String {
    "https://liveness.example.com/capture?session={session_id}&region={region}".to_string()
}
fn default_completion_timeout() -> u64 { 300 }
fn default_simulated_delay() -> u64 { 1500 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            container_id: default_container(),
            capture_url: default_capture_url(),
            completion_timeout_secs: default_completion_timeout(),
            simulated_delay_ms: default_simulated_delay(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlertConfig {
    #[serde(default = "default_dismiss_delay")]
    pub dismiss_delay_ms: u64,
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: f64,
}

fn default_dismiss_delay() -> u64 { 4000 }
fn default_risk_threshold() -> f64 { 0.7 }

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            dismiss_delay_ms: default_dismiss_delay(),
            risk_threshold: default_risk_threshold(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

fn default_true() -> bool { true }
fn default_login_url() -> String { "/login.html".to_string() }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            login_url: default_login_url(),
        }
    }
}

/// Scripted behaviour of the local development backend.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DevBackendConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_true")]
    pub is_live: bool,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default = "default_alert_capacity")]
    pub alert_channel_capacity: usize,
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }
fn default_confidence() -> f64 { 92.0 }
fn default_alert_capacity() -> usize { 64 }

impl Default for DevBackendConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            is_live: default_true(),
            confidence: default_confidence(),
            risk_score: None,
            alert_channel_capacity: default_alert_capacity(),
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeepGuardError::Config(format!(
                "Config file not found: {}. Please create it from the example.", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| DeepGuardError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then the local file, then the system file, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        let local = PathBuf::from("configs/deepguard.toml");
        if local.exists() {
            return Self::load_from_path(&local);
        }

        let system = paths::system_config_file();
        if system.exists() {
            return Self::load_from_path(&system);
        }

        tracing::info!("No config file found, using built-in defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate backend
        if !self.backend.base_url.starts_with("http://") && !self.backend.base_url.starts_with("https://") {
            return Err(DeepGuardError::Config(format!(
                "Backend base_url must start with http:// or https://, got {}", self.backend.base_url
            )));
        }
        if self.backend.request_timeout_ms < 100 || self.backend.request_timeout_ms > 120_000 {
            return Err(DeepGuardError::Config(format!(
                "Request timeout must be between 100 and 120000 ms, got {}",
                self.backend.request_timeout_ms
            )));
        }
        if !self.backend.alert_ws_path.starts_with('/') {
            return Err(DeepGuardError::Config(format!(
                "Alert WebSocket path must start with '/', got {}", self.backend.alert_ws_path
            )));
        }

        // Validate detector
        if self.detector.region.trim().is_empty() {
            return Err(DeepGuardError::Config("Detector region must not be empty".into()));
        }
        if self.detector.completion_timeout_secs < 1 || self.detector.completion_timeout_secs > 3600 {
            return Err(DeepGuardError::Config(format!(
                "Completion timeout must be between 1 and 3600 seconds, got {}",
                self.detector.completion_timeout_secs
            )));
        }

        // Validate alerts
        if self.alerts.dismiss_delay_ms < 1 || self.alerts.dismiss_delay_ms > 60_000 {
            return Err(DeepGuardError::Config(format!(
                "Alert dismiss delay must be between 1 and 60000 ms, got {}",
                self.alerts.dismiss_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.alerts.risk_threshold) {
            return Err(DeepGuardError::Config(format!(
                "Risk threshold must be between 0.0 and 1.0, got {}",
                self.alerts.risk_threshold
            )));
        }

        // Validate scripted dev backend result
        if !(0.0..=100.0).contains(&self.dev_backend.confidence) {
            return Err(DeepGuardError::Config(format!(
                "Dev backend confidence must be between 0 and 100, got {}",
                self.dev_backend.confidence
            )));
        }
        if let Some(risk) = self.dev_backend.risk_score {
            if !(0.0..=1.0).contains(&risk) {
                return Err(DeepGuardError::Config(format!(
                    "Dev backend risk_score must be between 0.0 and 1.0, got {}", risk
                )));
            }
        }
        if self.dev_backend.alert_channel_capacity == 0 {
            return Err(DeepGuardError::Config("Alert channel capacity must be at least 1".into()));
        }

        Ok(())
    }
}
