use crate::common::{Config, DeepGuardError, Result};
use crate::core::{
    alerts::AlertPresenter,
    auth_gate::{AuthGate, AuthenticatedIdentity},
    detector::{Container, DetectorAdapter},
    page::Page,
};
use crate::service::client::SessionApi;
use crate::service::protocol::{AlertCategory, VerificationResult};
use std::fmt;
use std::sync::Arc;

pub const INIT_FAILED_ALERT: &str = "Error initializing liveness check";
pub const VERIFY_FAILED_ALERT: &str = "Error verifying session";

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    SessionPending,
    DetectorMounted,
    Verifying,
    Resolved(VerificationResult),
    Failed(String),
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => f.write_str("idle"),
            FlowState::SessionPending => f.write_str("session-pending"),
            FlowState::DetectorMounted => f.write_str("detector-mounted"),
            FlowState::Verifying => f.write_str("verifying"),
            FlowState::Resolved(_) => f.write_str("resolved"),
            FlowState::Failed(_) => f.write_str("failed"),
        }
    }
}

/// How a completed run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Resolved {
        result: VerificationResult,
        risk_alert: Option<AlertCategory>,
    },
    /// The auth gate redirected the page; nothing else ran.
    Redirected,
    Failed(String),
}

/// `Result: ✅ LIVE | Confidence: 92%`
pub fn format_result(result: &VerificationResult) -> String {
    format!(
        "Result: {} | Confidence: {}%",
        if result.is_live { "✅ LIVE" } else { "❌ FAKE" },
        result.confidence
    )
}

/// Category to raise for a result, if its risk score is above `threshold`.
pub fn risk_alert_for(result: &VerificationResult, threshold: f64) -> Option<AlertCategory> {
    match result.risk_score {
        Some(risk) if risk > threshold => Some(if result.is_live {
            AlertCategory::Transaction
        } else {
            AlertCategory::Deepfake
        }),
        _ => None,
    }
}

/// Step of the flow an error came from; the state has not advanced past it yet.
pub fn failure_stage(error: &DeepGuardError) -> &'static str {
    match error {
        DeepGuardError::SessionCreation(_) => "session creation",
        DeepGuardError::Mount(_) => "detector mount",
        DeepGuardError::Verification(_) => "verification",
        _ => "liveness check",
    }
}

/// Drives one liveness verification from session creation to a rendered verdict.
///
/// Built per run; owns its detector adapter so the mounted widget lives
/// exactly as long as the orchestrator.
pub struct VerificationOrchestrator {
    api: Arc<dyn SessionApi>,
    detector: DetectorAdapter,
    alerts: AlertPresenter,
    page: Arc<dyn Page>,
    auth_gate: Option<AuthGate>,
    container_id: String,
    risk_threshold: f64,
    state: FlowState,
    identity: Option<AuthenticatedIdentity>,
}

impl VerificationOrchestrator {
    pub fn new(
        config: &Config,
        api: Arc<dyn SessionApi>,
        detector: DetectorAdapter,
        alerts: AlertPresenter,
        page: Arc<dyn Page>,
    ) -> Self {
        Self {
            api,
            detector,
            alerts,
            page,
            auth_gate: None,
            container_id: config.detector.container_id.clone(),
            risk_threshold: config.alerts.risk_threshold,
            state: FlowState::Idle,
            identity: None,
        }
    }

    pub fn with_auth_gate(mut self, gate: AuthGate) -> Self {
        self.auth_gate = Some(gate);
        self
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.identity.as_ref()
    }

    fn transition(&mut self, next: FlowState) {
        tracing::debug!("Verification flow: {} -> {}", self.state, next);
        self.state = next;
    }

    pub async fn run(&mut self) -> FlowOutcome {
        if self.state != FlowState::Idle {
            tracing::warn!("Verification flow already ran (state: {})", self.state);
            return FlowOutcome::Failed(format!("flow is not idle ({})", self.state));
        }

        // Auth gate, when configured, must pass before anything else
        if let Some(gate) = &self.auth_gate {
            match gate.resolve(self.page.as_ref()).await {
                Ok(identity) => self.identity = Some(identity),
                Err(_) => return FlowOutcome::Redirected,
            }
        }

        let result = match self.execute().await {
            Ok(result) => result,
            Err(e) => {
                let alert = match e {
                    DeepGuardError::Verification(_) => VERIFY_FAILED_ALERT,
                    _ => INIT_FAILED_ALERT,
                };
                tracing::error!("Liveness verification failed at {}: {}", failure_stage(&e), e);
                self.alerts.show(alert);
                self.transition(FlowState::Failed(e.to_string()));
                return FlowOutcome::Failed(e.to_string());
            }
        };

        self.page.set_result_text(&format_result(&result));

        let risk_alert = risk_alert_for(&result, self.risk_threshold);
        if let Some(category) = risk_alert {
            tracing::warn!(
                "Risk score {:?} above {} - raising {} alert",
                result.risk_score, self.risk_threshold, category
            );
            self.alerts.show(category);
        }

        self.transition(FlowState::Resolved(result.clone()));
        FlowOutcome::Resolved { result, risk_alert }
    }

    async fn execute(&mut self) -> Result<VerificationResult> {
        self.transition(FlowState::SessionPending);
        let session = self.api.create_session().await?;

        let container = self.page
            .has_region(&self.container_id)
            .then(|| Container::new(self.container_id.clone()));
        let pending = self.detector.mount(container, &session)?;
        self.transition(FlowState::DetectorMounted);

        pending.wait().await?;

        self.transition(FlowState::Verifying);
        self.api.verify(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(is_live: bool, confidence: f64, risk_score: Option<f64>) -> VerificationResult {
        VerificationResult { is_live, confidence, risk_score }
    }

    #[test]
    fn formats_live_and_fake_results() {
        assert_eq!(format_result(&result(true, 92.0, Some(0.3))), "Result: ✅ LIVE | Confidence: 92%");
        assert_eq!(format_result(&result(false, 40.0, None)), "Result: ❌ FAKE | Confidence: 40%");
        assert_eq!(format_result(&result(true, 87.5, None)), "Result: ✅ LIVE | Confidence: 87.5%");
    }

    #[test]
    fn failures_name_their_step() {
        assert_eq!(failure_stage(&DeepGuardError::SessionCreation("500".into())), "session creation");
        assert_eq!(failure_stage(&DeepGuardError::Mount("container element not found".into())), "detector mount");
        assert_eq!(failure_stage(&DeepGuardError::Verification("timed out".into())), "verification");
    }

    #[test]
    fn risk_alert_only_above_threshold() {
        assert_eq!(risk_alert_for(&result(false, 40.0, Some(0.85)), 0.7), Some(AlertCategory::Deepfake));
        assert_eq!(risk_alert_for(&result(true, 95.0, Some(0.9)), 0.7), Some(AlertCategory::Transaction));
        assert_eq!(risk_alert_for(&result(false, 40.0, Some(0.7)), 0.7), None);
        assert_eq!(risk_alert_for(&result(false, 40.0, None), 0.7), None);
    }
}
