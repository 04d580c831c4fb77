//! Rendering surface the verification flow writes to.
//!
//! A page has named regions (the detector mounts into one), a result line, a
//! stack of transient alerts, a sign-out control and a message box. Writes are
//! synchronous; the page is shared between the orchestrator and the alert
//! dismissal timers behind an `Arc`.

use crate::core::alerts::{AlertId, AlertView};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

pub trait Page: Send + Sync {
    fn has_region(&self, region_id: &str) -> bool;

    fn append_alert(&self, alert: &AlertView);

    fn remove_alert(&self, id: AlertId);

    /// Ids of alerts currently displayed, oldest first.
    fn active_alerts(&self) -> Vec<AlertId>;

    fn set_result_text(&self, text: &str);

    fn show_sign_out(&self, label: &str);

    fn hide_sign_out(&self);

    fn redirect(&self, destination: &str);

    fn show_message(&self, message: &str);
}

/// Everything a headless page has rendered so far.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub active_alerts: Vec<AlertView>,
    pub alert_history: Vec<AlertView>,
    pub result_text: Option<String>,
    pub sign_out_label: Option<String>,
    pub redirected_to: Option<String>,
    pub messages: Vec<String>,
}

/// In-memory page used for `--headless` runs and tests.
pub struct HeadlessPage {
    regions: BTreeSet<String>,
    state: Mutex<PageState>,
}

impl HeadlessPage {
    pub fn new<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            regions: regions.into_iter().map(Into::into).collect(),
            state: Mutex::new(PageState::default()),
        }
    }

    pub fn snapshot(&self) -> PageState {
        self.lock().clone()
    }

    // A poisoned lock only means a writer panicked mid-render; keep the state.
    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Page for HeadlessPage {
    fn has_region(&self, region_id: &str) -> bool {
        self.regions.contains(region_id)
    }

    fn append_alert(&self, alert: &AlertView) {
        tracing::info!("Alert #{} shown: {}", alert.id, alert.text);
        let mut state = self.lock();
        state.active_alerts.push(alert.clone());
        state.alert_history.push(alert.clone());
    }

    fn remove_alert(&self, id: AlertId) {
        tracing::debug!("Alert #{} dismissed", id);
        self.lock().active_alerts.retain(|a| a.id != id);
    }

    fn active_alerts(&self) -> Vec<AlertId> {
        self.lock().active_alerts.iter().map(|a| a.id).collect()
    }

    fn set_result_text(&self, text: &str) {
        tracing::info!("{}", text);
        self.lock().result_text = Some(text.to_string());
    }

    fn show_sign_out(&self, label: &str) {
        self.lock().sign_out_label = Some(label.to_string());
    }

    fn hide_sign_out(&self) {
        self.lock().sign_out_label = None;
    }

    fn redirect(&self, destination: &str) {
        tracing::info!("Redirecting to {}", destination);
        self.lock().redirected_to = Some(destination.to_string());
    }

    fn show_message(&self, message: &str) {
        tracing::info!("{}", message);
        self.lock().messages.push(message.to_string());
    }
}
