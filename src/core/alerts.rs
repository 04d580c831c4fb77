use crate::core::page::Page;
use crate::service::protocol::AlertCategory;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub type AlertId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertColor {
    Red,
    Yellow,
    Blue,
    Grey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertStyle {
    pub color: AlertColor,
    pub icon: &'static str,
    pub text: &'static str,
}

/// Fixed display style for each category.
pub fn style_for(category: AlertCategory) -> AlertStyle {
    match category {
        AlertCategory::Deepfake => AlertStyle {
            color: AlertColor::Red,
            icon: "🚨",
            text: "Deepfake detected! Verification blocked.",
        },
        AlertCategory::Phishing => AlertStyle {
            color: AlertColor::Yellow,
            icon: "⚠️",
            text: "Possible phishing attempt detected. Do not share OTPs or passwords.",
        },
        AlertCategory::Transaction => AlertStyle {
            color: AlertColor::Blue,
            icon: "💳",
            text: "High-risk transaction flagged for review.",
        },
    }
}

const MESSAGE_STYLE: AlertStyle = AlertStyle {
    color: AlertColor::Grey,
    icon: "ℹ️",
    text: "",
};

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Category(AlertCategory),
    Message(String),
}

impl From<AlertCategory> for Alert {
    fn from(category: AlertCategory) -> Self {
        Alert::Category(category)
    }
}

impl From<&str> for Alert {
    fn from(message: &str) -> Self {
        Alert::Message(message.to_string())
    }
}

impl From<String> for Alert {
    fn from(message: String) -> Self {
        Alert::Message(message)
    }
}

/// A rendered alert element as the page receives it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertView {
    pub id: AlertId,
    pub category: Option<AlertCategory>,
    pub color: AlertColor,
    pub icon: &'static str,
    pub text: String,
}

impl AlertView {
    fn render(id: AlertId, alert: Alert) -> Self {
        match alert {
            Alert::Category(category) => {
                let style = style_for(category);
                Self {
                    id,
                    category: Some(category),
                    color: style.color,
                    icon: style.icon,
                    text: style.text.to_string(),
                }
            }
            Alert::Message(text) => Self {
                id,
                category: None,
                color: MESSAGE_STYLE.color,
                icon: MESSAGE_STYLE.icon,
                text,
            },
        }
    }
}

/// Shows transient alerts on a page and removes each one after a fixed delay.
///
/// Every alert gets its own dismissal timer, so alerts stack independently.
/// `show` must be called from within a tokio runtime.
#[derive(Clone)]
pub struct AlertPresenter {
    page: Arc<dyn Page>,
    dismiss_delay: Duration,
    next_id: Arc<AtomicU64>,
}

impl AlertPresenter {
    pub fn new(page: Arc<dyn Page>, dismiss_delay: Duration) -> Self {
        Self {
            page,
            dismiss_delay,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn active(&self) -> Vec<AlertId> {
        self.page.active_alerts()
    }

    pub fn show(&self, alert: impl Into<Alert>) -> AlertId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let view = AlertView::render(id, alert.into());
        self.page.append_alert(&view);

        let page = Arc::clone(&self.page);
        let delay = self.dismiss_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            page.remove_alert(id);
        });

        id
    }
}
