#![allow(dead_code)]

use axum::Router;
use deepguard::backend::{router, BackendState};
use deepguard::common::config::DevBackendConfig;
use deepguard::common::Config;
use deepguard::core::{CaptureWidget, Container, WidgetFactory, WidgetOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub async fn spawn_dev_backend(dev: DevBackendConfig, feedback_dir: PathBuf) -> (String, Arc<BackendState>) {
    let state = Arc::new(BackendState::new(&dev, feedback_dir));
    let base_url = spawn_router(router(state.clone())).await;
    (base_url, state)
}

pub fn scripted(is_live: bool, confidence: f64, risk_score: Option<f64>) -> DevBackendConfig {
    DevBackendConfig {
        is_live,
        confidence,
        risk_score,
        ..DevBackendConfig::default()
    }
}

pub fn config_for(base_url: &str) -> Config {
    let mut config = Config::default();
    config.backend.base_url = base_url.to_string();
    config.backend.request_timeout_ms = 2000;
    config.detector.completion_timeout_secs = 5;
    config.auth.enabled = false;
    config
}

/// Shared, ordered record of what the flow touched.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }
}

/// Widget that logs its mount and completes after `delay`.
pub struct RecordingWidgetFactory {
    pub log: EventLog,
    pub delay: Duration,
}

struct RecordingWidget {
    log: EventLog,
    delay: Duration,
    options: Option<WidgetOptions>,
}

impl CaptureWidget for RecordingWidget {
    fn mount(&mut self, container: &Container) -> Result<(), String> {
        let options = self.options.take().ok_or("mounted twice")?;
        self.log.push(format!("mount:{}:{}", container.id(), options.session_id));

        let log = self.log.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            log.push("complete");
            options.on_analysis_complete.notify();
        });
        Ok(())
    }
}

impl WidgetFactory for RecordingWidgetFactory {
    fn create(&self, options: WidgetOptions) -> Result<Box<dyn CaptureWidget>, String> {
        self.log.push(format!("create-widget:{}", options.region));
        Ok(Box::new(RecordingWidget {
            log: self.log.clone(),
            delay: self.delay,
            options: Some(options),
        }))
    }
}

/// Polls `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
