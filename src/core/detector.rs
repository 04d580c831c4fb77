//! Adapter around the externally supplied liveness capture widget.
//!
//! The widget owns camera access and liveness inference. This side only
//! constructs it with a session id and region, gives it a mount point, and
//! turns its analysis-complete callback into a single-shot future.

use crate::common::{DeepGuardError, Result};
use crate::service::client::Session;
use std::time::Duration;
use tokio::sync::oneshot;

/// A named page region a widget can be mounted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    id: String,
}

impl Container {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One-shot analysis-complete callback handed to the widget.
#[derive(Debug)]
pub struct CompletionNotifier {
    tx: oneshot::Sender<()>,
}

impl CompletionNotifier {
    pub fn notify(self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Analysis completed after the verification flow was torn down");
        }
    }
}

/// Construction parameters for a widget instance.
#[derive(Debug)]
pub struct WidgetOptions {
    pub session_id: String,
    pub region: String,
    pub on_analysis_complete: CompletionNotifier,
}

pub trait CaptureWidget: Send {
    fn mount(&mut self, container: &Container) -> std::result::Result<(), String>;
}

/// Builds widget instances; stands in for the vendor SDK's constructor.
pub trait WidgetFactory: Send + Sync {
    fn create(&self, options: WidgetOptions) -> std::result::Result<Box<dyn CaptureWidget>, String>;
}

/// Resolves once the mounted widget reports analysis completion.
#[must_use = "the analysis outcome is only observed by awaiting `wait`"]
pub struct PendingAnalysis {
    rx: oneshot::Receiver<()>,
    timeout: Duration,
}

impl PendingAnalysis {
    pub async fn wait(self) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DeepGuardError::Mount(
                "capture widget closed without reporting completion".into()
            )),
            Err(_) => Err(DeepGuardError::Mount(format!(
                "analysis did not complete within {}s", self.timeout.as_secs()
            ))),
        }
    }
}

pub struct DetectorAdapter {
    factory: Box<dyn WidgetFactory>,
    region: String,
    completion_timeout: Duration,
    mounted: Option<Box<dyn CaptureWidget>>,
}

impl DetectorAdapter {
    pub fn new(factory: Box<dyn WidgetFactory>, region: impl Into<String>, completion_timeout: Duration) -> Self {
        Self {
            factory,
            region: region.into(),
            completion_timeout,
            mounted: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// Mounts a fresh widget for `session` into `container`.
    ///
    /// `container` is `None` when the page has no matching region.
    pub fn mount(&mut self, container: Option<Container>, session: &Session) -> Result<PendingAnalysis> {
        let container = container.ok_or_else(|| {
            DeepGuardError::Mount("container element not found".into())
        })?;

        let (tx, rx) = oneshot::channel();
        let options = WidgetOptions {
            session_id: session.id().to_string(),
            region: self.region.clone(),
            on_analysis_complete: CompletionNotifier { tx },
        };

        let mut widget = self.factory.create(options)
            .map_err(|e| DeepGuardError::Mount(format!("widget initialization failed: {}", e)))?;

        widget.mount(&container)
            .map_err(|e| DeepGuardError::Mount(format!("mount into '{}' failed: {}", container.id(), e)))?;

        tracing::debug!("Detector mounted into '{}' for session {}", container.id(), session.id());
        self.mounted = Some(widget);

        Ok(PendingAnalysis {
            rx,
            timeout: self.completion_timeout,
        })
    }

    pub fn unmount(&mut self) {
        self.mounted = None;
    }
}

/// Widget that reports completion after a fixed delay, for dev runs.
pub struct SimulatedWidgetFactory {
    delay: Duration,
}

impl SimulatedWidgetFactory {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

struct SimulatedCaptureWidget {
    session_id: String,
    delay: Duration,
    notifier: Option<CompletionNotifier>,
}

impl CaptureWidget for SimulatedCaptureWidget {
    fn mount(&mut self, container: &Container) -> std::result::Result<(), String> {
        let notifier = self.notifier.take()
            .ok_or_else(|| "widget is already mounted".to_string())?;

        tracing::info!(
            "Simulated capture for session {} in '{}' ({} ms)",
            self.session_id, container.id(), self.delay.as_millis()
        );

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            notifier.notify();
        });
        Ok(())
    }
}

impl WidgetFactory for SimulatedWidgetFactory {
    fn create(&self, options: WidgetOptions) -> std::result::Result<Box<dyn CaptureWidget>, String> {
        Ok(Box::new(SimulatedCaptureWidget {
            session_id: options.session_id,
            delay: self.delay,
            notifier: Some(options.on_analysis_complete),
        }))
    }
}
