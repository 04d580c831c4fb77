use crate::core::detector::{CaptureWidget, CompletionNotifier, Container, WidgetFactory, WidgetOptions};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, BufRead};

/// Fills `{session_id}` and `{region}` in a hosted capture URL template.
pub fn render_capture_url(template: &str, session_id: &str, region: &str) -> String {
    template
        .replace("{session_id}", session_id)
        .replace("{region}", region)
}

/// Hands the capture off to the hosted liveness page and waits for the
/// operator to confirm it finished.
pub struct HostedCaptureFactory {
    url_template: String,
}

impl HostedCaptureFactory {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self { url_template: url_template.into() }
    }
}

struct HostedCaptureWidget {
    capture_url: String,
    notifier: Option<CompletionNotifier>,
}

impl CaptureWidget for HostedCaptureWidget {
    fn mount(&mut self, container: &Container) -> Result<(), String> {
        let notifier = self.notifier.take()
            .ok_or_else(|| "widget is already mounted".to_string())?;

        execute!(
            io::stdout(),
            SetForegroundColor(Color::Cyan),
            Print(format!("\n📷 [{}] Open this link to complete the liveness check:\n", container.id())),
            Print(format!("   {}\n", self.capture_url)),
            ResetColor,
            Print("   Press Enter once the capture has finished...\n"),
        )
        .map_err(|e| format!("terminal unavailable: {}", e))?;

        tokio::task::spawn_blocking(move || {
            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                // EOF means nobody will ever confirm; dropping the notifier fails the wait
                Ok(0) => tracing::warn!("stdin closed before capture was confirmed"),
                Ok(_) => notifier.notify(),
                Err(e) => tracing::error!("Failed to read confirmation: {}", e),
            }
        });
        Ok(())
    }
}

impl WidgetFactory for HostedCaptureFactory {
    fn create(&self, options: WidgetOptions) -> Result<Box<dyn CaptureWidget>, String> {
        if !self.url_template.contains("{session_id}") {
            return Err("capture_url must contain a {session_id} placeholder".into());
        }

        Ok(Box::new(HostedCaptureWidget {
            capture_url: render_capture_url(&self.url_template, &options.session_id, &options.region),
            notifier: Some(options.on_analysis_complete),
        }))
    }
}
