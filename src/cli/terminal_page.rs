use crate::core::alerts::{AlertColor, AlertId, AlertView};
use crate::core::page::Page;
use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::Mutex;

fn terminal_color(color: AlertColor) -> Color {
    match color {
        AlertColor::Red => Color::Red,
        AlertColor::Yellow => Color::Yellow,
        AlertColor::Blue => Color::Blue,
        AlertColor::Grey => Color::Grey,
    }
}

/// Renders the page to stdout. Alerts scroll rather than disappear, so a
/// dismissal only drops the alert from the active set.
pub struct TerminalPage {
    regions: BTreeSet<String>,
    active: Mutex<BTreeSet<AlertId>>,
}

impl TerminalPage {
    pub fn new<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            regions: regions.into_iter().map(Into::into).collect(),
            active: Mutex::new(BTreeSet::new()),
        }
    }

    fn print_styled(&self, color: Option<Color>, bold: bool, line: &str) {
        let mut stdout = io::stdout();
        if let Some(color) = color {
            execute!(stdout, SetForegroundColor(color)).ok();
        }
        if bold {
            execute!(stdout, SetAttribute(Attribute::Bold)).ok();
        }
        execute!(stdout, Print(line), Print("\n"), SetAttribute(Attribute::Reset), ResetColor).ok();
        stdout.flush().ok();
    }
}

impl Page for TerminalPage {
    fn has_region(&self, region_id: &str) -> bool {
        self.regions.contains(region_id)
    }

    fn append_alert(&self, alert: &AlertView) {
        if let Ok(mut active) = self.active.lock() {
            active.insert(alert.id);
        }
        self.print_styled(
            Some(terminal_color(alert.color)),
            true,
            &format!("{} {}", alert.icon, alert.text),
        );
    }

    fn remove_alert(&self, id: AlertId) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&id);
        }
        tracing::debug!("Alert #{} dismissed", id);
    }

    fn active_alerts(&self) -> Vec<AlertId> {
        self.active.lock().map(|a| a.iter().copied().collect()).unwrap_or_default()
    }

    fn set_result_text(&self, text: &str) {
        self.print_styled(None, true, text);
    }

    fn show_sign_out(&self, label: &str) {
        self.print_styled(
            Some(Color::DarkGrey),
            false,
            &format!("Signed in as {} (sign out with: deepguard sign-out)", label),
        );
    }

    fn hide_sign_out(&self) {
        self.print_styled(Some(Color::DarkGrey), false, "Signed out");
    }

    fn redirect(&self, destination: &str) {
        self.print_styled(
            Some(Color::Yellow),
            false,
            &format!(
                "Not signed in. Sign in at {} or run: deepguard sign-in --email <address>",
                destination
            ),
        );
    }

    fn show_message(&self, message: &str) {
        self.print_styled(None, false, message);
    }
}
