use crate::{
    page::AlertPage,
    selection::{AlertId, AlertStatus, BulkControls},
    view::{AlertView, Notification, NotificationKind},
};
use async_trait::async_trait;
use std::{
    io::{BufRead, Write},
    sync::{Mutex, PoisonError},
    time::Duration,
};

/// Prints to the terminal and reads confirmations from stdin
pub struct TerminalView {
    assume_yes: bool,
    pending_refresh: Mutex<Option<Duration>>,
}

impl TerminalView {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            pending_refresh: Mutex::new(None),
        }
    }

    /// Take the refresh requested by the last operation, if any
    pub fn take_pending_refresh(&self) -> Option<Duration> {
        self.pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn print_page(&self, page: &AlertPage) {
        if page.alerts.is_empty() {
            println!("No alerts.");
            return;
        }

        for alert in &page.alerts {
            let status = alert
                .status
                .map(|status| status.to_string())
                .unwrap_or_else(|| "-".to_string());

            println!(
                "{:>6}  {:<9} {}",
                alert.id,
                status,
                alert.title.as_deref().unwrap_or("")
            );
        }

        println!("{} alerts, {} unread", page.alerts.len(), page.unread());
    }
}

#[async_trait]
impl AlertView for TerminalView {
    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            tracing::info!("Confirmed without asking: {}", prompt);
            return true;
        }

        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            print!("{prompt} [y/N] ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok::<_, std::io::Error>(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "si"),
            Ok(Err(e)) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }

    fn show_loading(&self, message: &str) {
        println!("{message}");
    }

    fn hide_loading(&self) {}

    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => {
                println!("{}", notification.message)
            }
            NotificationKind::Warning | NotificationKind::Error => {
                eprintln!("{}: {}", notification.kind, notification.message)
            }
        }
    }

    fn set_bulk_controls(&self, controls: &BulkControls) {
        tracing::debug!(
            enabled = controls.enabled,
            "{} / {}",
            controls.read_label,
            controls.resolved_label
        );
    }

    fn set_alert_status(&self, id: &AlertId, status: AlertStatus) {
        println!("{:>6}  {}", id, status);
    }

    fn schedule_refresh(&self, delay: Duration) {
        *self
            .pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }
}
