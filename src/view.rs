use crate::selection::{AlertId, AlertStatus, BulkControls};
use async_trait::async_trait;
use std::time::Duration;

pub mod terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Warning => write!(f, "warning"),
            NotificationKind::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Everything the controller shows to the operator
#[async_trait]
pub trait AlertView: Send + Sync {
    /// Ask the operator to confirm an operation
    async fn confirm(&self, prompt: &str) -> bool;

    fn show_loading(&self, message: &str);

    fn hide_loading(&self);

    fn notify(&self, notification: Notification);

    fn set_bulk_controls(&self, controls: &BulkControls);

    /// Update one alert's status indicator in place
    fn set_alert_status(&self, id: &AlertId, status: AlertStatus);

    /// Reload the view with server state once `delay` has passed
    fn schedule_refresh(&self, delay: Duration);
}
