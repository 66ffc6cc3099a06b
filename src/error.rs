use crate::selection::AlertId;
use std::time::Duration;

/// Everything that can end an alert operation without the server confirming it
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("no alerts selected")]
    EmptySelection,

    #[error("operation declined")]
    Declined,

    #[error("another alert update is already in progress")]
    Busy,

    #[error("alert '{0}' is not rendered on the current page")]
    NotRendered(AlertId),

    #[error("alert service rejected the request: {0}")]
    Rejected(String),

    #[error("request to the alert service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("alert service answered HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response from the alert service: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("alert service did not respond within {0:?}")]
    Timeout(Duration),

    #[error("request aborted")]
    Aborted,
}

impl AlertError {
    /// Errors where the server never gave an application-level answer
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AlertError::Transport(_)
                | AlertError::Status(_)
                | AlertError::Decode(_)
                | AlertError::Timeout(_)
                | AlertError::Aborted
        )
    }

    /// Short label used for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            AlertError::EmptySelection | AlertError::NotRendered(_) => "invalid",
            AlertError::Declined => "declined",
            AlertError::Busy => "busy",
            AlertError::Rejected(_) => "rejected",
            AlertError::Timeout(_) => "timeout",
            AlertError::Aborted => "aborted",
            AlertError::Transport(_) | AlertError::Status(_) | AlertError::Decode(_) => {
                "transport"
            }
        }
    }
}
