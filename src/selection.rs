use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Opaque reference to a server-side alert record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AlertId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Status indicator rendered next to an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Active,
    Read,
    Resolved,
}

impl AlertStatus {
    /// Parse the page's status attribute
    pub fn from_page(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "activa" | "active" => Some(AlertStatus::Active),
            "leida" | "leída" | "read" => Some(AlertStatus::Read),
            "resuelta" | "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Read => write!(f, "read"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Status change an operator can apply to alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum StatusAction {
    #[serde(rename = "leida")]
    #[value(name = "read")]
    MarkRead,
    #[serde(rename = "resuelta")]
    #[value(name = "resolved")]
    MarkResolved,
}

impl StatusAction {
    /// Status the alert shows once the change is applied
    pub fn resulting_status(self) -> AlertStatus {
        match self {
            StatusAction::MarkRead => AlertStatus::Read,
            StatusAction::MarkResolved => AlertStatus::Resolved,
        }
    }

    pub fn loading_message(self) -> &'static str {
        match self {
            StatusAction::MarkRead => "Marking alerts as read...",
            StatusAction::MarkResolved => "Marking alerts as resolved...",
        }
    }

    fn button_label(self) -> &'static str {
        match self {
            StatusAction::MarkRead => "Mark as read",
            StatusAction::MarkResolved => "Mark as resolved",
        }
    }
}

impl std::fmt::Display for StatusAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resulting_status())
    }
}

/// Enabled flag and labels of the bulk action buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkControls {
    pub enabled: bool,
    pub read_label: String,
    pub resolved_label: String,
}

impl BulkControls {
    pub fn derive(selected: usize, submitting: bool) -> Self {
        let label = |action: StatusAction| match selected {
            0 => action.button_label().to_string(),
            n => format!("{} ({n})", action.button_label()),
        };

        Self {
            enabled: selected > 0 && !submitting,
            read_label: label(StatusAction::MarkRead),
            resolved_label: label(StatusAction::MarkResolved),
        }
    }
}

/// Checkbox state over the alerts currently rendered
///
/// The selected set is always a subset of the rendered references.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    rendered: Vec<AlertId>,
    selected: HashSet<AlertId>,
}

impl Selection {
    pub fn new(rendered: impl IntoIterator<Item = AlertId>) -> Self {
        let mut seen = HashSet::new();
        let rendered = rendered
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Self {
            rendered,
            selected: HashSet::new(),
        }
    }

    pub fn toggle_all(&mut self, checked: bool) {
        if checked {
            self.selected = self.rendered.iter().cloned().collect();
        } else {
            self.selected.clear();
        }
    }

    /// Returns false when the reference is not rendered
    pub fn toggle_one(&mut self, id: &AlertId, checked: bool) -> bool {
        if !self.is_rendered(id) {
            return false;
        }

        if checked {
            self.selected.insert(id.clone());
        } else {
            self.selected.remove(id);
        }

        true
    }

    pub fn is_rendered(&self, id: &AlertId) -> bool {
        self.rendered.contains(id)
    }

    /// Selected references in rendered order
    pub fn selected(&self) -> Vec<AlertId> {
        self.rendered
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    pub fn rendered(&self) -> &[AlertId] {
        &self.rendered
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
