use crate::selection::{AlertId, StatusAction};
use serde::{Deserialize, Serialize, Serializer};

/// Sentinel the bulk endpoint understands as "every active alert"
pub const ALL_ALERTS: &str = "todas";

/// Which alerts a bulk change applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    All,
    Selected(Vec<AlertId>),
}

impl Targets {
    /// Number of explicit targets, `None` for the sentinel
    pub fn count(&self) -> Option<usize> {
        match self {
            Targets::All => None,
            Targets::Selected(ids) => Some(ids.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == Some(0)
    }
}

impl Serialize for Targets {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Targets::All => serializer.serialize_str(ALL_ALERTS),
            Targets::Selected(ids) => ids.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkRequest {
    #[serde(rename = "accion")]
    pub action: StatusAction,
    #[serde(rename = "alertas_ids")]
    pub targets: Targets,
}

impl BulkRequest {
    pub fn new(action: StatusAction, targets: Targets) -> Self {
        Self { action, targets }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    pub success: bool,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Answer of the single-alert endpoints (status change, delete)
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    pub success: bool,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bulk_request_uses_the_masked_endpoint_shape() {
        let request = BulkRequest::new(
            StatusAction::MarkResolved,
            Targets::Selected(vec!["3".into(), "9".into()]),
        );

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "accion": "resuelta", "alertas_ids": ["3", "9"] })
        );
    }

    #[test]
    fn all_targets_serialise_as_the_sentinel() {
        let request = BulkRequest::new(StatusAction::MarkRead, Targets::All);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "accion": "leida", "alertas_ids": "todas" })
        );
    }

    #[test]
    fn failure_response_keeps_the_reason() {
        let response: BulkResponse =
            serde_json::from_str(r#"{"success": false, "error": "Datos incompletos"}"#).unwrap();

        assert!(!response.success);
        assert_eq!(response.count, None);
        assert_eq!(response.error.as_deref(), Some("Datos incompletos"));
    }
}
