use crate::controller::ControllerSettings;
use anyhow::Result;
use serde::Deserialize;
use std::{path::Path, time::Duration};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub service: Service,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub controller: Controller,
    #[serde(default)]
    pub http: Http,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from {}", path.display());

        let config = std::fs::read_to_string(path)?;
        Self::from_yaml(&config)
    }

    pub fn from_yaml(config: &str) -> Result<Self> {
        Ok(serde_norway::from_str(config)?)
    }
}

/// Connection to the alert service
#[derive(Debug, Clone)]
pub struct Service {
    pub url: String,
    pub session_id: Option<String>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl Service {
    /// Create a new Service instance, resolving the session id from an environment variable if needed
    pub fn new(
        url: String,
        session_id: Option<String>,
        session_id_from: Option<String>,
        insecure: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let session_id = match (session_id, session_id_from) {
            (Some(session_id), _) => Some(session_id),
            (None, Some(variable)) => Some(std::env::var(&variable).map_err(|e| {
                anyhow::anyhow!("Failed to read session id from '{}': {}", variable, e)
            })?),
            (None, None) => None,
        };

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            session_id,
            insecure,
            timeout,
        })
    }
}

impl<'de> Deserialize<'de> for Service {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ServiceRaw {
            url: String,
            #[serde(rename = "sessionId")]
            session_id: Option<String>,
            #[serde(rename = "sessionIdFrom")]
            session_id_from: Option<String>,
            #[serde(default)]
            insecure: Option<bool>,
            #[serde(rename = "timeoutSeconds", default)]
            timeout_seconds: Option<u64>,
        }

        let raw = ServiceRaw::deserialize(deserializer)?;
        Service::new(
            raw.url,
            raw.session_id,
            raw.session_id_from,
            raw.insecure.unwrap_or(false),
            Duration::from_secs(raw.timeout_seconds.unwrap_or(15)),
        )
        .map_err(serde::de::Error::custom)
    }
}

/// Paths of the alert service, `{id}` is replaced by the alert reference
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Endpoints {
    pub list: String,
    pub bulk: String,
    #[serde(rename = "markRead")]
    pub mark_read: String,
    #[serde(rename = "markResolved")]
    pub mark_resolved: String,
    pub delete: String,
    pub detail: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            list: "/aves/alertas/".to_string(),
            bulk: "/aves/alertas/marcar-masivo/".to_string(),
            mark_read: "/aves/alertas/{id}/marcar-leida/".to_string(),
            mark_resolved: "/aves/alertas/{id}/marcar-resuelta/".to_string(),
            delete: "/aves/alertas/{id}/eliminar/".to_string(),
            detail: "/aves/alertas/{id}/detalle/".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Controller {
    /// Delay before the view is refreshed after a successful change
    #[serde(rename = "refreshDelayMs")]
    pub refresh_delay_ms: u64,
    /// Upper bound for a single request issued by the controller
    #[serde(rename = "requestTimeoutSeconds")]
    pub request_timeout_seconds: u64,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            refresh_delay_ms: 1000,
            request_timeout_seconds: 30,
        }
    }
}

impl Controller {
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            refresh_delay: Duration::from_millis(self.refresh_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Http {
    pub host: String,
    pub port: u16,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9184,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_yaml("service:\n  url: https://granja.example.com/\n").unwrap();

        assert_eq!(config.service.url, "https://granja.example.com");
        assert_eq!(config.service.session_id, None);
        assert!(!config.service.insecure);
        assert_eq!(config.service.timeout, Duration::from_secs(15));
        assert_eq!(config.endpoints.bulk, "/aves/alertas/marcar-masivo/");
        assert_eq!(config.controller.settings().refresh_delay, Duration::from_secs(1));
        assert_eq!(config.controller.settings().request_timeout, Duration::from_secs(30));
        assert_eq!(config.http.port, 9184);
    }

    #[test]
    fn full_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
service:
  url: http://localhost:8000
  sessionId: abc
  insecure: true
  timeoutSeconds: 5
endpoints:
  bulk: /alertas/bulk/
controller:
  refreshDelayMs: 250
  requestTimeoutSeconds: 3
http:
  host: 127.0.0.1
  port: 9000
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.service.session_id.as_deref(), Some("abc"));
        assert!(config.service.insecure);
        assert_eq!(config.service.timeout, Duration::from_secs(5));
        assert_eq!(config.endpoints.bulk, "/alertas/bulk/");
        assert_eq!(config.endpoints.list, "/aves/alertas/");
        assert_eq!(config.controller.settings().refresh_delay, Duration::from_millis(250));
        assert_eq!(config.controller.settings().request_timeout, Duration::from_secs(3));
        assert_eq!(config.http.host, "127.0.0.1");
    }

    #[test]
    fn session_id_from_missing_variable_fails() {
        let yaml = "service:\n  url: http://localhost\n  sessionIdFrom: AVES_ALERT_CENTER_TEST_UNSET_VARIABLE\n";

        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn inline_session_id_wins_over_variable() {
        let service = Service::new(
            "http://localhost".into(),
            Some("inline".into()),
            Some("AVES_ALERT_CENTER_TEST_UNSET_VARIABLE".into()),
            false,
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(service.session_id.as_deref(), Some("inline"));
    }
}
