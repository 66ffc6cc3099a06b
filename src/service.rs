use crate::{
    config::{Endpoints, Service as ServiceConfig},
    error::AlertError,
    metrics::{
        Status,
        external::{Endpoint, request_timer},
    },
    page::{AlertPage, PageQuery},
    selection::{AlertId, StatusAction},
    service::wire::{BulkRequest, BulkResponse, DetailResponse, StatusResponse},
};
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Url,
    cookie::{CookieStore, Jar},
};
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};

pub mod wire;

const CSRF_HEADER: &str = "X-CSRFToken";
const CSRF_COOKIE: &str = "csrftoken";
const SESSION_COOKIE: &str = "sessionid";

/// The external alert service as seen by the controller
#[async_trait]
pub trait AlertApi: Send + Sync {
    /// Apply one status change to many alerts
    async fn bulk_update(&self, request: &BulkRequest) -> Result<BulkResponse, AlertError>;

    /// Apply one status change to a single alert
    async fn update_status(
        &self,
        id: &AlertId,
        action: StatusAction,
    ) -> Result<StatusResponse, AlertError>;

    async fn delete(&self, id: &AlertId) -> Result<StatusResponse, AlertError>;

    async fn detail(&self, id: &AlertId) -> Result<DetailResponse, AlertError>;
}

pub struct AlertService {
    config: ServiceConfig,
    endpoints: Endpoints,
    origin: Url,
    jar: Arc<Jar>,
    client: Client,
    csrf_token: RwLock<Option<String>>,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(config: ServiceConfig, endpoints: Endpoints) -> anyhow::Result<Self> {
        let origin = Url::parse(&config.url)?;
        let jar = Arc::new(Jar::default());

        if let Some(session_id) = &config.session_id {
            jar.add_cookie_str(&format!("{SESSION_COOKIE}={session_id}; Path=/"), &origin);
        }

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            endpoints,
            origin,
            jar,
            client,
            csrf_token: RwLock::new(None),
        })
    }

    /// Load the alert list page and remember its anti-forgery token
    #[tracing::instrument(skip(self))]
    pub async fn fetch_page(&self, query: &PageQuery) -> anyhow::Result<AlertPage> {
        tracing::info!("Fetching alert list");
        let timer = request_timer(Endpoint::List);

        let response = self
            .client
            .get(self.url(&self.endpoints.list))
            .query(&query.params())
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                timer.finish(Status::Failure);
                return Err(anyhow::anyhow!(
                    "Failed to fetch alert list: HTTP {}",
                    response.status()
                ));
            }
            Err(e) => {
                timer.finish(Status::Failure);
                return Err(e.into());
            }
        };

        let body = response.text().await?;
        timer.finish(Status::Success);

        let page = AlertPage::parse(&body)?;
        if let Some(token) = &page.csrf_token {
            *self
                .csrf_token
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        }

        tracing::info!("Fetched {} alerts", page.alerts.len());

        Ok(page)
    }

    /// Anti-forgery token from the last page, falling back to the cookie
    pub fn csrf_token(&self) -> Option<String> {
        let from_page = self
            .csrf_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        from_page.or_else(|| self.cookie(CSRF_COOKIE))
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        let header = header.to_str().ok()?;

        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url, path)
    }

    fn alert_url(&self, template: &str, id: &AlertId) -> String {
        self.url(&template.replace("{id}", id.as_str()))
    }

    /// Attach the headers every mutating request needs
    fn protect(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::REFERER, format!("{}/", self.config.url));

        match self.csrf_token() {
            Some(token) => request.header(CSRF_HEADER, token),
            None => {
                tracing::warn!("No anti-forgery token available, the request may be refused");
                request
            }
        }
    }

    /// Send a request and record how it went
    async fn exchange<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
    ) -> Result<T, AlertError> {
        let timer = request_timer(endpoint);
        let result = send_json(endpoint, request).await;

        timer.finish(match &result {
            Ok(_) => Status::Success,
            Err(_) => Status::Failure,
        });

        result
    }
}

/// Send a request and decode its JSON answer
///
/// Non-2xx answers are decoded too when they carry a JSON body.
async fn send_json<T: DeserializeOwned>(
    endpoint: Endpoint,
    request: RequestBuilder,
) -> Result<T, AlertError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(serde_json::from_str(&body)?);
    }

    tracing::warn!("Alert service answered HTTP {} on {}", status, endpoint);
    serde_json::from_str(&body).map_err(|_| AlertError::Status(status))
}

#[async_trait]
impl AlertApi for AlertService {
    #[tracing::instrument(skip(self))]
    async fn bulk_update(&self, request: &BulkRequest) -> Result<BulkResponse, AlertError> {
        tracing::info!("Sending bulk alert update");

        let builder = self.protect(self.client.post(self.url(&self.endpoints.bulk)).json(request));
        self.exchange(Endpoint::Bulk, builder).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        id: &AlertId,
        action: StatusAction,
    ) -> Result<StatusResponse, AlertError> {
        let template = match action {
            StatusAction::MarkRead => &self.endpoints.mark_read,
            StatusAction::MarkResolved => &self.endpoints.mark_resolved,
        };

        let builder = self.protect(self.client.post(self.alert_url(template, id)));
        self.exchange(Endpoint::Status, builder).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &AlertId) -> Result<StatusResponse, AlertError> {
        let builder = self.protect(
            self.client
                .delete(self.alert_url(&self.endpoints.delete, id)),
        );
        self.exchange(Endpoint::Delete, builder).await
    }

    #[tracing::instrument(skip(self))]
    async fn detail(&self, id: &AlertId) -> Result<DetailResponse, AlertError> {
        let builder = self.client.get(self.alert_url(&self.endpoints.detail, id));
        self.exchange(Endpoint::Detail, builder).await
    }
}
