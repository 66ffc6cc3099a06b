use crate::{
    config::Config,
    metrics,
    page::{AlertPage, PageQuery},
    selection::AlertId,
    service::AlertService,
};
use std::{collections::HashSet, time::Duration};

/// Reloads the alert list periodically and reports what changed
pub struct Watcher {
    service: AlertService,
    query: PageQuery,
    interval: Duration,
    seen: Option<HashSet<AlertId>>,
}

impl Watcher {
    /// Create a new Watcher instance
    pub fn new(config: &Config, query: PageQuery, interval: Duration) -> anyhow::Result<Self> {
        let service = AlertService::new(config.service.clone(), config.endpoints.clone())?;

        Ok(Self {
            service,
            query,
            interval,
            seen: None,
        })
    }

    /// Start the refresh loop
    pub async fn start(mut self) -> anyhow::Result<()> {
        tracing::info!("Watching alerts every {:?}", self.interval);

        loop {
            if let Err(e) = self.refresh().await {
                tracing::error!("Alert refresh failed: {}", e);
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    #[tracing::instrument(skip(self))]
    async fn refresh(&mut self) -> anyhow::Result<()> {
        let page = self.service.fetch_page(&self.query).await?;
        metrics::record_page(page.alerts.len(), page.unread());

        for alert in self.arrivals(&page) {
            tracing::info!(
                "New alert '{}': {}",
                alert,
                page.alerts
                    .iter()
                    .find(|rendered| &rendered.id == alert)
                    .and_then(|rendered| rendered.title.as_deref())
                    .unwrap_or("untitled")
            );
        }

        tracing::info!(
            "{} alerts rendered, {} unread",
            page.alerts.len(),
            page.unread()
        );

        Ok(())
    }

    /// Alerts that were not on the previous page; nothing on the first load
    fn arrivals<'a>(&mut self, page: &'a AlertPage) -> Vec<&'a AlertId> {
        let current: HashSet<AlertId> = page.ids().into_iter().collect();

        let arrivals = match &self.seen {
            Some(seen) => page
                .alerts
                .iter()
                .map(|alert| &alert.id)
                .filter(|id| !seen.contains(*id))
                .collect(),
            None => Vec::new(),
        };

        self.seen = Some(current);
        arrivals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoints, Service};

    fn watcher() -> Watcher {
        let service = Service::new(
            "http://localhost:8000".into(),
            None,
            None,
            false,
            Duration::from_secs(1),
        )
        .unwrap();

        Watcher {
            service: AlertService::new(service, Endpoints::default()).unwrap(),
            query: PageQuery::default(),
            interval: Duration::from_secs(30),
            seen: None,
        }
    }

    fn page(ids: &[&str]) -> AlertPage {
        let body: String = ids
            .iter()
            .map(|id| format!(r#"<input class="alert-checkbox" value="{id}">"#))
            .collect();

        AlertPage::parse(&body).unwrap()
    }

    #[test]
    fn first_load_reports_no_arrivals() {
        let mut watcher = watcher();
        let first = page(&["1", "2"]);

        assert!(watcher.arrivals(&first).is_empty());
    }

    #[test]
    fn later_loads_report_only_new_alerts() {
        let mut watcher = watcher();
        watcher.arrivals(&page(&["1", "2"]));

        let second = page(&["2", "3", "4"]);
        assert_eq!(
            watcher.arrivals(&second),
            vec![&AlertId::from("3"), &AlertId::from("4")]
        );

        let third = page(&["3", "4"]);
        assert!(watcher.arrivals(&third).is_empty());
    }
}
