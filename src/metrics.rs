use metrics::{counter, describe_counter, describe_gauge, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Instant;

pub mod external;
pub mod http;

pub static METRICS_HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

/// Register the metrics for the application
pub fn register_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    METRICS_HANDLE
        .set(Some(handle))
        .map_err(|_| anyhow::anyhow!("Metrics handle already set"))?;

    describe_gauge!("alerts_rendered", "Number of alerts on the last loaded page");
    describe_gauge!("alerts_unread", "Number of active unread alerts on the last loaded page");

    describe_counter!(
        "alert_submissions_total",
        "Total number of alert submissions, labeled by scope, action and outcome"
    );

    describe_gauge!(
        "build_info",
        "Build information of the application, labeled by version"
    );
    gauge!("build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    external::register_metrics();
    http::register_metrics();

    Ok(())
}

/// Record the alert counts of a freshly loaded page
pub fn record_page(rendered: usize, unread: usize) {
    gauge!("alerts_rendered").set(rendered as f64);
    gauge!("alerts_unread").set(unread as f64);
}

/// Record the outcome of a submission (scope is "bulk" or "single")
pub fn record_submission(scope: &str, action: &str, outcome: &str) {
    counter!(
        "alert_submissions_total",
        "scope" => scope.to_string(),
        "action" => action.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[derive(Debug, Clone, Copy)]
pub enum Status {
    Success,
    Failure,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Failure => write!(f, "failure"),
        }
    }
}

/// Records its lifetime into a histogram when dropped
pub struct Timer {
    metric_name: &'static str,
    start_time: Instant,
    labels: Vec<(String, String)>,
}

impl Timer {
    /// Create a new timer
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            metric_name,
            start_time: Instant::now(),
            labels: Vec::new(),
        }
    }

    /// Add a label to the timer
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    /// Add a label once the result is known
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.push((key.into(), value.into()));
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start_time.elapsed().as_secs_f64();

        if self.labels.is_empty() {
            histogram!(self.metric_name).record(duration);
        } else {
            let labels: Vec<_> = self
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            histogram!(self.metric_name, &labels).record(duration);
        }
    }
}
