use crate::metrics::{Status, Timer};
use metrics::{counter, describe_counter, describe_histogram};

/// Register the metrics for the application
pub(super) fn register_metrics() {
    // Count of failed alert service requests. Labeled with the endpoint.
    describe_counter!(
        "alert_service_failures_total",
        "Total number of failed alert service requests"
    );

    // Latency of alert service requests, labeled by endpoint and status (success or failure).
    describe_histogram!(
        "alert_service_request_duration_seconds",
        "Duration of alert service requests in seconds"
    );
}

/// Record a failed request to a given endpoint
pub fn record_failure(endpoint: Endpoint) {
    counter!("alert_service_failures_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Create a timer for a request to a given endpoint
pub fn request_timer(endpoint: Endpoint) -> RequestTimer {
    RequestTimer {
        endpoint,
        timer: Some(
            Timer::new("alert_service_request_duration_seconds")
                .with_label("endpoint", endpoint.to_string()),
        ),
    }
}

/// Timer that also counts failures once the request status is known
pub struct RequestTimer {
    endpoint: Endpoint,
    timer: Option<Timer>,
}

impl RequestTimer {
    pub fn finish(mut self, status: Status) {
        if let Status::Failure = status {
            record_failure(self.endpoint);
        }

        if let Some(mut timer) = self.timer.take() {
            timer.set_label("status", status.to_string());
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        // Dropped without finishing: the request future was cancelled
        if let Some(mut timer) = self.timer.take() {
            timer.set_label("status", "cancelled");
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Endpoint {
    List,
    Bulk,
    Status,
    Delete,
    Detail,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::List => write!(f, "list"),
            Endpoint::Bulk => write!(f, "bulk"),
            Endpoint::Status => write!(f, "status"),
            Endpoint::Delete => write!(f, "delete"),
            Endpoint::Detail => write!(f, "detail"),
        }
    }
}
