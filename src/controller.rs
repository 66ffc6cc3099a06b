use crate::{
    error::AlertError,
    metrics,
    page::RenderedAlert,
    selection::{AlertId, AlertStatus, BulkControls, Selection, StatusAction},
    service::{
        AlertApi,
        wire::{BulkRequest, StatusResponse, Targets},
    },
    view::{AlertView, Notification},
};
use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Delay between a success notification and the refresh of the view
    pub refresh_delay: Duration,
    /// Upper bound for any single request
    pub request_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Confirming,
    Submitting,
    /// A change succeeded and the view has not been reloaded yet
    PendingRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    pub action: StatusAction,
    /// Number of alerts the server reports as changed
    pub count: u64,
}

struct State {
    phase: Phase,
    selection: Selection,
    statuses: HashMap<AlertId, Option<AlertStatus>>,
    in_flight: Option<CancellationToken>,
    fetching: Option<CancellationToken>,
}

impl State {
    fn load(&mut self, alerts: Vec<RenderedAlert>) {
        self.selection = Selection::new(alerts.iter().map(|alert| alert.id.clone()));
        self.statuses = alerts
            .into_iter()
            .map(|alert| (alert.id, alert.status))
            .collect();
    }
}

/// Owns the selection of one page view and drives its status changes
///
/// Only one operation may be confirming or in flight at a time.
pub struct AlertController<A: AlertApi, V: AlertView> {
    api: A,
    view: V,
    settings: ControllerSettings,
    state: Mutex<State>,
}

impl<A: AlertApi, V: AlertView> AlertController<A, V> {
    pub fn new(api: A, view: V, alerts: Vec<RenderedAlert>, settings: ControllerSettings) -> Self {
        let mut state = State {
            phase: Phase::Idle,
            selection: Selection::default(),
            statuses: HashMap::new(),
            in_flight: None,
            fetching: None,
        };
        state.load(alerts);

        let controller = Self {
            api,
            view,
            settings,
            state: Mutex::new(state),
        };
        controller.publish_controls();
        controller
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn selected(&self) -> Vec<AlertId> {
        self.state().selection.selected()
    }

    pub fn rendered(&self) -> Vec<AlertId> {
        self.state().selection.rendered().to_vec()
    }

    pub fn status(&self, id: &AlertId) -> Option<AlertStatus> {
        self.state().statuses.get(id).copied().flatten()
    }

    pub fn controls(&self) -> BulkControls {
        let state = self.state();
        let locked = matches!(state.phase, Phase::Submitting | Phase::PendingRefresh);
        BulkControls::derive(state.selection.len(), locked)
    }

    pub fn toggle_all(&self, checked: bool) {
        self.state().selection.toggle_all(checked);
        self.publish_controls();
    }

    /// Returns false when the alert is not rendered on this page
    pub fn toggle_one(&self, id: &AlertId, checked: bool) -> bool {
        let accepted = self.state().selection.toggle_one(id, checked);

        if accepted {
            self.publish_controls();
        } else {
            tracing::warn!("Ignoring selection of alert '{}' which is not rendered", id);
        }

        accepted
    }

    /// Replace the rendered alerts with a freshly loaded page
    pub fn reload(&self, alerts: Vec<RenderedAlert>) {
        tracing::debug!("Reloading controller with {} alerts", alerts.len());

        {
            let mut state = self.state();
            state.load(alerts);
            if state.phase == Phase::PendingRefresh {
                state.phase = Phase::Idle;
            }
        }
        self.publish_controls();
    }

    /// Cancel the requests in flight, if any
    pub fn abort(&self) -> bool {
        let state = self.state();
        let mut aborted = false;

        for token in state.in_flight.iter().chain(state.fetching.iter()) {
            tracing::info!("Aborting alert request in flight");
            token.cancel();
            aborted = true;
        }

        aborted
    }

    /// Submit a bulk change for the current selection
    pub async fn submit_selection(&self, action: StatusAction) -> Result<BulkOutcome, AlertError> {
        let targets = Targets::Selected(self.selected());
        self.submit_bulk(action, targets).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn submit_bulk(
        &self,
        action: StatusAction,
        targets: Targets,
    ) -> Result<BulkOutcome, AlertError> {
        let result = self.run_bulk(action, targets).await;
        record("bulk", &action.to_string(), &result);
        result
    }

    async fn run_bulk(
        &self,
        action: StatusAction,
        targets: Targets,
    ) -> Result<BulkOutcome, AlertError> {
        let targets = match targets {
            Targets::Selected(ids) => Targets::Selected(self.rendered_targets(ids)?),
            Targets::All => Targets::All,
        };

        if targets.is_empty() {
            self.view
                .notify(Notification::warning("Select at least one alert first"));
            return Err(AlertError::EmptySelection);
        }

        let guard = self.begin()?;

        let prompt = match targets.count() {
            Some(count) => format!("Mark {count} {} as {action}?", alerts(count as u64)),
            None => format!("Mark all alerts as {action}?"),
        };
        if !self.view.confirm(&prompt).await {
            tracing::info!("Bulk update declined");
            return Err(AlertError::Declined);
        }

        let token = guard.submitting();
        self.view.show_loading(action.loading_message());

        let request = BulkRequest::new(action, targets);
        let result = self.bounded(&token, self.api.bulk_update(&request)).await;

        self.view.hide_loading();

        match result {
            Ok(response) if response.success => {
                guard.pending_refresh();

                let fallback = request.targets.count().unwrap_or_default() as u64;
                let count = response.count.unwrap_or(fallback);

                tracing::info!("Marked {} alerts as {}", count, action);
                self.view.notify(Notification::success(format!(
                    "{count} {} marked as {action}",
                    alerts(count)
                )));
                self.view.schedule_refresh(self.settings.refresh_delay);

                Ok(BulkOutcome { action, count })
            }
            Ok(response) => {
                drop(guard);
                Err(self.rejected(response.error, "Error updating alerts"))
            }
            Err(e) => {
                drop(guard);
                Err(self.failed(e))
            }
        }
    }

    /// Change the status of one alert and update its indicator in place
    #[tracing::instrument(skip(self))]
    pub async fn mark_one(&self, id: &AlertId, action: StatusAction) -> Result<(), AlertError> {
        let result = self.run_mark_one(id, action).await;
        record("single", &action.to_string(), &result);
        result
    }

    async fn run_mark_one(&self, id: &AlertId, action: StatusAction) -> Result<(), AlertError> {
        self.ensure_rendered(id)?;
        let guard = self.begin()?;

        if !self
            .view
            .confirm(&format!("Mark alert {id} as {action}?"))
            .await
        {
            return Err(AlertError::Declined);
        }

        let token = guard.submitting();
        self.view.show_loading(action.loading_message());

        let result = self
            .bounded(&token, self.api.update_status(id, action))
            .await;

        self.view.hide_loading();
        drop(guard);

        self.settle(result, "Error updating alert")?;

        let status = action.resulting_status();
        self.state().statuses.insert(id.clone(), Some(status));
        self.view.set_alert_status(id, status);
        self.view
            .notify(Notification::success(format!("Alert {id} marked as {action}")));

        Ok(())
    }

    /// Delete one alert, the view is refreshed afterwards
    #[tracing::instrument(skip(self))]
    pub async fn delete_one(&self, id: &AlertId) -> Result<(), AlertError> {
        let result = self.run_delete_one(id).await;
        record("single", "delete", &result);
        result
    }

    async fn run_delete_one(&self, id: &AlertId) -> Result<(), AlertError> {
        self.ensure_rendered(id)?;
        let guard = self.begin()?;

        if !self
            .view
            .confirm(&format!("Delete alert {id}? This cannot be undone."))
            .await
        {
            return Err(AlertError::Declined);
        }

        let token = guard.submitting();
        self.view.show_loading("Deleting alert...");

        let result = self.bounded(&token, self.api.delete(id)).await;

        self.view.hide_loading();

        if let Err(e) = self.settle(result, "Error deleting alert") {
            drop(guard);
            return Err(e);
        }
        guard.pending_refresh();

        self.view
            .notify(Notification::success(format!("Alert {id} deleted")));
        self.view.schedule_refresh(self.settings.refresh_delay);

        Ok(())
    }

    /// Fetch the pre-rendered detail fragment of one alert
    #[tracing::instrument(skip(self))]
    pub async fn detail(&self, id: &AlertId) -> Result<String, AlertError> {
        let token = CancellationToken::new();
        self.state().fetching = Some(token.clone());
        let fetch = FetchGuard { controller: self };

        let result = self.bounded(&token, self.api.detail(id)).await;
        drop(fetch);

        match result {
            Ok(response) if response.success => match response.html {
                Some(html) => Ok(html),
                None => Err(self.detail_failed(AlertError::Rejected(
                    "response carried no details".to_string(),
                ))),
            },
            Ok(response) => Err(self.detail_failed(AlertError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ))),
            Err(e) => Err(self.detail_failed(e)),
        }
    }

    fn detail_failed(&self, error: AlertError) -> AlertError {
        tracing::error!("Failed to load alert details: {}", error);
        self.view
            .notify(Notification::error("Could not load the alert details"));
        error
    }

    /// Drop repeated references and refuse any that are not rendered
    fn rendered_targets(&self, ids: Vec<AlertId>) -> Result<Vec<AlertId>, AlertError> {
        let mut seen = HashSet::new();
        let ids: Vec<AlertId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();

        for id in &ids {
            self.ensure_rendered(id)?;
        }

        Ok(ids)
    }

    fn ensure_rendered(&self, id: &AlertId) -> Result<(), AlertError> {
        let rendered = self.state().selection.is_rendered(id);
        if rendered {
            return Ok(());
        }

        self.view.notify(Notification::warning(format!(
            "Alert {id} is not on the current page"
        )));
        Err(AlertError::NotRendered(id.clone()))
    }

    /// Leave `Idle`, or refuse while another operation is underway
    fn begin(&self) -> Result<PhaseGuard<'_, A, V>, AlertError> {
        {
            let mut state = self.state();
            let phase = state.phase;
            if phase != Phase::Idle {
                drop(state);
                tracing::warn!("Refusing alert update while in phase {:?}", phase);

                let message = match phase {
                    Phase::PendingRefresh => "The alert list is about to refresh",
                    _ => "Another alert update is still in progress",
                };
                self.view.notify(Notification::warning(message));
                return Err(AlertError::Busy);
            }
            state.phase = Phase::Confirming;
        }

        Ok(PhaseGuard {
            controller: self,
            settled: Phase::Idle,
        })
    }

    /// Run a request under the configured timeout and the abort token
    async fn bounded<T>(
        &self,
        token: &CancellationToken,
        request: impl Future<Output = Result<T, AlertError>>,
    ) -> Result<T, AlertError> {
        let limit = self.settings.request_timeout;

        tokio::select! {
            result = tokio::time::timeout(limit, request) => {
                result.unwrap_or_else(|_| Err(AlertError::Timeout(limit)))
            }
            _ = token.cancelled() => Err(AlertError::Aborted),
        }
    }

    fn settle(
        &self,
        result: Result<StatusResponse, AlertError>,
        context: &str,
    ) -> Result<(), AlertError> {
        match result {
            Ok(response) if response.success => Ok(()),
            Ok(response) => Err(self.rejected(response.error, context)),
            Err(e) => Err(self.failed(e)),
        }
    }

    /// Report a `success: false` answer with the server's reason
    fn rejected(&self, reason: Option<String>, context: &str) -> AlertError {
        let reason = reason.unwrap_or_else(|| "unknown error".to_string());

        tracing::warn!("Alert service refused the update: {}", reason);
        self.view
            .notify(Notification::error(format!("{context}: {reason}")));

        AlertError::Rejected(reason)
    }

    /// Report a request that never got an application-level answer
    fn failed(&self, error: AlertError) -> AlertError {
        tracing::error!("Alert request failed: {}", error);

        let notification = match &error {
            AlertError::Timeout(_) => {
                Notification::error("The alert service did not respond in time")
            }
            AlertError::Aborted => Notification::warning("Alert update cancelled"),
            _ => Notification::error("Connection error"),
        };
        self.view.notify(notification);

        error
    }

    fn publish_controls(&self) {
        let controls = self.controls();
        self.view.set_bulk_controls(&controls);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the controller to `Idle` however the operation ends, or to
/// `PendingRefresh` after a change that needs a reload
struct PhaseGuard<'a, A: AlertApi, V: AlertView> {
    controller: &'a AlertController<A, V>,
    settled: Phase,
}

impl<A: AlertApi, V: AlertView> PhaseGuard<'_, A, V> {
    /// Enter `Submitting` and hand out the token that aborts the request
    fn submitting(&self) -> CancellationToken {
        let token = CancellationToken::new();
        {
            let mut state = self.controller.state();
            state.phase = Phase::Submitting;
            state.in_flight = Some(token.clone());
        }

        self.controller.publish_controls();
        token
    }

    /// Keep the controls locked until the view is reloaded
    fn pending_refresh(mut self) {
        self.settled = Phase::PendingRefresh;
    }
}

impl<A: AlertApi, V: AlertView> Drop for PhaseGuard<'_, A, V> {
    fn drop(&mut self) {
        let was_submitting = {
            let mut state = self.controller.state();
            let was_submitting = state.phase == Phase::Submitting;
            state.phase = self.settled;
            state.in_flight = None;
            was_submitting
        };

        if was_submitting {
            self.controller.publish_controls();
        }
    }
}

struct FetchGuard<'a, A: AlertApi, V: AlertView> {
    controller: &'a AlertController<A, V>,
}

impl<A: AlertApi, V: AlertView> Drop for FetchGuard<'_, A, V> {
    fn drop(&mut self) {
        self.controller.state().fetching = None;
    }
}

fn record<T>(scope: &str, action: &str, result: &Result<T, AlertError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.outcome(),
    };
    metrics::record_submission(scope, action, outcome);
}

fn alerts(count: u64) -> &'static str {
    if count == 1 { "alert" } else { "alerts" }
}
