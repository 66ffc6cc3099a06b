#![allow(dead_code)]

use async_trait::async_trait;
use aves_alert_center::{
    controller::{AlertController, ControllerSettings},
    error::AlertError,
    page::RenderedAlert,
    selection::{AlertId, AlertStatus, BulkControls, StatusAction},
    service::{
        AlertApi,
        wire::{BulkRequest, BulkResponse, DetailResponse, StatusResponse},
    },
    view::{AlertView, Notification, NotificationKind},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Confirm(String),
    ShowLoading(String),
    HideLoading,
    Notify(Notification),
    Controls(BulkControls),
    Status(AlertId, AlertStatus),
    Refresh(Duration),
}

/// View that records everything and answers confirmations with a fixed value
pub struct RecordingView {
    answer: bool,
    events: Mutex<Vec<Event>>,
}

impl RecordingView {
    pub fn confirming() -> Self {
        Self {
            answer: true,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            answer: false,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Notify(notification) => Some(notification),
                _ => None,
            })
            .collect()
    }

    pub fn last_notification(&self, kind: NotificationKind) -> Option<String> {
        self.notifications()
            .into_iter()
            .filter(|notification| notification.kind == kind)
            .map(|notification| notification.message)
            .last()
    }

    pub fn refreshes(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Refresh(delay) => Some(delay),
                _ => None,
            })
            .collect()
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Confirm(prompt) => Some(prompt),
                _ => None,
            })
            .collect()
    }

    pub fn last_controls(&self) -> Option<BulkControls> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Controls(controls) => Some(controls),
                _ => None,
            })
            .last()
    }

    pub fn position(&self, matches: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events().iter().position(matches)
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl AlertView for RecordingView {
    async fn confirm(&self, prompt: &str) -> bool {
        self.push(Event::Confirm(prompt.to_string()));
        self.answer
    }

    fn show_loading(&self, message: &str) {
        self.push(Event::ShowLoading(message.to_string()));
    }

    fn hide_loading(&self) {
        self.push(Event::HideLoading);
    }

    fn notify(&self, notification: Notification) {
        self.push(Event::Notify(notification));
    }

    fn set_bulk_controls(&self, controls: &BulkControls) {
        self.push(Event::Controls(controls.clone()));
    }

    fn set_alert_status(&self, id: &AlertId, status: AlertStatus) {
        self.push(Event::Status(id.clone(), status));
    }

    fn schedule_refresh(&self, delay: Duration) {
        self.push(Event::Refresh(delay));
    }
}

/// How the scripted alert service answers every call
#[derive(Clone)]
pub enum Behaviour {
    Respond(Value),
    Fail(fn() -> AlertError),
    Hang,
    WaitFor(Arc<Notify>, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Bulk(Value),
    Status(AlertId, StatusAction),
    Delete(AlertId),
    Detail(AlertId),
}

pub struct ScriptedApi {
    behaviour: Behaviour,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(value: Value) -> Self {
        Self::new(Behaviour::Respond(value))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer<T: DeserializeOwned>(&self, call: Call) -> Result<T, AlertError> {
        self.calls.lock().unwrap().push(call);

        match self.behaviour.clone() {
            Behaviour::Respond(value) => Ok(serde_json::from_value(value)?),
            Behaviour::Fail(error) => Err(error()),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::WaitFor(gate, value) => {
                gate.notified().await;
                Ok(serde_json::from_value(value)?)
            }
        }
    }
}

#[async_trait]
impl AlertApi for ScriptedApi {
    async fn bulk_update(&self, request: &BulkRequest) -> Result<BulkResponse, AlertError> {
        let body = serde_json::to_value(request)?;
        self.answer(Call::Bulk(body)).await
    }

    async fn update_status(
        &self,
        id: &AlertId,
        action: StatusAction,
    ) -> Result<StatusResponse, AlertError> {
        self.answer(Call::Status(id.clone(), action)).await
    }

    async fn delete(&self, id: &AlertId) -> Result<StatusResponse, AlertError> {
        self.answer(Call::Delete(id.clone())).await
    }

    async fn detail(&self, id: &AlertId) -> Result<DetailResponse, AlertError> {
        self.answer(Call::Detail(id.clone())).await
    }
}

pub fn connection_error() -> AlertError {
    AlertError::Status(reqwest::StatusCode::BAD_GATEWAY)
}

pub fn rendered(ids: &[&str]) -> Vec<RenderedAlert> {
    ids.iter()
        .map(|id| RenderedAlert {
            id: AlertId::from(*id),
            title: Some(format!("Alert {id}")),
            status: Some(AlertStatus::Active),
        })
        .collect()
}

pub fn settings() -> ControllerSettings {
    ControllerSettings {
        refresh_delay: Duration::from_millis(1000),
        request_timeout: Duration::from_secs(5),
    }
}

pub fn controller(
    api: ScriptedApi,
    view: RecordingView,
    ids: &[&str],
) -> AlertController<ScriptedApi, RecordingView> {
    AlertController::new(api, view, rendered(ids), settings())
}
