use crate::{crd::CLUSTER_OBJECT_NAME, EVENTS_TOTAL, SERVICE_NAME};
use k8s_openapi::{
    api::core::v1::{Event, ObjectReference},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kube::{
    api::{Api, PostParams},
    Client,
};
use std::{
    fmt,
    sync::{Mutex, PoisonError},
    time::SystemTime,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Normal => f.write_str("Normal"),
            EventType::Warning => f.write_str("Warning"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub type_: EventType,
    pub reason: String,
    pub message: String,
}

/// Sink for the events emitted during an observation.
pub trait Recorder {
    fn record(&self, event: RecordedEvent);

    fn warning(&self, reason: &str, message: &str) {
        self.record(RecordedEvent {
            type_: EventType::Warning,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }

    fn normal(&self, reason: &str, message: &str) {
        self.record(RecordedEvent {
            type_: EventType::Normal,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }
}

/// Keeps events in memory in the order they were recorded.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Recorder for InMemoryRecorder {
    fn record(&self, event: RecordedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Logs events and hands them to the task started by [`run_event_emitter`].
#[derive(Clone)]
pub struct KubeRecorder {
    tx: mpsc::UnboundedSender<RecordedEvent>,
}

impl KubeRecorder {
    pub fn new(tx: mpsc::UnboundedSender<RecordedEvent>) -> Self {
        Self { tx }
    }
}

impl Recorder for KubeRecorder {
    fn record(&self, event: RecordedEvent) {
        match event.type_ {
            EventType::Normal => info!("{}: {}", event.reason, event.message),
            EventType::Warning => warn!("{}: {}", event.reason, event.message),
        }
        EVENTS_TOTAL
            .with_label_values(&[&event.type_.to_string(), &event.reason])
            .inc();
        if self.tx.send(event).is_err() {
            warn!("Event emitter has stopped, dropping event");
        }
    }
}

/// Create a Kubernetes Event for every recorded event until the sender side closes.
pub async fn run_event_emitter(
    client: Client,
    namespace: String,
    mut rx: mpsc::UnboundedReceiver<RecordedEvent>,
) {
    let events_api: Api<Event> = Api::namespaced(client, &namespace);
    while let Some(event) = rx.recv().await {
        emit_event(&events_api, &namespace, &event).await;
    }
    debug!("Event emitter stopped");
}

/// Emit a Kubernetes Event against the cluster Infrastructure object
async fn emit_event(events_api: &Api<Event>, namespace: &str, event: &RecordedEvent) {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let event_name = format!("{}.{:x}", SERVICE_NAME, timestamp);

    let kube_event = Event {
        metadata: ObjectMeta {
            name: Some(event_name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        involved_object: ObjectReference {
            api_version: Some("config.openshift.io/v1".to_string()),
            kind: Some("Infrastructure".to_string()),
            name: Some(CLUSTER_OBJECT_NAME.to_string()),
            ..Default::default()
        },
        reason: Some(event.reason.clone()),
        message: Some(event.message.clone()),
        type_: Some(event.type_.to_string()),
        action: Some("Observe".to_string()),
        reporting_component: Some(SERVICE_NAME.to_string()),
        reporting_instance: Some(
            std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
        ),
        ..Default::default()
    };

    if let Err(e) = events_api.create(&PostParams::default(), &kube_event).await {
        warn!("Failed to create event: {:?}", e);
    }
}
