//! Observes the cloud provider of a cluster from its `Infrastructure` and
//! `FeatureGate` resources and turns it into the `cloud-provider` and
//! `cloud-config` settings of a control-plane operand.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};
use thiserror::Error;

pub mod config;
pub mod controller;
pub mod crd;
pub mod events;
pub mod external;
pub mod listers;
pub mod manifests;
pub mod observed;
pub mod observer;
pub mod platform;
pub mod sync;

pub use config::Config;
pub use events::{EventType, InMemoryRecorder, KubeRecorder, RecordedEvent, Recorder};
pub use listers::{KubeListers, Listers};
pub use observed::{ConfigPaths, KeyPath, ObservedConfig};
pub use observer::{CloudProviderObserver, Observation};
pub use sync::{ConfigMapSyncer, ResourceLocation, ResourceSyncer};

pub const SERVICE_NAME: &str = "cloud-provider-observer";

lazy_static! {
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();
    static ref OBSERVATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("observations_total", "Total number of observation passes"),
        &["result"]
    )
    .unwrap();
    static ref EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("events_total", "Total number of recorded events"),
        &["type", "reason"]
    )
    .unwrap();
    static ref CONFIG_MAP_SYNCS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("config_map_syncs_total", "Total number of config map syncs"),
        &["result"]
    )
    .unwrap();
    static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("errors_total", "Total number of errors"),
        &["kind", "reason"]
    )
    .unwrap();
}

/// Initialize Prometheus metrics
pub fn init_metrics() {
    PROMETHEUS_REGISTRY
        .register(Box::new(OBSERVATIONS_TOTAL.clone()))
        .ok();
    PROMETHEUS_REGISTRY
        .register(Box::new(EVENTS_TOTAL.clone()))
        .ok();
    PROMETHEUS_REGISTRY
        .register(Box::new(CONFIG_MAP_SYNCS_TOTAL.clone()))
        .ok();
    PROMETHEUS_REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .ok();
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_yaml::Error),
    #[error("Failed to look up {kind} {name}: {reason}")]
    Lookup {
        kind: &'static str,
        name: String,
        reason: String,
    },
    #[error("could not fetch featuregate: {0}")]
    FeatureGateLookup(#[source] Box<Error>),
    #[error("could not determine if cloud provider is external from featuregate: {0}")]
    ExternalProviderState(#[source] Box<Error>),
    #[error("platform status is not set in infrastructures.config.openshift.io/cluster")]
    MissingPlatformStatus,
    #[error("unknown feature set {0:?}")]
    UnknownFeatureSet(String),
    #[error("Invalid config map sync destination {0:?}")]
    InvalidSyncDestination(String),
    #[error("Invalid key path {0:?}")]
    InvalidKeyPath(String),
    #[error("Failed to decode observed config at {path}: {reason}")]
    ConfigDecode { path: String, reason: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Observation failed with {} error(s): {}", .0.len(), join_errors(.0))]
    Observation(Vec<Error>),
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
