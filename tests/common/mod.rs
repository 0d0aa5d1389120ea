#![allow(dead_code)]

use cloud_provider_observer::{
    crd::{
        ConfigMapFileReference, CustomFeatureGates, FeatureGate, FeatureGateSpec, Infrastructure,
        InfrastructureSpec, InfrastructureStatus, PlatformStatus, PlatformType,
    },
    ConfigPaths, Error, Listers, ResourceLocation, ResourceSyncer, Result,
};
use k8s_openapi::{api::core::v1::ConfigMap, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use std::sync::{Arc, Mutex};

pub const TARGET_NAMESPACE: &str = "openshift-kube-controller-manager";

pub fn paths() -> ConfigPaths {
    ConfigPaths::new(
        "extendedArguments.cloud-provider".parse().unwrap(),
        "extendedArguments.cloud-config".parse().unwrap(),
    )
    .unwrap()
}

/// Infrastructure `cluster` on `platform`, pointing at `openshift-config/cloud-provider-config`.
pub fn infrastructure(platform: PlatformType) -> Infrastructure {
    let mut infra = Infrastructure::new(
        "cluster",
        InfrastructureSpec {
            cloud_config: ConfigMapFileReference {
                name: "cloud-provider-config".to_string(),
                key: "config".to_string(),
            },
        },
    );
    infra.status = Some(InfrastructureStatus {
        platform: platform.clone(),
        platform_status: Some(PlatformStatus { type_: platform }),
    });
    infra
}

pub fn feature_gate(feature_set: &str, enabled: &[&str]) -> FeatureGate {
    FeatureGate::new(
        "cluster",
        FeatureGateSpec {
            feature_set: feature_set.to_string(),
            custom_no_upgrade: Some(CustomFeatureGates {
                enabled: enabled.iter().map(|s| s.to_string()).collect(),
                disabled: Vec::new(),
            }),
        },
    )
}

pub fn config_map(namespace: &str, name: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn lookup_error(kind: &'static str, name: &str) -> Error {
    Error::Lookup {
        kind,
        name: name.to_string(),
        reason: "cache unavailable".to_string(),
    }
}

/// Records every sync request; optionally refuses them.
#[derive(Default)]
pub struct RecordingSyncer {
    pub requests: Mutex<Vec<(ResourceLocation, ResourceLocation)>>,
    pub fail: bool,
}

impl ResourceSyncer for RecordingSyncer {
    fn sync_config_map(
        &self,
        destination: ResourceLocation,
        source: ResourceLocation,
    ) -> Result<()> {
        if self.fail {
            return Err(Error::InvalidSyncDestination(destination.to_string()));
        }
        self.requests.lock().unwrap().push((destination, source));
        Ok(())
    }
}

/// In-memory stand-in for the reflector backed listers.
#[derive(Default)]
pub struct FakeListers {
    pub infrastructure: Option<Infrastructure>,
    pub feature_gate: Option<FeatureGate>,
    pub config_maps: Vec<ConfigMap>,
    pub infrastructure_error: bool,
    pub feature_gate_error: bool,
    pub config_map_error: bool,
    pub syncer: RecordingSyncer,
}

impl FakeListers {
    pub fn on(platform: PlatformType) -> Self {
        Self {
            infrastructure: Some(infrastructure(platform)),
            ..Default::default()
        }
    }

    pub fn with_managed_config(mut self) -> Self {
        self.config_maps
            .push(config_map("openshift-config-managed", "kube-cloud-config"));
        self
    }

    pub fn sync_requests(&self) -> Vec<(ResourceLocation, ResourceLocation)> {
        self.syncer.requests.lock().unwrap().clone()
    }

    /// Source of the single sync request issued so far.
    pub fn synced_source(&self) -> ResourceLocation {
        let requests = self.sync_requests();
        assert_eq!(requests.len(), 1, "expected exactly one sync request");
        assert_eq!(
            requests[0].0,
            ResourceLocation::new(TARGET_NAMESPACE, "cloud-config")
        );
        requests[0].1.clone()
    }
}

impl Listers for FakeListers {
    fn infrastructure(&self, name: &str) -> Result<Option<Arc<Infrastructure>>> {
        if self.infrastructure_error {
            return Err(lookup_error("Infrastructure", name));
        }
        Ok(self.infrastructure.clone().map(Arc::new))
    }

    fn feature_gate(&self, name: &str) -> Result<Option<Arc<FeatureGate>>> {
        if self.feature_gate_error {
            return Err(lookup_error("FeatureGate", name));
        }
        Ok(self.feature_gate.clone().map(Arc::new))
    }

    fn config_map(&self, namespace: &str, name: &str) -> Result<Option<Arc<ConfigMap>>> {
        if self.config_map_error {
            return Err(lookup_error("ConfigMap", name));
        }
        Ok(self
            .config_maps
            .iter()
            .find(|cm| {
                cm.metadata.namespace.as_deref() == Some(namespace)
                    && cm.metadata.name.as_deref() == Some(name)
            })
            .cloned()
            .map(Arc::new))
    }

    fn resource_syncer(&self) -> &dyn ResourceSyncer {
        &self.syncer
    }
}
