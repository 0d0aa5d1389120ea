use crate::{
    crd::{FeatureGate, Infrastructure},
    sync::{ConfigMapSyncer, ResourceSyncer},
    Error, Result,
};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::reflector::{ObjectRef, Store};
use std::{collections::BTreeMap, sync::Arc};

/// Read access to the cluster state an observation depends on, plus the syncer
/// it drives.
///
/// Lookups return `Ok(None)` when the object does not exist.
pub trait Listers {
    fn infrastructure(&self, name: &str) -> Result<Option<Arc<Infrastructure>>>;

    fn feature_gate(&self, name: &str) -> Result<Option<Arc<FeatureGate>>>;

    fn config_map(&self, namespace: &str, name: &str) -> Result<Option<Arc<ConfigMap>>>;

    fn resource_syncer(&self) -> &dyn ResourceSyncer;
}

/// [`Listers`] backed by reflector stores.
///
/// Config maps are only cached for the namespaces passed to [`KubeListers::new`];
/// looking one up anywhere else is an error.
pub struct KubeListers {
    infrastructures: Store<Infrastructure>,
    feature_gates: Store<FeatureGate>,
    config_maps: BTreeMap<String, Store<ConfigMap>>,
    syncer: Arc<ConfigMapSyncer>,
}

impl KubeListers {
    pub fn new(
        infrastructures: Store<Infrastructure>,
        feature_gates: Store<FeatureGate>,
        config_maps: BTreeMap<String, Store<ConfigMap>>,
        syncer: Arc<ConfigMapSyncer>,
    ) -> Self {
        Self {
            infrastructures,
            feature_gates,
            config_maps,
            syncer,
        }
    }
}

impl Listers for KubeListers {
    fn infrastructure(&self, name: &str) -> Result<Option<Arc<Infrastructure>>> {
        Ok(self.infrastructures.get(&ObjectRef::new(name)))
    }

    fn feature_gate(&self, name: &str) -> Result<Option<Arc<FeatureGate>>> {
        Ok(self.feature_gates.get(&ObjectRef::new(name)))
    }

    fn config_map(&self, namespace: &str, name: &str) -> Result<Option<Arc<ConfigMap>>> {
        let store = self.config_maps.get(namespace).ok_or_else(|| Error::Lookup {
            kind: "ConfigMap",
            name: format!("{}/{}", namespace, name),
            reason: "namespace is not watched".to_string(),
        })?;
        Ok(store.get(&ObjectRef::new(name).within(namespace)))
    }

    fn resource_syncer(&self) -> &dyn ResourceSyncer {
        self.syncer.as_ref()
    }
}
