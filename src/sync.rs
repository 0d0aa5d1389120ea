use crate::{Error, Result, CONFIG_MAP_SYNCS_TOTAL, ERRORS_TOTAL, SERVICE_NAME};
use k8s_openapi::{api::core::v1::ConfigMap, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use kube::{
    api::{Api, DeleteParams, Patch, PatchParams},
    error::ErrorResponse,
    Client,
};
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, PoisonError},
};
use tracing::{debug, info};

/// Namespace and name of a synced object. The empty location stands for "nothing".
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceLocation {
    pub namespace: String,
    pub name: String,
}

impl ResourceLocation {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespace.is_empty() && self.name.is_empty()
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub trait ResourceSyncer {
    /// Keep `destination` a copy of `source`. An empty source removes the destination.
    fn sync_config_map(
        &self,
        destination: ResourceLocation,
        source: ResourceLocation,
    ) -> Result<()>;
}

/// Records config map sync rules and carries them out on [`ConfigMapSyncer::reconcile`].
#[derive(Debug, Default)]
pub struct ConfigMapSyncer {
    rules: Mutex<BTreeMap<ResourceLocation, ResourceLocation>>,
}

impl ConfigMapSyncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rules, keyed by destination.
    pub fn rules(&self) -> BTreeMap<ResourceLocation, ResourceLocation> {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply every rule against the cluster.
    pub async fn reconcile(&self, client: &Client) -> Result<()> {
        for (destination, source) in self.rules() {
            let result = sync_one(client, &destination, &source).await;
            let label = if result.is_ok() { "ok" } else { "error" };
            CONFIG_MAP_SYNCS_TOTAL.with_label_values(&[label]).inc();
            result?;
        }
        Ok(())
    }
}

impl ResourceSyncer for ConfigMapSyncer {
    fn sync_config_map(
        &self,
        destination: ResourceLocation,
        source: ResourceLocation,
    ) -> Result<()> {
        if destination.namespace.is_empty() || destination.name.is_empty() {
            return Err(Error::InvalidSyncDestination(destination.to_string()));
        }
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        if rules.get(&destination) != Some(&source) {
            debug!("Config map sync rule {} <- {:?}", destination, source);
            rules.insert(destination, source);
        }
        Ok(())
    }
}

async fn sync_one(
    client: &Client,
    destination: &ResourceLocation,
    source: &ResourceLocation,
) -> Result<()> {
    let destination_api: Api<ConfigMap> = Api::namespaced(client.clone(), &destination.namespace);

    let source_cm = if source.is_empty() {
        None
    } else {
        let source_api: Api<ConfigMap> = Api::namespaced(client.clone(), &source.namespace);
        source_api.get_opt(&source.name).await?
    };

    let Some(source_cm) = source_cm else {
        return delete_destination(&destination_api, destination).await;
    };

    let cm = ConfigMap {
        metadata: ObjectMeta {
            name: Some(destination.name.clone()),
            namespace: Some(destination.namespace.clone()),
            ..Default::default()
        },
        data: source_cm.data,
        binary_data: source_cm.binary_data,
        immutable: None,
    };

    let patch_params = PatchParams::apply(SERVICE_NAME).force();
    destination_api
        .patch(&destination.name, &patch_params, &Patch::Apply(&cm))
        .await
        .map_err(|e| {
            ERRORS_TOTAL
                .with_label_values(&["configmap", "patch_error"])
                .inc();
            Error::Kube(e)
        })?;
    debug!("Synced config map {} from {}", destination, source);
    Ok(())
}

async fn delete_destination(api: &Api<ConfigMap>, destination: &ResourceLocation) -> Result<()> {
    match api.delete(&destination.name, &DeleteParams::default()).await {
        Ok(_) => {
            info!("Removed synced config map {}", destination);
            Ok(())
        }
        // Already gone
        Err(kube::Error::Api(ErrorResponse { code: 404, .. })) => Ok(()),
        Err(e) => {
            ERRORS_TOTAL
                .with_label_values(&["configmap", "delete_error"])
                .inc();
            Err(Error::Kube(e))
        }
    }
}
