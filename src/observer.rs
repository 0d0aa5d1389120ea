use crate::{
    crd::{CLUSTER_OBJECT_NAME, CONFIG_GROUP},
    events::Recorder,
    external::is_cloud_provider_external,
    listers::Listers,
    observed::{ConfigPaths, ObservedConfig},
    platform::{platform_name, InTreeProvider},
    sync::ResourceLocation,
    Error,
};
use serde_json::Value;
use tracing::warn;

/// Directory the operand mounts the synced `cloud-config` config map into.
const CLOUD_PROVIDER_CONF_DIR: &str = "/etc/kubernetes/static-pod-resources/configmaps/cloud-config";
const CONFIG_NAMESPACE: &str = "openshift-config";
const MACHINE_SPECIFIED_CONFIG_NAMESPACE: &str = "openshift-config-managed";
const MACHINE_SPECIFIED_CONFIG: &str = "kube-cloud-config";
const MACHINE_SPECIFIED_CONFIG_KEY: &str = "cloud.conf";
const TARGET_CONFIG_MAP: &str = "cloud-config";

/// Value written as provider name when an external cloud provider is in use.
pub const EXTERNAL_PROVIDER: &str = "external";

/// Providers whose cloud config is synced into the target namespace.
const SYNCED_PROVIDERS: &[InTreeProvider] = &[
    InTreeProvider::Aws,
    InTreeProvider::Azure,
    InTreeProvider::Gce,
    InTreeProvider::OpenStack,
    InTreeProvider::VSphere,
];

const OBSERVE_REASON: &str = "ObserveCloudProviderNames";
const CHANGED_REASON: &str = "ObserveCloudProviderNamesChanges";

/// Namespaces whose config maps an observation may look up.
pub const WATCHED_CONFIG_NAMESPACES: [&str; 2] =
    [CONFIG_NAMESPACE, MACHINE_SPECIFIED_CONFIG_NAMESPACE];

/// Result of one observation.
#[derive(Debug, Default)]
pub struct Observation {
    pub config: ObservedConfig,
    /// Previous tree, pruned to the configured paths, handed back on a hard error.
    pub retained: Option<Value>,
    pub errors: Vec<Error>,
}

impl Observation {
    /// The tree to publish: the retained previous tree if there is one, the
    /// rendered `config` otherwise.
    pub fn render(&self, paths: &ConfigPaths) -> crate::Result<Value> {
        match &self.retained {
            Some(retained) => Ok(retained.clone()),
            None => paths.render(&self.config),
        }
    }
}

/// Derives the cloud provider flags for an operand from the cluster
/// `Infrastructure` and `FeatureGate` objects.
#[derive(Clone, Debug)]
pub struct CloudProviderObserver {
    target_namespace: String,
    paths: ConfigPaths,
}

impl CloudProviderObserver {
    pub fn new(target_namespace: impl Into<String>, paths: ConfigPaths) -> Self {
        Self {
            target_namespace: target_namespace.into(),
            paths,
        }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    /// Observe the cloud provider of the cluster.
    ///
    /// On failure the values previously observed in `existing` are handed back
    /// together with the error, so a transient lookup problem never clears a
    /// working configuration.
    pub fn observe(
        &self,
        listers: &dyn Listers,
        recorder: &dyn Recorder,
        existing: &Value,
    ) -> Observation {
        let mut errors = Vec::new();
        let mut observed = ObservedConfig::default();

        let infrastructure = match listers.infrastructure(CLUSTER_OBJECT_NAME) {
            Ok(Some(infrastructure)) => infrastructure,
            Ok(None) => {
                recorder.warning(
                    OBSERVE_REASON,
                    &format!("Required infrastructures.{}/cluster not found", CONFIG_GROUP),
                );
                return Observation {
                    config: observed,
                    retained: None,
                    errors,
                };
            }
            Err(e) => return self.keep_existing(existing, errors, e),
        };

        let external = match is_cloud_provider_external(listers, infrastructure.platform_status())
        {
            Ok(external) => external,
            Err(e) => {
                recorder.warning(
                    OBSERVE_REASON,
                    &format!("Could not determine external cloud provider state: {}", e),
                );
                return self.keep_existing(existing, errors, e);
            }
        };

        // In-tree name doubles as the fallback when no external provider is configured.
        // It comes from the deprecated status.platform; platform status only feeds the
        // external check above.
        let cloud_provider = platform_name(&infrastructure.platform_type(), recorder);
        observed.cloud_provider_name = if external {
            Some(EXTERNAL_PROVIDER.to_string())
        } else {
            cloud_provider.map(|provider| provider.as_str().to_string())
        };

        let cloud_config = &infrastructure.spec.cloud_config;
        let mut source_name = cloud_config.name.clone();
        let mut source_namespace = CONFIG_NAMESPACE;
        let mut source_key = cloud_config.key.clone();

        // A managed cloud config, when present, takes precedence over the user supplied one.
        match listers.config_map(MACHINE_SPECIFIED_CONFIG_NAMESPACE, MACHINE_SPECIFIED_CONFIG) {
            Ok(Some(_)) => {
                source_name = MACHINE_SPECIFIED_CONFIG.to_string();
                source_namespace = MACHINE_SPECIFIED_CONFIG_NAMESPACE;
                source_key = MACHINE_SPECIFIED_CONFIG_KEY.to_string();
            }
            Ok(None) => {}
            Err(e) => return self.keep_existing(existing, errors, e),
        }

        if !cloud_provider.is_some_and(|provider| SYNCED_PROVIDERS.contains(&provider)) {
            source_name.clear();
        }

        let source = if source_name.is_empty() {
            ResourceLocation::default()
        } else {
            ResourceLocation::new(source_namespace, source_name.clone())
        };
        let destination = ResourceLocation::new(self.target_namespace.clone(), TARGET_CONFIG_MAP);
        if let Err(e) = listers
            .resource_syncer()
            .sync_config_map(destination, source)
        {
            return self.keep_existing(existing, errors, e);
        }

        if source_name.is_empty() {
            return Observation {
                config: observed,
                retained: None,
                errors,
            };
        }

        let static_cloud_conf_file = format!("{}/{}", CLOUD_PROVIDER_CONF_DIR, source_key);

        let existing_cloud_config = self
            .paths
            .cloud_provider_config()
            .read_string_slice(existing)
            .unwrap_or_else(|e| {
                warn!("Failed to read previously observed cloud config: {}", e);
                errors.push(e);
                None
            });

        if existing_cloud_config.as_deref() != Some(std::slice::from_ref(&static_cloud_conf_file)) {
            recorder.normal(
                CHANGED_REASON,
                &format!("CloudProvider config file changed to {}", static_cloud_conf_file),
            );
        }
        observed.cloud_config_file = Some(static_cloud_conf_file);

        Observation {
            config: observed,
            retained: None,
            errors,
        }
    }

    fn keep_existing(&self, existing: &Value, mut errors: Vec<Error>, error: Error) -> Observation {
        let (config, decode_errors) = self.paths.decode(existing);
        for e in &decode_errors {
            warn!("Failed to read previously observed value: {}", e);
        }
        errors.push(error);
        Observation {
            config,
            retained: Some(self.paths.prune(existing)),
            errors,
        }
    }
}
