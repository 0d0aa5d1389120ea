use crate::{
    crd::{FeatureGate, PlatformStatus, PlatformType, CLUSTER_OBJECT_NAME},
    listers::Listers,
    Error, Result,
};

/// Feature that opts supported platforms into out-of-tree cloud providers.
pub const EXTERNAL_CLOUD_PROVIDER_FEATURE: &str = "ExternalCloudProvider";

/// Whether the cluster should run an external cloud provider.
///
/// Using external providers is opt in through the cluster feature gate. A
/// missing feature gate is not an error: the cluster stays on the in-tree
/// implementation.
pub fn is_cloud_provider_external(
    listers: &dyn Listers,
    platform_status: Option<&PlatformStatus>,
) -> Result<bool> {
    let Some(feature_gate) = listers
        .feature_gate(CLUSTER_OBJECT_NAME)
        .map_err(|e| Error::FeatureGateLookup(Box::new(e)))?
    else {
        return Ok(false);
    };

    external_from_feature_gate(platform_status, &feature_gate)
        .map_err(|e| Error::ExternalProviderState(Box::new(e)))
}

/// Evaluates a feature gate against the platform the cluster runs on.
pub fn external_from_feature_gate(
    platform_status: Option<&PlatformStatus>,
    feature_gate: &FeatureGate,
) -> Result<bool> {
    let platform_status = platform_status.ok_or(Error::MissingPlatformStatus)?;

    match platform_status.type_ {
        // No in-tree provider exists for these.
        PlatformType::AlibabaCloud | PlatformType::IbmCloud => Ok(true),
        PlatformType::Aws
        | PlatformType::Azure
        | PlatformType::Gcp
        | PlatformType::OpenStack
        | PlatformType::VSphere => feature_enabled(feature_gate, EXTERNAL_CLOUD_PROVIDER_FEATURE),
        _ => Ok(false),
    }
}

/// Whether `feature` is switched on by the gate's feature set.
pub fn feature_enabled(feature_gate: &FeatureGate, feature: &str) -> Result<bool> {
    match feature_gate.spec.feature_set.as_str() {
        "" | "Default" | "LatencySensitive" => Ok(false),
        "TechPreviewNoUpgrade" => Ok(feature == EXTERNAL_CLOUD_PROVIDER_FEATURE),
        "CustomNoUpgrade" => Ok(feature_gate
            .spec
            .custom_no_upgrade
            .as_ref()
            .map(|custom| {
                custom.enabled.iter().any(|f| f == feature)
                    && !custom.disabled.iter().any(|f| f == feature)
            })
            .unwrap_or(false)),
        other => Err(Error::UnknownFeatureSet(other.to_string())),
    }
}
