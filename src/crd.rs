use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API group of the cluster configuration resources.
pub const CONFIG_GROUP: &str = "config.openshift.io";

/// Name of the singleton `Infrastructure` and `FeatureGate` objects.
pub const CLUSTER_OBJECT_NAME: &str = "cluster";

/// Spec of the cluster-scoped `infrastructures.config.openshift.io` resource.
///
/// Only the fields read by the observer are modelled; unknown fields are ignored
/// on deserialization.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "Infrastructure",
    plural = "infrastructures",
    status = "InfrastructureStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    #[serde(default)]
    pub cloud_config: ConfigMapFileReference,
}

/// Points at a key inside a config map in the `openshift-config` namespace.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ConfigMapFileReference {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Deprecated in favour of `platform_status.type_`, but the in-tree provider
    /// name is still derived from it.
    #[serde(default)]
    pub platform: PlatformType,
    pub platform_status: Option<PlatformStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PlatformStatus {
    #[serde(rename = "type", default)]
    pub type_: PlatformType,
}

impl Infrastructure {
    /// The platform type from `status.platform`.
    pub fn platform_type(&self) -> PlatformType {
        self.status
            .as_ref()
            .map(|status| status.platform.clone())
            .unwrap_or_default()
    }

    pub fn platform_status(&self) -> Option<&PlatformStatus> {
        self.status
            .as_ref()
            .and_then(|status| status.platform_status.as_ref())
    }
}

/// Cloud platform a cluster runs on.
///
/// Strings outside the known set are kept in `Unrecognized` so they can be
/// reported back verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum PlatformType {
    #[default]
    Unset,
    Aws,
    Azure,
    BareMetal,
    Gcp,
    Libvirt,
    OpenStack,
    None,
    VSphere,
    Ovirt,
    IbmCloud,
    KubeVirt,
    AlibabaCloud,
    Unrecognized(String),
}

impl PlatformType {
    /// Every named platform, in declaration order.
    pub const KNOWN: [PlatformType; 12] = [
        PlatformType::Aws,
        PlatformType::Azure,
        PlatformType::BareMetal,
        PlatformType::Gcp,
        PlatformType::Libvirt,
        PlatformType::OpenStack,
        PlatformType::None,
        PlatformType::VSphere,
        PlatformType::Ovirt,
        PlatformType::IbmCloud,
        PlatformType::KubeVirt,
        PlatformType::AlibabaCloud,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PlatformType::Unset => "",
            PlatformType::Aws => "AWS",
            PlatformType::Azure => "Azure",
            PlatformType::BareMetal => "BareMetal",
            PlatformType::Gcp => "GCP",
            PlatformType::Libvirt => "Libvirt",
            PlatformType::OpenStack => "OpenStack",
            PlatformType::None => "None",
            PlatformType::VSphere => "VSphere",
            PlatformType::Ovirt => "oVirt",
            PlatformType::IbmCloud => "IBMCloud",
            PlatformType::KubeVirt => "KubeVirt",
            PlatformType::AlibabaCloud => "AlibabaCloud",
            PlatformType::Unrecognized(other) => other,
        }
    }
}

impl From<&str> for PlatformType {
    fn from(value: &str) -> Self {
        match value {
            "" => PlatformType::Unset,
            "AWS" => PlatformType::Aws,
            "Azure" => PlatformType::Azure,
            "BareMetal" => PlatformType::BareMetal,
            "GCP" => PlatformType::Gcp,
            "Libvirt" => PlatformType::Libvirt,
            "OpenStack" => PlatformType::OpenStack,
            "None" => PlatformType::None,
            "VSphere" => PlatformType::VSphere,
            "oVirt" => PlatformType::Ovirt,
            "IBMCloud" => PlatformType::IbmCloud,
            "KubeVirt" => PlatformType::KubeVirt,
            "AlibabaCloud" => PlatformType::AlibabaCloud,
            other => PlatformType::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for PlatformType {
    fn from(value: String) -> Self {
        PlatformType::from(value.as_str())
    }
}

impl From<PlatformType> for String {
    fn from(value: PlatformType) -> Self {
        match value {
            PlatformType::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spec of the cluster-scoped `featuregates.config.openshift.io` resource.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "FeatureGate",
    plural = "featuregates",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGateSpec {
    #[serde(default)]
    pub feature_set: String,
    pub custom_no_upgrade: Option<CustomFeatureGates>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CustomFeatureGates {
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub disabled: Vec<String>,
}
