use crate::{
    crd::{PlatformType, CONFIG_GROUP},
    events::Recorder,
};
use std::fmt;

const PLATFORM_WARNING_REASON: &str = "ObserveCloudProvidersFailed";

/// Cloud providers built into the core control-plane components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InTreeProvider {
    Aws,
    Azure,
    Gce,
    OpenStack,
    VSphere,
}

impl InTreeProvider {
    /// Name as expected by the `cloud-provider` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            InTreeProvider::Aws => "aws",
            InTreeProvider::Azure => "azure",
            InTreeProvider::Gce => "gce",
            InTreeProvider::OpenStack => "openstack",
            InTreeProvider::VSphere => "vsphere",
        }
    }
}

impl fmt::Display for InTreeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the in-tree cloud provider for a platform, if there is one.
///
/// An unset or unrecognized platform is reported through the recorder and
/// treated like bare metal.
pub fn platform_name(platform: &PlatformType, recorder: &dyn Recorder) -> Option<InTreeProvider> {
    match platform {
        PlatformType::Unset => {
            recorder.warning(
                PLATFORM_WARNING_REASON,
                &format!(
                    "Required status.platform field is not set in infrastructures.{}/cluster",
                    CONFIG_GROUP
                ),
            );
            None
        }
        PlatformType::Aws => Some(InTreeProvider::Aws),
        PlatformType::Azure => Some(InTreeProvider::Azure),
        PlatformType::VSphere => Some(InTreeProvider::VSphere),
        PlatformType::Gcp => Some(InTreeProvider::Gce),
        PlatformType::OpenStack => Some(InTreeProvider::OpenStack),
        PlatformType::BareMetal
        | PlatformType::Libvirt
        | PlatformType::IbmCloud
        | PlatformType::None
        | PlatformType::Ovirt
        | PlatformType::KubeVirt
        | PlatformType::AlibabaCloud => None,
        PlatformType::Unrecognized(_) => {
            recorder.warning(
                PLATFORM_WARNING_REASON,
                &format!(
                    "No recognized cloud provider platform found in infrastructures.{}/cluster.status.platform",
                    CONFIG_GROUP
                ),
            );
            None
        }
    }
}
