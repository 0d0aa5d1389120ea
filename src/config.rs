use crate::{
    observed::{ConfigPaths, KeyPath},
    Error, Result,
};
use std::time::Duration;

const DEFAULT_TARGET_NAMESPACE: &str = "openshift-kube-controller-manager";
const DEFAULT_NAME_PATH: &str = "extendedArguments.cloud-provider";
const DEFAULT_CONFIG_PATH: &str = "extendedArguments.cloud-config";
const DEFAULT_OBSERVE_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime settings, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Namespace of the operand; `cloud-config` is synced here.
    pub target_namespace: String,
    pub paths: ConfigPaths,
    pub observe_interval: Duration,
    pub apply_flow_control: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup, `None` meaning unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let target_namespace = lookup("TARGET_NAMESPACE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_NAMESPACE.to_string());

        let name_path: KeyPath = lookup("CLOUD_PROVIDER_NAME_PATH")
            .as_deref()
            .unwrap_or(DEFAULT_NAME_PATH)
            .parse()?;
        let config_path: KeyPath = lookup("CLOUD_PROVIDER_CONFIG_PATH")
            .as_deref()
            .unwrap_or(DEFAULT_CONFIG_PATH)
            .parse()?;

        let observe_interval = match lookup("OBSERVE_INTERVAL_SECS") {
            Some(value) => {
                let secs: u64 = value.trim().parse().map_err(|_| {
                    Error::Config(format!("OBSERVE_INTERVAL_SECS is not a number: {:?}", value))
                })?;
                if secs == 0 {
                    return Err(Error::Config(
                        "OBSERVE_INTERVAL_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_OBSERVE_INTERVAL,
        };

        let apply_flow_control = match lookup("APPLY_FLOWCONTROL_MANIFESTS").as_deref() {
            None | Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => {
                return Err(Error::Config(format!(
                    "APPLY_FLOWCONTROL_MANIFESTS must be true or false, got {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            target_namespace,
            paths: ConfigPaths::new(name_path, config_path)?,
            observe_interval,
            apply_flow_control,
        })
    }
}
