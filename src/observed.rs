//! Typed observed configuration and its mapping onto the nested tree the
//! consuming operand reads.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// What the cloud provider observer derived from the cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservedConfig {
    /// `external`, an in-tree provider name, or unset.
    pub cloud_provider_name: Option<String>,
    /// Path of the cloud config file inside the operand's static pod resources.
    pub cloud_config_file: Option<String>,
}

/// A path of map keys into a nested configuration tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(Error::InvalidKeyPath(segments.join(".")));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    fn starts_with(&self, other: &KeyPath) -> bool {
        self.0.starts_with(&other.0)
    }

    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(root, |value, key| value.as_object()?.get(key))
    }

    /// Set `value` at this path, creating intermediate maps.
    ///
    /// Fails when an intermediate value exists and is not a map.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<()> {
        let (last, parents) = self
            .0
            .split_last()
            .ok_or_else(|| Error::InvalidKeyPath(String::new()))?;
        let mut current = root;
        for key in parents {
            let map = current.as_object_mut().ok_or_else(|| self.not_a_map(key))?;
            current = map
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        current
            .as_object_mut()
            .ok_or_else(|| self.not_a_map(last))?
            .insert(last.clone(), value);
        Ok(())
    }

    /// Read a list of strings at this path. A missing value reads as `None`.
    pub fn read_string_slice(&self, root: &Value) -> Result<Option<Vec<String>>> {
        let Some(value) = self.get(root) else {
            return Ok(None);
        };
        let items = value.as_array().ok_or_else(|| Error::ConfigDecode {
            path: self.to_string(),
            reason: format!("expected a list of strings, found {}", value),
        })?;
        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| Error::ConfigDecode {
                    path: self.to_string(),
                    reason: format!("list item {} is not a string", item),
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Read a single string stored as a one-element list.
    fn read_single(&self, root: &Value) -> Result<Option<String>> {
        let Some(mut items) = self.read_string_slice(root)? else {
            return Ok(None);
        };
        match items.len() {
            0 => Ok(None),
            1 => Ok(items.pop()),
            n => Err(Error::ConfigDecode {
                path: self.to_string(),
                reason: format!("expected a single value, found {}", n),
            }),
        }
    }

    fn not_a_map(&self, key: &str) -> Error {
        Error::ConfigDecode {
            path: self.to_string(),
            reason: format!("value at {:?} is not a map", key),
        }
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    /// Parse a dotted path such as `extendedArguments.cloud-provider`.
    fn from_str(s: &str) -> Result<Self> {
        KeyPath::new(s.split('.'))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Where the two observed values live in the consuming operand's config tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigPaths {
    cloud_provider_name: KeyPath,
    cloud_provider_config: KeyPath,
}

impl ConfigPaths {
    pub fn new(cloud_provider_name: KeyPath, cloud_provider_config: KeyPath) -> Result<Self> {
        if cloud_provider_name.starts_with(&cloud_provider_config)
            || cloud_provider_config.starts_with(&cloud_provider_name)
        {
            return Err(Error::InvalidKeyPath(format!(
                "{} overlaps {}",
                cloud_provider_name, cloud_provider_config
            )));
        }
        Ok(Self {
            cloud_provider_name,
            cloud_provider_config,
        })
    }

    pub fn cloud_provider_name(&self) -> &KeyPath {
        &self.cloud_provider_name
    }

    pub fn cloud_provider_config(&self) -> &KeyPath {
        &self.cloud_provider_config
    }

    /// Build the config tree for `config`. Unset fields are left out entirely.
    pub fn render(&self, config: &ObservedConfig) -> Result<Value> {
        let mut root = Value::Object(Map::new());
        if let Some(name) = &config.cloud_provider_name {
            self.cloud_provider_name
                .set(&mut root, Value::from(vec![name.clone()]))?;
        }
        if let Some(file) = &config.cloud_config_file {
            self.cloud_provider_config
                .set(&mut root, Value::from(vec![file.clone()]))?;
        }
        Ok(root)
    }

    /// Read both values back from a previously rendered tree.
    ///
    /// A value that cannot be read is left unset and reported in the returned errors.
    pub fn decode(&self, existing: &Value) -> (ObservedConfig, Vec<Error>) {
        let mut errors = Vec::new();
        let mut read = |path: &KeyPath| {
            path.read_single(existing).unwrap_or_else(|e| {
                errors.push(e);
                None
            })
        };
        let config = ObservedConfig {
            cloud_provider_name: read(&self.cloud_provider_name),
            cloud_config_file: read(&self.cloud_provider_config),
        };
        (config, errors)
    }

    /// Copy of `value` holding only what is reachable through the two paths.
    pub fn prune(&self, value: &Value) -> Value {
        let mut pruned = Value::Object(Map::new());
        for path in [&self.cloud_provider_name, &self.cloud_provider_config] {
            if let Some(found) = path.get(value) {
                // Paths do not overlap and `pruned` only holds maps along them.
                let _ = path.set(&mut pruned, found.clone());
            }
        }
        pruned
    }
}
