#![forbid(unsafe_code)]

use crate::{ClusterType, ExactResource, GeneratedNameResource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Permissible outputs for one cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceList {
    #[serde(default)]
    pub exact_resources: Vec<ExactResource>,
    #[serde(default)]
    pub generated_name_resources: Vec<GeneratedNameResource>,
    /// Namespaces in which Events of any name may be written.
    #[serde(default)]
    pub eventing_namespaces: Vec<String>,
}

impl ResourceList {
    pub fn is_empty(&self) -> bool {
        self.exact_resources.is_empty()
            && self.generated_name_resources.is_empty()
            && self.eventing_namespaces.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AllowedOutputSpec {
    #[serde(default)]
    pub configuration_resources: ResourceList,
    #[serde(default)]
    pub management_resources: ResourceList,
    #[serde(default)]
    pub user_workload_resources: ResourceList,
}

const LEGACY_CLUSTER_KEYS: [(&str, &str); 3] = [
    ("configurationServerResources", "configurationResources"),
    ("managementServerResources", "managementResources"),
    ("guestServerResources", "userWorkloadResources"),
];
const LEGACY_GENERATED_KEY: (&str, &str) = ("generatedNameResource", "generatedNameResources");

impl AllowedOutputSpec {
    pub fn for_cluster(&self, cluster: ClusterType) -> &ResourceList {
        match cluster {
            ClusterType::Configuration => &self.configuration_resources,
            ClusterType::Management => &self.management_resources,
            ClusterType::UserWorkload => &self.user_workload_resources,
        }
    }

    pub fn for_cluster_mut(&mut self, cluster: ClusterType) -> &mut ResourceList {
        match cluster {
            ClusterType::Configuration => &mut self.configuration_resources,
            ClusterType::Management => &mut self.management_resources,
            ClusterType::UserWorkload => &mut self.user_workload_resources,
        }
    }

    /// Decodes an allow-list document, migrating the historical key names
    /// when the document uses them.
    pub fn from_value(value: Value) -> Result<Self, AllowedOutputError> {
        let Value::Object(mut root) = value else {
            return Err(AllowedOutputError::NotAnObject);
        };
        let legacy = LEGACY_CLUSTER_KEYS
            .iter()
            .any(|(old, _)| root.contains_key(*old));
        if legacy {
            if let Some((_, new)) = LEGACY_CLUSTER_KEYS
                .iter()
                .find(|(_, new)| root.contains_key(*new))
            {
                return Err(AllowedOutputError::MixedSchema {
                    key: (*new).to_string(),
                });
            }
            for (old, new) in LEGACY_CLUSTER_KEYS {
                if let Some(mut list) = root.remove(old) {
                    if let Value::Object(fields) = &mut list {
                        if let Some(generated) = fields.remove(LEGACY_GENERATED_KEY.0) {
                            fields.insert(LEGACY_GENERATED_KEY.1.to_string(), generated);
                        }
                    }
                    root.insert(new.to_string(), list);
                }
            }
        }
        serde_json::from_value(Value::Object(root))
            .map_err(|err| AllowedOutputError::Decode(err.to_string()))
    }

    /// True when the document used the historical key names.
    pub fn is_legacy(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|root| LEGACY_CLUSTER_KEYS.iter().any(|(old, _)| root.contains_key(*old)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllowedOutputError {
    #[error("allowed outputs document must be a mapping")]
    NotAnObject,
    #[error("allowed outputs document mixes historical keys with {key:?}")]
    MixedSchema { key: String },
    #[error("invalid allowed outputs document: {0}")]
    Decode(String),
}
