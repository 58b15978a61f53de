#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

const CORE_GROUP: &str = "";
const CONFIG_GROUP: &str = "config.openshift.io";
const OPERATOR_GROUP: &str = "operator.openshift.io";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceTypeIdentifier {
    #[serde(default)]
    pub group: String,
    /// Must match the serialization version the operator expects. All
    /// identifiers sharing a group and resource use the same version.
    pub version: String,
    pub resource: String,
}

impl ResourceTypeIdentifier {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    pub fn same_group_resource(&self, other: &ResourceTypeIdentifier) -> bool {
        self.group == other.group && self.resource == other.resource
    }

    pub fn validate(&self) -> Result<(), ResourceError> {
        validate_segment("group", &self.group, true)?;
        validate_segment("version", &self.version, false)?;
        validate_segment("resource", &self.resource, false)
    }
}

impl fmt::Display for ResourceTypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.resource, self.version, self.group)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExactResource {
    #[serde(flatten)]
    pub type_id: ResourceTypeIdentifier,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

impl ExactResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            type_id: ResourceTypeIdentifier::new(group, version, resource),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn secret(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(CORE_GROUP, "v1", "secrets", namespace, name)
    }

    pub fn config_map(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(CORE_GROUP, "v1", "configmaps", namespace, name)
    }

    /// The cluster-scoped singleton `cluster` of a config.openshift.io resource.
    pub fn config_resource(resource: impl Into<String>) -> Self {
        Self::new(CONFIG_GROUP, "v1", resource, "", "cluster")
    }

    /// The cluster-scoped singleton `cluster` of an operator.openshift.io resource.
    pub fn low_level_operator(resource: impl Into<String>) -> Self {
        Self::new(OPERATOR_GROUP, "v1", resource, "", "cluster")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratedNameResource {
    #[serde(flatten)]
    pub type_id: ResourceTypeIdentifier,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(rename = "generatedName", alias = "name")]
    pub generated_name: String,
}

impl GeneratedNameResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        namespace: impl Into<String>,
        generated_name: impl Into<String>,
    ) -> Self {
        Self {
            type_id: ResourceTypeIdentifier::new(group, version, resource),
            namespace: namespace.into(),
            generated_name: generated_name.into(),
        }
    }
}

/// Target of a write: a concrete object, or one whose name the server will
/// generate from a prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceIdentity {
    Exact(ExactResource),
    GeneratedName(GeneratedNameResource),
}

impl ResourceIdentity {
    pub fn type_id(&self) -> &ResourceTypeIdentifier {
        match self {
            ResourceIdentity::Exact(exact) => &exact.type_id,
            ResourceIdentity::GeneratedName(generated) => &generated.type_id,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            ResourceIdentity::Exact(exact) => &exact.namespace,
            ResourceIdentity::GeneratedName(generated) => &generated.namespace,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ResourceIdentity::Exact(exact) => Some(&exact.name),
            ResourceIdentity::GeneratedName(_) => None,
        }
    }

    pub fn generated_name(&self) -> Option<&str> {
        match self {
            ResourceIdentity::Exact(_) => None,
            ResourceIdentity::GeneratedName(generated) => Some(&generated.generated_name),
        }
    }

    pub fn validate(&self) -> Result<(), ResourceError> {
        self.type_id().validate()?;
        validate_segment("namespace", self.namespace(), true)?;
        match self {
            ResourceIdentity::Exact(exact) => validate_segment("name", &exact.name, false),
            ResourceIdentity::GeneratedName(generated) => {
                validate_segment("generatedName", &generated.generated_name, false)
            }
        }
    }
}

impl From<ExactResource> for ResourceIdentity {
    fn from(value: ExactResource) -> Self {
        ResourceIdentity::Exact(value)
    }
}

impl From<GeneratedNameResource> for ResourceIdentity {
    fn from(value: GeneratedNameResource) -> Self {
        ResourceIdentity::GeneratedName(value)
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceIdentity::Exact(exact) => {
                write!(f, "{}/{}[{}]", exact.type_id, exact.name, exact.namespace)
            }
            ResourceIdentity::GeneratedName(generated) => write!(
                f,
                "{}/{}*[{}]",
                generated.type_id, generated.generated_name, generated.namespace
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} is too long")]
    TooLong { field: &'static str },
    #[error("{field} contains invalid character {ch:?} at index {index}")]
    InvalidChar {
        field: &'static str,
        ch: char,
        index: usize,
    },
}

// Segments end up in file names, so '_' (the file name separator), '@' (the
// generated-name marker) and path separators are rejected.
fn validate_segment(
    field: &'static str,
    value: &str,
    allow_empty: bool,
) -> Result<(), ResourceError> {
    if value.is_empty() {
        if allow_empty {
            return Ok(());
        }
        return Err(ResourceError::Empty { field });
    }
    if value.len() > 253 {
        return Err(ResourceError::TooLong { field });
    }
    for (index, ch) in value.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | ':') {
            continue;
        }
        return Err(ResourceError::InvalidChar { field, ch, index });
    }
    Ok(())
}
