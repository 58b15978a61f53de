#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical write target. Declaration order is the canonical report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterType {
    Configuration,
    Management,
    UserWorkload,
}

impl ClusterType {
    pub const ALL: [ClusterType; 3] = [
        ClusterType::Configuration,
        ClusterType::Management,
        ClusterType::UserWorkload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClusterType::Configuration => "Configuration",
            ClusterType::Management => "Management",
            ClusterType::UserWorkload => "UserWorkload",
        }
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterType {
    type Err = UnknownNameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cluster| cluster.as_str() == value)
            .ok_or_else(|| UnknownNameError {
                kind: "cluster type",
                value: value.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verb {
    Apply,
    ApplyStatus,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Apply,
        Verb::ApplyStatus,
        Verb::Create,
        Verb::Update,
        Verb::UpdateStatus,
        Verb::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Apply => "Apply",
            Verb::ApplyStatus => "ApplyStatus",
            Verb::Create => "Create",
            Verb::Update => "Update",
            Verb::UpdateStatus => "UpdateStatus",
            Verb::Delete => "Delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = UnknownNameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str() == value)
            .ok_or_else(|| UnknownNameError {
                kind: "verb",
                value: value.to_string(),
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownNameError {
    pub kind: &'static str,
    pub value: String,
}
