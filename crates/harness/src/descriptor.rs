#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

pub const DESCRIPTOR_FILE: &str = "test.yaml";
pub const INPUT_DIR: &str = "input-dir";
pub const EXPECTED_OUTPUT_DIR: &str = "expected-output";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestType {
    #[default]
    ApplyConfiguration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesiredError {
    #[default]
    #[serde(rename = "")]
    None,
    NonZeroReturn,
}

/// Contents of a `test.yaml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestDescriptor {
    #[serde(default)]
    pub binary_name: String,
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub test_type: TestType,
    #[serde(default)]
    pub desired_error: DesiredError,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub now: Option<OffsetDateTime>,
    #[serde(default)]
    pub controllers_to_run: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

impl TestDescriptor {
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|message| DescriptorError::Invalid {
            path: path.to_path_buf(),
            message,
        })
    }

    /// YAML or JSON. An empty document is a descriptor with every default.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|err| err.to_string())
    }
}
