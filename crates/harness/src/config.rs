#![forbid(unsafe_code)]

use mom_core::equivalence::{ComparisonPolicy, IgnoreFields};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CASE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SUITE_NAME: &str = "apply-configuration";

/// What happens to a case's output directory once it is classified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PreservePolicy {
    /// Delete passing outputs; failed and errored ones stay.
    #[default]
    OnFailure,
    /// Keep every output directory.
    Always,
}

impl fmt::Display for PreservePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PreservePolicy::OnFailure => "on-failure",
            PreservePolicy::Always => "always",
        })
    }
}

#[derive(Clone)]
pub struct HarnessConfig {
    pub suite_name: String,
    pub test_root: PathBuf,
    pub output_root: PathBuf,
    pub case_timeout: Duration,
    /// Wall clock for the whole run; cases not started by then are skipped.
    pub suite_timeout: Option<Duration>,
    pub preserve: PreservePolicy,
    pub parallelism: usize,
    /// Used instead of each descriptor's `binaryName` when set.
    pub binary_override: Option<String>,
    pub policy: Arc<dyn ComparisonPolicy>,
}

impl HarnessConfig {
    pub fn new(test_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            suite_name: DEFAULT_SUITE_NAME.to_string(),
            test_root: test_root.into(),
            output_root: output_root.into(),
            case_timeout: DEFAULT_CASE_TIMEOUT,
            suite_timeout: None,
            preserve: PreservePolicy::default(),
            parallelism: 1,
            binary_override: None,
            policy: Arc::new(IgnoreFields::nondeterministic()),
        }
    }
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("suite_name", &self.suite_name)
            .field("test_root", &self.test_root)
            .field("output_root", &self.output_root)
            .field("case_timeout", &self.case_timeout)
            .field("suite_timeout", &self.suite_timeout)
            .field("preserve", &self.preserve)
            .field("parallelism", &self.parallelism)
            .field("binary_override", &self.binary_override)
            .finish_non_exhaustive()
    }
}
