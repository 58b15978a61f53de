#![forbid(unsafe_code)]

use crate::config::{HarnessConfig, PreservePolicy};
use crate::descriptor::DesiredError;
use crate::discovery::{DiscoveryError, TestCase};
use mom_core::ControllerSelection;
use mom_runner::{CancelToken, RunError, RunOutput, RunRequest, resolve_binary, run};
use mom_storage::layout::{STDERR_LOG, STDOUT_LOG};
use mom_storage::{CompareError, compare_directories, read_mutation_set_partial};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    /// The operator misbehaved: wrong output, bad exit, timeout.
    Failed { message: String, details: Vec<String> },
    /// The harness could not judge the case.
    Errored { message: String, details: Vec<String> },
    Skipped { message: String },
}

impl CaseOutcome {
    pub fn failed(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::Failed {
            message: message.into(),
            details,
        }
    }

    pub fn errored(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::Errored {
            message: message.into(),
            details,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            CaseOutcome::Passed => "passed",
            CaseOutcome::Failed { .. } => "failed",
            CaseOutcome::Errored { .. } => "errored",
            CaseOutcome::Skipped { .. } => "skipped",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            CaseOutcome::Passed => None,
            CaseOutcome::Failed { message, .. }
            | CaseOutcome::Errored { message, .. }
            | CaseOutcome::Skipped { message } => Some(message),
        }
    }

    pub fn details(&self) -> &[String] {
        match self {
            CaseOutcome::Failed { details, .. } | CaseOutcome::Errored { details, .. } => details,
            CaseOutcome::Passed | CaseOutcome::Skipped { .. } => &[],
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CaseOutcome::Failed { .. } | CaseOutcome::Errored { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseResult {
    pub name: String,
    pub relative_dir: PathBuf,
    pub output_dir: PathBuf,
    pub duration: Duration,
    pub outcome: CaseOutcome,
    pub stdout: String,
    pub stderr: String,
}

impl CaseResult {
    fn empty(name: String, relative_dir: &Path, output_root: &Path, outcome: CaseOutcome) -> Self {
        Self {
            name,
            relative_dir: relative_dir.to_path_buf(),
            output_dir: output_root.join(relative_dir),
            duration: Duration::ZERO,
            outcome,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn skipped(case: &TestCase, output_root: &Path, message: impl Into<String>) -> Self {
        Self::empty(
            case.name.clone(),
            &case.relative_dir,
            output_root,
            CaseOutcome::Skipped {
                message: message.into(),
            },
        )
    }

    pub fn invalid(err: &DiscoveryError, output_root: &Path) -> Self {
        Self::empty(
            err.relative_dir.to_string_lossy().into_owned(),
            &err.relative_dir,
            output_root,
            CaseOutcome::errored("invalid test directory", vec![err.to_string()]),
        )
    }
}

/// Runs one case to a verdict and applies the preserve policy.
pub fn run_case(case: &TestCase, config: &HarnessConfig, cancel: &CancelToken) -> CaseResult {
    let started = Instant::now();
    let mut result = CaseResult::empty(
        case.name.clone(),
        &case.relative_dir,
        &config.output_root,
        CaseOutcome::Passed,
    );
    let (outcome, output) = execute(case, config, &result.output_dir, cancel);
    if let Some(output) = output {
        result.stdout = output.stdout_tail;
        result.stderr = output.stderr_tail;
    }
    result.outcome = outcome;
    result.duration = started.elapsed();
    tracing::info!(
        case = %case.name,
        status = result.outcome.status(),
        duration_ms = result.duration.as_millis() as u64,
        "case finished"
    );
    if result.outcome.is_passed() && config.preserve == PreservePolicy::OnFailure {
        if let Err(err) = std::fs::remove_dir_all(&result.output_dir) {
            tracing::warn!(
                dir = %result.output_dir.display(),
                error = %err,
                "failed to clean up output"
            );
        }
    }
    result
}

fn execute(
    case: &TestCase,
    config: &HarnessConfig,
    output_dir: &Path,
    cancel: &CancelToken,
) -> (CaseOutcome, Option<RunOutput>) {
    if output_dir.exists() {
        if let Err(err) = std::fs::remove_dir_all(output_dir) {
            let message = format!("failed to clear {}: {err}", output_dir.display());
            return (CaseOutcome::errored(message, Vec::new()), None);
        }
    }
    if let Err(err) = std::fs::create_dir_all(output_dir) {
        let message = format!("failed to create {}: {err}", output_dir.display());
        return (CaseOutcome::errored(message, Vec::new()), None);
    }

    let binary_name = config.binary_override.as_deref().unwrap_or(&case.binary_name);
    let binary = match resolve_binary(binary_name, &case.dir) {
        Ok(binary) => binary,
        Err(err) => {
            return (
                CaseOutcome::errored(format!("cannot start operator: {err}"), Vec::new()),
                None,
            );
        }
    };

    let request = RunRequest::new(binary, output_dir.join(STDOUT_LOG), output_dir.join(STDERR_LOG))
        .args(operator_args(case, output_dir))
        .working_dir(&case.dir)
        .timeout(config.case_timeout);
    tracing::debug!(case = %case.name, args = ?request.args, "running operator");

    match run(&request, cancel) {
        Ok(output) => {
            let outcome = classify_success(case, config, output_dir);
            (outcome, Some(output))
        }
        Err(RunError::Exit { status, output }) => {
            let outcome = match case.desired_error {
                DesiredError::NonZeroReturn => CaseOutcome::Passed,
                DesiredError::None if !output_dir.is_dir() => {
                    CaseOutcome::errored("output directory missing after exit", Vec::new())
                }
                DesiredError::None => {
                    let (partial, errors) = read_mutation_set_partial(output_dir);
                    let mut details =
                        vec![format!("partial output: {} mutation(s) read", partial.len())];
                    details.extend(errors.messages());
                    CaseOutcome::failed(format!("operator exited with status {status}"), details)
                }
            };
            (outcome, Some(output))
        }
        Err(RunError::Timeout { timeout, output }) => (
            CaseOutcome::failed(format!("operator timed out after {timeout:?}"), Vec::new()),
            Some(output),
        ),
        Err(RunError::Cancelled { output }) => (
            CaseOutcome::Skipped {
                message: "cancelled while running".to_string(),
            },
            Some(output),
        ),
        Err(err @ (RunError::Start { .. } | RunError::Io { .. })) => {
            (CaseOutcome::errored(format!("cannot run operator: {err}"), Vec::new()), None)
        }
    }
}

fn classify_success(case: &TestCase, config: &HarnessConfig, output_dir: &Path) -> CaseOutcome {
    if !output_dir.is_dir() {
        return CaseOutcome::errored("output directory missing after exit", Vec::new());
    }
    if case.desired_error == DesiredError::NonZeroReturn {
        return CaseOutcome::failed("expected non-zero exit", Vec::new());
    }
    match compare_directories(&case.expected_dir, output_dir, config.policy.as_ref()) {
        Ok(differences) if differences.is_empty() => CaseOutcome::Passed,
        Ok(differences) => CaseOutcome::failed(
            format!("{} difference(s) from expected output", differences.len()),
            differences,
        ),
        Err(CompareError::Actual(errors)) => CaseOutcome::failed(
            "operator output is not a valid mutation directory",
            errors.messages(),
        ),
        Err(CompareError::Expected(errors)) => {
            CaseOutcome::errored("expected output cannot be read", errors.messages())
        }
    }
}

/// `apply-configuration --input-dir D --output-dir D [--now T] [--controllers a,b]`
pub fn operator_args(case: &TestCase, output_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "apply-configuration".into(),
        "--input-dir".into(),
        case.input_dir.clone().into(),
        "--output-dir".into(),
        output_dir.into(),
    ];
    if let Some(now) = case.now.and_then(|now| now.format(&Rfc3339).ok()) {
        args.push("--now".into());
        args.push(now.into());
    }
    let selection = ControllerSelection::parse(&case.controllers);
    if !selection.is_empty() {
        args.push("--controllers".into());
        args.push(selection.to_flag().into());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn args_include_optional_flags() {
        let case = TestCase {
            name: "x".into(),
            description: String::new(),
            dir: PathBuf::from("/tests/x"),
            relative_dir: PathBuf::from("x"),
            binary_name: "op".into(),
            input_dir: PathBuf::from("/tests/x/input-dir"),
            expected_dir: PathBuf::from("/tests/x/expected-output"),
            now: Some(datetime!(2024-01-02 03:04:05 UTC)),
            controllers: vec!["alpha".into(), "-beta".into()],
            desired_error: DesiredError::None,
        };
        let args: Vec<String> = operator_args(&case, Path::new("/out/x"))
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "apply-configuration",
                "--input-dir",
                "/tests/x/input-dir",
                "--output-dir",
                "/out/x",
                "--now",
                "2024-01-02T03:04:05Z",
                "--controllers",
                "alpha,-beta",
            ]
        );

        let spaced = TestCase {
            controllers: vec![" alpha , -beta".into(), String::new()],
            ..case.clone()
        };
        let args = operator_args(&spaced, Path::new("/out/x"));
        let last = args.last().map(|arg| arg.to_string_lossy().into_owned());
        assert_eq!(last.as_deref(), Some("alpha,-beta"));

        let plain = TestCase {
            now: None,
            controllers: vec![" ".into()],
            ..case
        };
        assert_eq!(operator_args(&plain, Path::new("/out/x")).len(), 5);
    }

    #[test]
    fn outcome_accessors() {
        let failed = CaseOutcome::failed("bad", vec!["a".into()]);
        assert_eq!(failed.status(), "failed");
        assert_eq!(failed.message(), Some("bad"));
        assert_eq!(failed.details(), ["a".to_string()]);
        assert!(failed.is_failure());
        assert!(!CaseOutcome::Skipped { message: "c".into() }.is_failure());
        assert_eq!(CaseOutcome::Passed.message(), None);
    }
}
