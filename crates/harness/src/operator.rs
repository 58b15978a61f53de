#![forbid(unsafe_code)]

//! Operator side of the golden-test contract: the `apply-configuration`
//! command an operator binary exposes to the harness.

use mom_core::validation::{validate_all, validate_allowed_output_spec};
use mom_core::{AllowedOutputSpec, ControllerSelection, MutationSet, UnknownControllerError};
use mom_storage::write_mutation_set;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Everything an operator sees for one invocation.
#[derive(Clone, Debug)]
pub struct OperatorInput<'a> {
    pub input_dir: &'a Path,
    pub now: OffsetDateTime,
    /// Empty when no selection was given: every controller runs.
    pub controllers: &'a ControllerSelection,
}

impl OperatorInput<'_> {
    pub fn controller_enabled(&self, name: &str) -> bool {
        self.controllers.is_empty() || self.controllers.is_enabled(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct OperatorError(pub String);

impl OperatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait Operator {
    fn name(&self) -> &str;

    /// Controller names accepted by `--controllers`.
    fn controllers(&self) -> Vec<String>;

    fn allowed_outputs(&self) -> AllowedOutputSpec;

    fn apply_configuration(&self, input: &OperatorInput<'_>) -> Result<MutationSet, OperatorError>;
}

#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
pub struct ApplyConfigurationArgs {
    /// Directory holding the input resources
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Directory the declared mutations are written to
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Clock override (RFC3339)
    #[arg(long, value_parser = parse_rfc3339)]
    pub now: Option<OffsetDateTime>,

    /// Controllers to run: names, `-name` to disable, `*` for all
    #[arg(long, value_delimiter = ',')]
    pub controllers: Vec<String>,
}

pub fn parse_rfc3339(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| format!("invalid RFC3339 timestamp {raw:?}: {err}"))
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyConfigurationError {
    #[error(transparent)]
    UnknownController(#[from] UnknownControllerError),
    #[error("input directory {} does not exist", .0.display())]
    MissingInput(PathBuf),
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("operator {operator} failed: {source}")]
    Operator {
        operator: String,
        #[source]
        source: OperatorError,
    },
    #[error("{} problem(s) with declared mutations:\n  {}", .0.len(), .0.join("\n  "))]
    Invalid(Vec<String>),
}

/// Validates flags, runs the operator, checks its mutations and writes them
/// under `--output-dir`. Output is written even when checks fail so it can
/// be inspected.
pub fn run_apply_configuration(
    operator: &dyn Operator,
    args: &ApplyConfigurationArgs,
) -> Result<MutationSet, ApplyConfigurationError> {
    let selection = ControllerSelection::parse(&args.controllers);
    if !selection.is_empty() {
        selection.validate(&operator.controllers())?;
    }
    if !args.input_dir.is_dir() {
        return Err(ApplyConfigurationError::MissingInput(args.input_dir.clone()));
    }
    std::fs::create_dir_all(&args.output_dir).map_err(|source| ApplyConfigurationError::OutputDir {
        path: args.output_dir.clone(),
        source,
    })?;

    let input = OperatorInput {
        input_dir: &args.input_dir,
        now: args.now.unwrap_or_else(OffsetDateTime::now_utc),
        controllers: &selection,
    };
    let declared = operator
        .apply_configuration(&input)
        .map_err(|source| ApplyConfigurationError::Operator {
            operator: operator.name().to_string(),
            source,
        })?;
    let mutations = if selection.is_empty() {
        declared
    } else {
        declared.retain_controllers(&selection)
    };

    let allowed = operator.allowed_outputs();
    let mut problems: Vec<String> = validate_allowed_output_spec(&allowed)
        .iter()
        .chain(validate_all(&mutations, &allowed).iter())
        .map(ToString::to_string)
        .collect();
    if let Err(errors) = write_mutation_set(&args.output_dir, &mutations) {
        problems.extend(errors.messages());
    }
    tracing::info!(
        operator = operator.name(),
        mutations = mutations.len(),
        problems = problems.len(),
        "apply-configuration finished"
    );
    if problems.is_empty() {
        Ok(mutations)
    } else {
        Err(ApplyConfigurationError::Invalid(problems))
    }
}
