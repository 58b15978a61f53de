#![forbid(unsafe_code)]

//! mom - mutation contract validation and golden tests

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mom_core::equivalence::{ComparisonPolicy, FieldPattern, IgnoreFields, Strict};
use mom_core::validation::{
    validate_allowed_output_spec, validate_completeness, validate_no_duplicates, validate_structure,
};
use mom_harness::config::DEFAULT_SUITE_NAME;
use mom_harness::report::JUNIT_FILE;
use mom_harness::{CaseOutcome, HarnessConfig, PreservePolicy, logging, run_suite};
use mom_runner::CancelToken;
use mom_storage::{compare_directories, read_allowed_output_spec, read_mutation_set};

/// mom - mutation contract validation and golden tests
#[derive(Parser, Debug)]
#[command(name = "mom")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run golden tests against an operator binary
    #[command(subcommand)]
    Test(TestCommand),

    /// Check a mutation directory for structural problems and, with an
    /// allow-list, for unspecified outputs
    ValidateOutput(ValidateArgs),

    /// Compare two mutation directories
    Diff(DiffArgs),
}

#[derive(Subcommand, Debug)]
enum TestCommand {
    /// Run every `test.yaml` case under the test directory
    ApplyConfiguration(TestArgs),
}

#[derive(Args, Debug)]
struct TestArgs {
    /// Root searched for test.yaml files
    #[arg(long, env = "MOM_TEST_DIR")]
    test_dir: PathBuf,

    /// Root for per-case output and reports
    #[arg(long, env = "MOM_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Per-case timeout in seconds
    #[arg(long, env = "MOM_TIMEOUT_S", default_value_t = 5)]
    timeout: u64,

    /// Whole-run timeout in seconds; unstarted cases are skipped
    #[arg(long, env = "MOM_SUITE_TIMEOUT_S")]
    suite_timeout: Option<u64>,

    #[arg(
        long,
        env = "MOM_PRESERVE_POLICY",
        value_enum,
        default_value_t = PreservePolicy::OnFailure
    )]
    preserve_policy: PreservePolicy,

    /// Number of cases run at once
    #[arg(long, env = "MOM_PARALLELISM", default_value_t = 1)]
    parallelism: usize,

    #[arg(long, env = "MOM_SUITE_NAME", default_value = DEFAULT_SUITE_NAME)]
    suite_name: String,

    /// Operator binary used instead of each test's binaryName
    #[arg(long)]
    binary: Option<String>,

    #[command(flatten)]
    policy: PolicyArgs,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Mutation directory to check
    dir: PathBuf,

    /// Allow-list document (YAML or JSON)
    #[arg(long)]
    allowed_outputs: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiffArgs {
    expected: PathBuf,
    actual: PathBuf,

    #[command(flatten)]
    policy: PolicyArgs,
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Compare every field, including server-populated ones
    #[arg(long)]
    strict: bool,

    /// Leave Events out of the comparison
    #[arg(long)]
    ignore_events: bool,

    /// Additional field pattern to ignore, e.g. `status.conditions[*].message`
    #[arg(long = "ignore-field", value_parser = parse_pattern)]
    ignore_fields: Vec<FieldPattern>,
}

fn parse_pattern(raw: &str) -> Result<FieldPattern, String> {
    raw.parse().map_err(|err: mom_core::equivalence::PatternError| err.to_string())
}

impl PolicyArgs {
    fn build(&self) -> Arc<dyn ComparisonPolicy> {
        if self.strict && !self.ignore_events && self.ignore_fields.is_empty() {
            return Arc::new(Strict);
        }
        let base = if self.strict {
            IgnoreFields::default()
        } else {
            IgnoreFields::nondeterministic()
        };
        let policy = self
            .ignore_fields
            .iter()
            .cloned()
            .fold(base, IgnoreFields::with_pattern)
            .ignore_events(self.ignore_events);
        Arc::new(policy)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::Test(TestCommand::ApplyConfiguration(args)) => run_tests(args),
        Commands::ValidateOutput(args) => validate_output(args),
        Commands::Diff(args) => diff(args),
    }
}

fn run_tests(args: TestArgs) -> Result<ExitCode> {
    let mut config = HarnessConfig::new(&args.test_dir, &args.output_dir);
    config.suite_name = args.suite_name;
    config.case_timeout = Duration::from_secs(args.timeout);
    config.suite_timeout = args.suite_timeout.map(Duration::from_secs);
    config.preserve = args.preserve_policy;
    config.parallelism = args.parallelism.max(1);
    config.binary_override = args.binary;
    config.policy = args.policy.build();

    let cancel = CancelToken::new();
    install_termination_handler(&cancel)?;
    let report = run_suite(&config, &cancel).context("test run failed")?;

    for case in &report.cases {
        println!(
            "{:<7} {} ({:.2}s)",
            case.outcome.status().to_uppercase(),
            case.name,
            case.duration.as_secs_f64()
        );
        if let Some(message) = case.outcome.message() {
            println!("        {message}");
        }
        for detail in case.outcome.details() {
            for line in detail.lines() {
                println!("          {line}");
            }
        }
        if matches!(case.outcome, CaseOutcome::Failed { .. } | CaseOutcome::Errored { .. }) {
            println!("        output: {}", case.output_dir.display());
        }
    }
    println!(
        "{} passed, {} failed, {} errored, {} skipped{}",
        report.count("passed"),
        report.count("failed"),
        report.count("errored"),
        report.count("skipped"),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    println!("report: {}", config.output_root.join(JUNIT_FILE).display());

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// The first SIGINT/SIGTERM cancels the run so the in-flight operator is
/// killed and reports are written; a second one exits at once.
fn install_termination_handler(cancel: &CancelToken) -> Result<()> {
    use signal_hook::consts::TERM_SIGNALS;
    use signal_hook::flag;

    for &signal in TERM_SIGNALS {
        flag::register_conditional_shutdown(signal, 130, cancel.flag())
            .context("failed to install signal handler")?;
        flag::register(signal, cancel.flag()).context("failed to install signal handler")?;
    }
    Ok(())
}

fn validate_output(args: ValidateArgs) -> Result<ExitCode> {
    let set = match read_mutation_set(&args.dir) {
        Ok(set) => set,
        Err(errors) => {
            for message in errors.messages() {
                println!("{message}");
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut problems = validate_structure(&set);
    problems.extend(validate_no_duplicates(&set));
    if let Some(path) = &args.allowed_outputs {
        let allowed = read_allowed_output_spec(path)
            .with_context(|| format!("failed to load allowed outputs from {}", path.display()))?;
        problems.extend(validate_allowed_output_spec(&allowed));
        problems.extend(validate_completeness(&set, &allowed));
    }

    if problems.is_empty() {
        println!("ok: {} mutation(s)", set.len());
        return Ok(ExitCode::SUCCESS);
    }
    for problem in &problems {
        println!("{problem}");
    }
    Ok(ExitCode::FAILURE)
}

fn diff(args: DiffArgs) -> Result<ExitCode> {
    let policy = args.policy.build();
    let differences = compare_directories(&args.expected, &args.actual, policy.as_ref())?;
    if differences.is_empty() {
        println!("equivalent");
        return Ok(ExitCode::SUCCESS);
    }
    for difference in &differences {
        println!("{difference}");
    }
    Ok(ExitCode::FAILURE)
}
