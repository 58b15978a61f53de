#![forbid(unsafe_code)]

use crate::config::HarnessConfig;
use crate::discovery::{Discovered, discover};
use crate::execution::{CaseOutcome, CaseResult, run_case};
use crate::report::write_reports;
use mom_runner::CancelToken;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write report to {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct SuiteReport {
    pub suite_name: String,
    pub started_at: OffsetDateTime,
    pub duration: Duration,
    /// One entry per discovered test directory, in discovery order.
    pub cases: Vec<CaseResult>,
    pub cancelled: bool,
}

impl SuiteReport {
    pub fn count(&self, status: &str) -> usize {
        self.cases.iter().filter(|case| case.outcome.status() == status).count()
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && !self.cases.iter().any(|case| case.outcome.is_failure())
    }
}

/// Discovers, runs and reports every case under `config.test_root`. Per-case
/// problems end up in the report; only an unusable output root or an
/// unwritable report is an error.
pub fn run_suite(
    config: &HarnessConfig,
    cancel: &CancelToken,
) -> Result<SuiteReport, HarnessError> {
    std::fs::create_dir_all(&config.output_root).map_err(|source| HarnessError::OutputRoot {
        path: config.output_root.clone(),
        source,
    })?;
    let started_at = OffsetDateTime::now_utc();
    let started = Instant::now();
    let cancel = match config.suite_timeout {
        Some(limit) => cancel.child_with_deadline(started + limit),
        None => cancel.clone(),
    };

    let entries = discover(&config.test_root);
    let cases = if config.parallelism > 1 && entries.len() > 1 {
        run_parallel(&entries, config, &cancel)
    } else {
        entries
            .iter()
            .map(|entry| run_entry(entry, config, &cancel))
            .collect()
    };

    let report = SuiteReport {
        suite_name: config.suite_name.clone(),
        started_at,
        duration: started.elapsed(),
        cancelled: stopped_early(&cases),
        cases,
    };
    tracing::info!(
        suite = %report.suite_name,
        cases = report.cases.len(),
        failed = report.count("failed"),
        errored = report.count("errored"),
        skipped = report.count("skipped"),
        cancelled = report.cancelled,
        "suite finished"
    );
    write_reports(&report, &config.output_root)?;
    Ok(report)
}

/// Only cases the token actually stopped count; a deadline passing after the
/// last case finished does not.
fn stopped_early(cases: &[CaseResult]) -> bool {
    cases
        .iter()
        .any(|case| matches!(case.outcome, CaseOutcome::Skipped { .. }))
}

fn run_entry(entry: &Discovered, config: &HarnessConfig, cancel: &CancelToken) -> CaseResult {
    match entry {
        Discovered::Invalid(err) => CaseResult::invalid(err, &config.output_root),
        Discovered::Case(case) if cancel.is_cancelled() => {
            CaseResult::skipped(case, &config.output_root, "run cancelled before the case started")
        }
        Discovered::Case(case) => run_case(case, config, cancel),
    }
}

// Workers pull the next index; a single receiver puts results back in
// discovery order.
fn run_parallel(
    entries: &[Discovered],
    config: &HarnessConfig,
    cancel: &CancelToken,
) -> Vec<CaseResult> {
    let next = AtomicUsize::new(0);
    let workers = config.parallelism.min(entries.len());
    let (tx, rx) = mpsc::channel::<(usize, CaseResult)>();
    let mut slots: Vec<Option<CaseResult>> = vec![None; entries.len()];

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(entry) = entries.get(index) else {
                        break;
                    };
                    if tx.send((index, run_entry(entry, config, cancel))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
        for (index, result) in rx {
            tracing::debug!(
                index,
                case = %result.name,
                status = result.outcome.status(),
                "collected"
            );
            slots[index] = Some(result);
        }
    });

    slots
        .into_iter()
        .zip(entries)
        .map(|(slot, entry)| {
            slot.unwrap_or_else(|| match entry {
                Discovered::Invalid(err) => CaseResult::invalid(err, &config.output_root),
                Discovered::Case(case) => {
                    CaseResult::skipped(case, &config.output_root, "worker stopped")
                }
            })
        })
        .collect()
}
