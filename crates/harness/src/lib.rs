#![forbid(unsafe_code)]

//! Golden-file test harness for operators that declare their writes as a
//! mutation directory, plus the operator-side `apply-configuration` contract.

pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod execution;
pub mod logging;
pub mod operator;
pub mod report;
pub mod suite;

pub use config::{HarnessConfig, PreservePolicy};
pub use execution::{CaseOutcome, CaseResult};
pub use operator::{
    ApplyConfigurationArgs, Operator, OperatorError, OperatorInput, run_apply_configuration,
};
pub use suite::{HarnessError, SuiteReport, run_suite};
