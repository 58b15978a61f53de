#![forbid(unsafe_code)]

//! Out-of-process execution with a bounded wall clock and captured logs.

mod bin_detect;
mod cancel;
mod process;
mod tail;

pub use bin_detect::{
    ResolveError, find_executable_in_dirs, find_executable_in_path, is_executable, resolve_binary,
};
pub use cancel::CancelToken;
pub use process::{RunError, RunOutput, RunRequest, run};
pub use tail::{DEFAULT_TAIL_BYTES, read_tail};
