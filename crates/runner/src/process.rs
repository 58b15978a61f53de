#![forbid(unsafe_code)]

use crate::cancel::CancelToken;
use crate::tail::{DEFAULT_TAIL_BYTES, read_tail};
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POLL: Duration = Duration::from_millis(20);

#[derive(Clone, Debug)]
pub struct RunRequest {
    pub binary: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
    pub timeout: Duration,
    pub tail_limit: usize,
    pub poll_interval: Duration,
}

impl RunRequest {
    pub fn new(
        binary: impl Into<PathBuf>,
        stdout_path: impl Into<PathBuf>,
        stderr_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            working_dir: None,
            stdout_path: stdout_path.into(),
            stderr_path: stderr_path.into(),
            timeout: DEFAULT_TIMEOUT,
            tail_limit: DEFAULT_TAIL_BYTES,
            poll_interval: DEFAULT_POLL,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tail_limit(mut self, limit: usize) -> Self {
        self.tail_limit = limit;
        self
    }
}

/// What the child left behind: exit code and the tails of both logs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub stdout_tail: String,
    pub stderr_tail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to start {}: {source}", .binary.display())]
    Start {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {:?}", .timeout)]
    Timeout { timeout: Duration, output: RunOutput },
    #[error("cancelled after {:?}", .output.duration)]
    Cancelled { output: RunOutput },
    #[error("exited with status {status}")]
    Exit { status: String, output: RunOutput },
    #[error("io: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// Captured output, when the child got far enough to produce any.
    pub fn output(&self) -> Option<&RunOutput> {
        match self {
            RunError::Timeout { output, .. }
            | RunError::Cancelled { output }
            | RunError::Exit { output, .. } => Some(output),
            RunError::Start { .. } | RunError::Io { .. } => None,
        }
    }
}

enum Finish {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// Runs the request to completion, killing the child's process group when
/// the timeout passes or `cancel` trips.
pub fn run(request: &RunRequest, cancel: &CancelToken) -> Result<RunOutput, RunError> {
    let stdout_file = create_log(&request.stdout_path)?;
    let stderr_file = create_log(&request.stderr_path)?;

    let mut cmd = Command::new(&request.binary);
    cmd.args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));
    if let Some(dir) = &request.working_dir {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| RunError::Start {
        binary: request.binary.clone(),
        source,
    })?;
    drop(cmd);
    tracing::debug!(binary = %request.binary.display(), pid = child.id(), "spawned");

    let finish = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Finish::Exited(status),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "try_wait failed"),
        }
        if cancel.is_cancelled() {
            terminate(&mut child);
            break Finish::Cancelled;
        }
        if started.elapsed() >= request.timeout {
            terminate(&mut child);
            break Finish::TimedOut;
        }
        sleep(request.poll_interval);
    };

    let output = RunOutput {
        exit_code: match &finish {
            Finish::Exited(status) => status.code(),
            _ => None,
        },
        duration: started.elapsed(),
        stdout_tail: load_tail(&request.stdout_path, request.tail_limit)?,
        stderr_tail: load_tail(&request.stderr_path, request.tail_limit)?,
    };

    match finish {
        Finish::Exited(status) if status.success() => Ok(output),
        Finish::Exited(status) => Err(RunError::Exit {
            status: format_exit_status(&status),
            output,
        }),
        Finish::TimedOut => {
            tracing::warn!(
                binary = %request.binary.display(),
                timeout = ?request.timeout,
                "killed after timeout"
            );
            Err(RunError::Timeout {
                timeout: request.timeout,
                output,
            })
        }
        Finish::Cancelled => Err(RunError::Cancelled { output }),
    }
}

fn create_log(path: &Path) -> Result<File, RunError> {
    File::create(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_tail(path: &Path, limit: usize) -> Result<String, RunError> {
    read_tail(path, limit).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(err) = killpg(pgid, Signal::SIGKILL) {
        tracing::debug!(error = %err, "killpg failed; killing child only");
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn format_exit_status(status: &ExitStatus) -> String {
    status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}
