#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

fn path_contains_separator(cmd: &str) -> bool {
    cmd.contains(std::path::MAIN_SEPARATOR) || cmd.contains('/')
}

pub fn find_executable_in_path(name: &str) -> Option<PathBuf> {
    if name.trim().is_empty() {
        return None;
    }
    let path_var = std::env::var_os("PATH")?;
    let dirs = std::env::split_paths(&path_var).collect::<Vec<_>>();
    find_executable_in_dirs(name, &dirs)
}

pub fn find_executable_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    if name.trim().is_empty() {
        return None;
    }
    dirs.iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("binary name is empty")]
    Empty,
    #[error("{} is not an executable file", .0.display())]
    NotExecutable(PathBuf),
    #[error("{0:?} was not found on PATH")]
    NotOnPath(String),
}

/// A value with a path separator is a path (relative ones are taken from
/// `base_dir`); a bare name is looked up on `PATH`.
pub fn resolve_binary(value: &str, base_dir: &Path) -> Result<PathBuf, ResolveError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::Empty);
    }
    if path_contains_separator(trimmed) {
        let path = Path::new(trimmed);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(ResolveError::NotExecutable(path))
        };
    }
    find_executable_in_path(trimmed).ok_or_else(|| ResolveError::NotOnPath(trimmed.to_string()))
}
