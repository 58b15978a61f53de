#![forbid(unsafe_code)]

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("io: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse: {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("structure: {}: {message}", .path.display())]
    Structure { path: PathBuf, message: String },
    #[error("duplicate target: {}: {id}", .path.display())]
    DuplicateTarget { path: PathBuf, id: String },
    #[error("encode: {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },
}

impl CodecError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn structure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Structure {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Every problem found in one read or write pass.
#[derive(Debug, Default)]
pub struct CodecErrors(pub Vec<CodecError>);

impl CodecErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CodecError> {
        self.0.iter()
    }

    /// One line per error.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for CodecErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CodecErrors {}

impl From<Vec<CodecError>> for CodecErrors {
    fn from(value: Vec<CodecError>) -> Self {
        Self(value)
    }
}
