#![forbid(unsafe_code)]

use crate::descriptor::{
    DESCRIPTOR_FILE, DesiredError, EXPECTED_OUTPUT_DIR, INPUT_DIR, TestDescriptor,
};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use walkdir::WalkDir;

/// A validated test directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub description: String,
    /// Directory holding `test.yaml`.
    pub dir: PathBuf,
    /// `dir` relative to the test root; mirrored under the output root.
    pub relative_dir: PathBuf,
    pub binary_name: String,
    pub input_dir: PathBuf,
    pub expected_dir: PathBuf,
    pub now: Option<OffsetDateTime>,
    pub controllers: Vec<String>,
    pub desired_error: DesiredError,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .path.display())]
pub struct DiscoveryError {
    pub path: PathBuf,
    pub relative_dir: PathBuf,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discovered {
    Case(TestCase),
    Invalid(DiscoveryError),
}

impl Discovered {
    pub fn relative_dir(&self) -> &Path {
        match self {
            Discovered::Case(case) => &case.relative_dir,
            Discovered::Invalid(err) => &err.relative_dir,
        }
    }
}

/// Walks `root` for `test.yaml` files, in path order. A malformed candidate
/// becomes an `Invalid` entry and the walk continues.
pub fn discover(root: &Path) -> Vec<Discovered> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name();
            entry.depth() == 0 || (name != INPUT_DIR && name != EXPECTED_OUTPUT_DIR)
        });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                out.push(Discovered::Invalid(DiscoveryError {
                    relative_dir: relative(root, &path),
                    path,
                    message: err.to_string(),
                }));
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name() != DESCRIPTOR_FILE {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let discovered = match load_case(root, dir) {
            Ok(case) => Discovered::Case(case),
            Err(err) => Discovered::Invalid(err),
        };
        out.push(discovered);
    }
    tracing::info!(root = %root.display(), entries = out.len(), "discovered tests");
    out
}

fn load_case(root: &Path, dir: &Path) -> Result<TestCase, DiscoveryError> {
    let relative_dir = relative(root, dir);
    let invalid = |message: String| DiscoveryError {
        path: dir.to_path_buf(),
        relative_dir: relative_dir.clone(),
        message,
    };
    let input_dir = dir.join(INPUT_DIR);
    let expected_dir = dir.join(EXPECTED_OUTPUT_DIR);
    let mut missing = Vec::new();
    if !input_dir.is_dir() {
        missing.push(INPUT_DIR);
    }
    if !expected_dir.is_dir() {
        missing.push(EXPECTED_OUTPUT_DIR);
    }
    if !missing.is_empty() {
        return Err(invalid(format!("missing {}", missing.join(" and "))));
    }
    let descriptor =
        TestDescriptor::load(&dir.join(DESCRIPTOR_FILE)).map_err(|err| invalid(err.to_string()))?;
    let name = if descriptor.test_name.trim().is_empty() {
        relative_dir.to_string_lossy().into_owned()
    } else {
        descriptor.test_name
    };
    Ok(TestCase {
        name,
        description: descriptor.description,
        dir: dir.to_path_buf(),
        relative_dir,
        binary_name: descriptor.binary_name,
        input_dir,
        expected_dir,
        now: descriptor.now,
        controllers: descriptor.controllers_to_run,
        desired_error: descriptor.desired_error,
    })
}

// The root itself is named by its last component so it never maps onto the
// output root.
fn relative(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => root
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("root")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn case_dir(root: &Path, rel: &str, descriptor: &str, input: bool, expected: bool) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).expect("dir");
        fs::write(dir.join(DESCRIPTOR_FILE), descriptor).expect("descriptor");
        if input {
            fs::create_dir_all(dir.join(INPUT_DIR)).expect("input");
        }
        if expected {
            fs::create_dir_all(dir.join(EXPECTED_OUTPUT_DIR)).expect("expected");
        }
    }

    #[test]
    fn finds_cases_in_path_order_and_reports_bad_ones() {
        let root = tempfile::tempdir().expect("tempdir");
        case_dir(root.path(), "b/second", "testName: second\nbinaryName: op\n", true, true);
        case_dir(root.path(), "a/first", "binaryName: op\n", true, true);
        case_dir(root.path(), "c/no-expected", "binaryName: op\n", true, false);
        case_dir(root.path(), "d/bad-yaml", "binaryName: [\n", true, true);

        let found = discover(root.path());
        let rels: Vec<_> = found.iter().map(|d| d.relative_dir().to_path_buf()).collect();
        assert_eq!(
            rels,
            vec![
                PathBuf::from("a/first"),
                PathBuf::from("b/second"),
                PathBuf::from("c/no-expected"),
                PathBuf::from("d/bad-yaml"),
            ]
        );
        match &found[0] {
            Discovered::Case(case) => {
                assert_eq!(case.name, "a/first");
                assert_eq!(case.input_dir, root.path().join("a/first").join(INPUT_DIR));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &found[1] {
            Discovered::Case(case) => assert_eq!(case.name, "second"),
            other => panic!("unexpected {other:?}"),
        }
        match &found[2] {
            Discovered::Invalid(err) => assert!(err.message.contains("missing expected-output")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(found[3], Discovered::Invalid(_)));
    }

    #[test]
    fn fixture_trees_are_not_searched() {
        let root = tempfile::tempdir().expect("tempdir");
        case_dir(root.path(), "case", "binaryName: op\n", true, true);
        let nested = root.path().join("case").join(INPUT_DIR).join(DESCRIPTOR_FILE);
        fs::write(nested, "").expect("nested");
        assert_eq!(discover(root.path()).len(), 1);
    }

    #[test]
    fn missing_root_is_reported() {
        let root = tempfile::tempdir().expect("tempdir");
        let found = discover(&root.path().join("absent"));
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0], Discovered::Invalid(_)));
    }
}
