#![forbid(unsafe_code)]

use crate::document::parse_document;
use crate::error::CodecError;
use mom_core::AllowedOutputSpec;
use std::path::Path;

/// Loads an allow-list document (JSON or YAML). Documents in the historical
/// shape are migrated on load.
pub fn read_allowed_output_spec(path: &Path) -> Result<AllowedOutputSpec, CodecError> {
    let bytes = std::fs::read(path).map_err(|err| CodecError::io(path, err))?;
    let value = parse_document(&bytes).map_err(|message| CodecError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    if AllowedOutputSpec::is_legacy(&value) {
        tracing::warn!(
            path = %path.display(),
            "allowed outputs use historical key names; migrating"
        );
    }
    AllowedOutputSpec::from_value(value).map_err(|err| CodecError::structure(path, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mom_core::ExactResource;

    #[test]
    fn reads_yaml_allow_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("allowed.yaml");
        std::fs::write(
            &path,
            "managementResources:\n  exactResources:\n  - group: \"\"\n    version: v1\n    resource: secrets\n    namespace: foo\n    name: bar\n",
        )
        .expect("write");
        let spec = read_allowed_output_spec(&path).expect("read");
        assert_eq!(
            spec.management_resources.exact_resources,
            vec![ExactResource::secret("foo", "bar")]
        );
    }

    #[test]
    fn bad_documents_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("allowed.yaml");
        std::fs::write(&path, "unknownKey: {}\n").expect("write");
        assert!(matches!(read_allowed_output_spec(&path), Err(CodecError::Structure { .. })));
        assert!(matches!(
            read_allowed_output_spec(&dir.path().join("absent.yaml")),
            Err(CodecError::Io { .. })
        ));
    }
}
