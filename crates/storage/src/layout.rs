#![forbid(unsafe_code)]

//! On-disk layout of a mutation directory:
//! `<root>/<Cluster>/<Verb>/<resource>_<group>_<version>_<namespace>_<name>.yaml`.

use mom_core::{ClusterType, ExactResource, GeneratedNameResource, ResourceIdentity, Verb};
use std::path::{Path, PathBuf};

pub const GITKEEP: &str = ".gitkeep";
pub const GITKEEP_CONTENT: &str = "this file exists to get the empty directory in git\n";
pub const STDOUT_LOG: &str = "stdout.log";
pub const STDERR_LOG: &str = "stderr.log";
pub const ROOT_LOG_FILES: [&str; 2] = [STDOUT_LOG, STDERR_LOG];
pub const DOCUMENT_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];
pub const WRITE_EXTENSION: &str = "yaml";

const CORE_GROUP_SEGMENT: &str = "core";
const SEPARATOR: char = '_';
const GENERATED_MARKER: char = '@';

pub fn cluster_dir(root: &Path, cluster: ClusterType) -> PathBuf {
    root.join(cluster.as_str())
}

pub fn verb_dir(root: &Path, cluster: ClusterType, verb: Verb) -> PathBuf {
    cluster_dir(root, cluster).join(verb.as_str())
}

/// File name for `target`. `generated_index` (1-based) disambiguates
/// generated-name targets sharing a prefix and is ignored for exact ones.
pub fn file_name(target: &ResourceIdentity, generated_index: usize) -> String {
    let type_id = target.type_id();
    let group = if type_id.group.is_empty() {
        CORE_GROUP_SEGMENT
    } else {
        type_id.group.as_str()
    };
    let name = match target {
        ResourceIdentity::Exact(exact) => exact.name.clone(),
        ResourceIdentity::GeneratedName(generated) => {
            format!("{}{GENERATED_MARKER}{generated_index}", generated.generated_name)
        }
    };
    format!(
        "{}{SEPARATOR}{group}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{name}.{WRITE_EXTENSION}",
        type_id.resource,
        type_id.version,
        target.namespace(),
    )
}

pub fn has_document_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
}

/// Inverse of [`file_name`]. Returns the identity and, for generated-name
/// targets, the disambiguating index.
pub fn parse_file_name(file_name: &str) -> Result<(ResourceIdentity, Option<usize>), String> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| "file name is not valid UTF-8".to_string())?;
    let parts: Vec<&str> = stem.split(SEPARATOR).collect();
    let [resource, group, version, namespace, name] = parts.as_slice() else {
        return Err(format!(
            "expected <resource>_<group>_<version>_<namespace>_<name>, got {} segment(s)",
            parts.len()
        ));
    };
    let group = if *group == CORE_GROUP_SEGMENT { "" } else { group };
    let identity = match name.rsplit_once(GENERATED_MARKER) {
        Some((prefix, index)) => {
            let index: usize = index
                .parse()
                .map_err(|_| format!("invalid generated-name index {index:?}"))?;
            let generated =
                GeneratedNameResource::new(group, *version, *resource, *namespace, prefix);
            (ResourceIdentity::GeneratedName(generated), Some(index))
        }
        None => {
            let exact = ExactResource::new(group, *version, *resource, *namespace, *name);
            (ResourceIdentity::Exact(exact), None)
        }
    };
    identity.0.validate().map_err(|err| err.to_string())?;
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names() {
        let secret: ResourceIdentity = ExactResource::secret("foo", "bar").into();
        assert_eq!(file_name(&secret, 0), "secrets_core_v1_foo_bar.yaml");
        let ingress: ResourceIdentity = ExactResource::config_resource("ingresses").into();
        let name = file_name(&ingress, 0);
        assert_eq!(name, "ingresses_config.openshift.io_v1__cluster.yaml");
        assert_eq!(parse_file_name(&name), Ok((ingress, None)));
    }

    #[test]
    fn generated_names_carry_an_index() {
        let pod: ResourceIdentity =
            GeneratedNameResource::new("", "v1", "pods", "ns", "runner-").into();
        let name = file_name(&pod, 2);
        assert_eq!(name, "pods_core_v1_ns_runner-@2.yaml");
        assert_eq!(parse_file_name(&name), Ok((pod, Some(2))));
    }

    #[test]
    fn malformed_names() {
        assert!(parse_file_name("secrets_core_v1_bar.yaml").is_err());
        assert!(parse_file_name("secrets_core_v1_ns_a_b.yaml").is_err());
        assert!(parse_file_name("pods_core_v1_ns_runner-@x.yaml").is_err());
        assert!(parse_file_name("secrets_core__ns_bar.yaml").is_err());
        assert!(has_document_extension("a.json"));
        assert!(!has_document_extension("a.txt"));
        assert!(!has_document_extension(GITKEEP));
    }
}
