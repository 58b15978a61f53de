#![forbid(unsafe_code)]

use crate::document::{parse_document, render_document};
use crate::error::{CodecError, CodecErrors};
use crate::layout::{
    GITKEEP, GITKEEP_CONTENT, ROOT_LOG_FILES, cluster_dir, file_name, has_document_extension,
    parse_file_name, verb_dir,
};
use mom_core::{ClusterType, MutationIntent, MutationSet, ResourceIdentity, Verb};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes every cluster and verb directory under `root`, one file per intent.
/// Empty verb directories get a `.gitkeep` marker.
pub fn write_mutation_set(root: &Path, set: &MutationSet) -> Result<(), CodecErrors> {
    let mut errors = Vec::new();
    for cluster in ClusterType::ALL {
        for verb in Verb::ALL {
            let dir = verb_dir(root, cluster, verb);
            if let Err(err) = fs::create_dir_all(&dir) {
                errors.push(CodecError::io(&dir, err));
                continue;
            }
            let intents: Vec<&MutationIntent> = set.intents_for_verb(cluster, verb).collect();
            if intents.is_empty() {
                let marker = dir.join(GITKEEP);
                if let Err(err) = fs::write(&marker, GITKEEP_CONTENT) {
                    errors.push(CodecError::io(marker, err));
                }
                continue;
            }
            write_bucket(&dir, &intents, &mut errors);
        }
    }
    tracing::debug!(
        root = %root.display(),
        intents = set.len(),
        errors = errors.len(),
        "wrote mutation directory"
    );
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

fn write_bucket(dir: &Path, intents: &[&MutationIntent], errors: &mut Vec<CodecError>) {
    let mut written: BTreeSet<String> = BTreeSet::new();
    let mut generated: BTreeMap<String, usize> = BTreeMap::new();
    for intent in intents {
        let target = intent.target();
        if let Err(message) = target
            .validate()
            .map_err(|err| err.to_string())
            .and_then(|()| check_metadata(target, intent.content()))
        {
            errors.push(CodecError::structure(dir, format!("{}: {message}", intent.id())));
            continue;
        }
        let index = match target {
            ResourceIdentity::Exact(_) => 0,
            ResourceIdentity::GeneratedName(_) => {
                let next = generated.entry(file_name(target, 0)).or_default();
                *next += 1;
                *next
            }
        };
        let name = file_name(target, index);
        let path = dir.join(&name);
        if !written.insert(name) {
            errors.push(CodecError::DuplicateTarget {
                path,
                id: intent.id().to_string(),
            });
            continue;
        }
        let rendered = match render_document(intent.content()) {
            Ok(rendered) => rendered,
            Err(message) => {
                errors.push(CodecError::Encode { path, message });
                continue;
            }
        };
        if let Err(err) = fs::write(&path, rendered) {
            errors.push(CodecError::io(path, err));
        }
    }
}

pub fn read_mutation_set(root: &Path) -> Result<MutationSet, CodecErrors> {
    let (set, errors) = read_mutation_set_partial(root);
    if errors.is_empty() { Ok(set) } else { Err(errors) }
}

/// Reads as much of `root` as possible. Returns everything that decoded
/// together with every problem found.
pub fn read_mutation_set_partial(root: &Path) -> (MutationSet, CodecErrors) {
    let mut set = MutationSet::new();
    let mut errors = Vec::new();
    let entries = match sorted_entries(root) {
        Ok(entries) => entries,
        Err(err) => {
            errors.push(err);
            return (set, errors.into());
        }
    };
    for (name, path, is_dir) in entries {
        if is_dir && name.parse::<ClusterType>().is_ok() {
            continue;
        }
        if !is_dir && ROOT_LOG_FILES.contains(&name.as_str()) {
            continue;
        }
        errors.push(CodecError::structure(path, "unexpected entry in mutation directory"));
    }
    for cluster in ClusterType::ALL {
        let dir = cluster_dir(root, cluster);
        if dir.is_dir() {
            read_cluster(root, cluster, &mut set, &mut errors);
        }
    }
    tracing::debug!(
        root = %root.display(),
        intents = set.len(),
        errors = errors.len(),
        "read mutation directory"
    );
    (set, errors.into())
}

fn read_cluster(
    root: &Path,
    cluster: ClusterType,
    set: &mut MutationSet,
    errors: &mut Vec<CodecError>,
) {
    let dir = cluster_dir(root, cluster);
    match sorted_entries(&dir) {
        Ok(entries) => {
            for (name, path, is_dir) in entries {
                if !(is_dir && name.parse::<Verb>().is_ok()) {
                    errors.push(CodecError::structure(
                        path,
                        "unexpected entry in cluster directory",
                    ));
                }
            }
        }
        Err(err) => {
            errors.push(err);
            return;
        }
    }
    for verb in Verb::ALL {
        let dir = verb_dir(root, cluster, verb);
        if dir.is_dir() {
            read_bucket(&dir, cluster, verb, set, errors);
        }
    }
}

fn read_bucket(
    dir: &Path,
    cluster: ClusterType,
    verb: Verb,
    set: &mut MutationSet,
    errors: &mut Vec<CodecError>,
) {
    let entries = match sorted_entries(dir) {
        Ok(entries) => entries,
        Err(err) => {
            errors.push(err);
            return;
        }
    };
    let mut seen: BTreeMap<ResourceIdentity, PathBuf> = BTreeMap::new();
    for (name, path, is_dir) in entries {
        if name == GITKEEP && !is_dir {
            continue;
        }
        if is_dir || !has_document_extension(&name) {
            errors.push(CodecError::structure(
                path,
                "only .yaml, .yml and .json files are allowed in a verb directory",
            ));
            continue;
        }
        let (target, _) = match parse_file_name(&name) {
            Ok(parsed) => parsed,
            Err(message) => {
                errors.push(CodecError::structure(path, message));
                continue;
            }
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                errors.push(CodecError::io(path, err));
                continue;
            }
        };
        let content = match parse_document(&bytes) {
            Ok(content) => content,
            Err(message) => {
                errors.push(CodecError::Parse { path, message });
                continue;
            }
        };
        if let Err(message) = check_metadata(&target, &content) {
            errors.push(CodecError::structure(path, message));
            continue;
        }
        if matches!(target, ResourceIdentity::Exact(_)) {
            if let Some(first) = seen.get(&target) {
                errors.push(CodecError::DuplicateTarget {
                    path,
                    id: format!("{verb}-{target} (also in {})", first.display()),
                });
                continue;
            }
            seen.insert(target.clone(), path);
        }
        set.add(MutationIntent::new(verb, target, content), cluster);
    }
}

// Exact targets must agree with metadata.name / metadata.namespace when the
// document carries them.
fn check_metadata(target: &ResourceIdentity, content: &Value) -> Result<(), String> {
    let ResourceIdentity::Exact(exact) = target else {
        return Ok(());
    };
    if let Some(name) = content.pointer("/metadata/name").and_then(Value::as_str) {
        if name != exact.name {
            return Err(format!(
                "metadata.name {name:?} does not match file name {:?}",
                exact.name
            ));
        }
    }
    if let Some(namespace) = content.pointer("/metadata/namespace").and_then(Value::as_str) {
        if namespace != exact.namespace {
            return Err(format!(
                "metadata.namespace {namespace:?} does not match file name {:?}",
                exact.namespace
            ));
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>, CodecError> {
    let read = fs::read_dir(dir).map_err(|err| CodecError::io(dir, err))?;
    let mut out = Vec::new();
    for entry in read {
        let entry = entry.map_err(|err| CodecError::io(dir, err))?;
        let path = entry.path();
        let is_dir = entry
            .file_type()
            .map_err(|err| CodecError::io(&path, err))?
            .is_dir();
        let name = entry.file_name().to_string_lossy().into_owned();
        out.push((name, path, is_dir));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

#[cfg(test)]
mod tests;
