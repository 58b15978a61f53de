#![forbid(unsafe_code)]

//! Consistency checks over a [`MutationSet`] and its allow-list. Every check
//! returns the full error list; an empty list means success.

use crate::{AllowedOutputSpec, ClusterType, MutationSet, Verb};
use std::collections::{BTreeMap, BTreeSet};

/// Verbs checked for duplicate writes. Other verbs are not checked yet.
pub const DUPLICATE_CHECKED_VERBS: &[Verb] = &[Verb::Create];

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, thiserror::Error)]
pub enum ValidationError {
    #[error("missing mutations for cluster {cluster}")]
    MissingCluster { cluster: ClusterType },
    #[error("mutations stored under {key} are declared for cluster {declared}")]
    ClusterTypeMismatch {
        key: ClusterType,
        declared: ClusterType,
    },
    #[error("{cluster}: unspecified output {id} ({verb})")]
    UnspecifiedOutput {
        cluster: ClusterType,
        verb: Verb,
        id: String,
    },
    #[error("{cluster}: detected multiple mutations for resource: {id}, action: {verb}, mutations: {count}")]
    DuplicateMutation {
        cluster: ClusterType,
        verb: Verb,
        id: String,
        count: usize,
    },
    #[error("allowed outputs list {resource}.{group} with mixed versions: {}", .versions.join(", "))]
    MixedVersions {
        group: String,
        resource: String,
        versions: Vec<String>,
    },
}

/// Every intent must be covered by its own cluster's list.
pub fn validate_completeness(set: &MutationSet, spec: &AllowedOutputSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (cluster, _) in set.partitions() {
        let filtered = set.filtered_by(cluster, Some(spec.for_cluster(cluster)));
        let mut kept: BTreeMap<&str, usize> = BTreeMap::new();
        for intent in filtered.intents_for(cluster) {
            *kept.entry(intent.id()).or_default() += 1;
        }
        for intent in set.intents_for(cluster) {
            match kept.get_mut(intent.id()) {
                Some(count) if *count > 0 => *count -= 1,
                _ => errors.push(ValidationError::UnspecifiedOutput {
                    cluster,
                    verb: intent.verb(),
                    id: intent.id().to_string(),
                }),
            }
        }
    }
    errors.sort();
    errors
}

pub fn validate_structure(set: &MutationSet) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for cluster in ClusterType::ALL {
        match set.partition(cluster) {
            None => errors.push(ValidationError::MissingCluster { cluster }),
            Some(part) if part.cluster() != cluster => {
                errors.push(ValidationError::ClusterTypeMismatch {
                    key: cluster,
                    declared: part.cluster(),
                });
            }
            Some(_) => {}
        }
    }
    errors
}

pub fn validate_no_duplicates(set: &MutationSet) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (cluster, _) in set.partitions() {
        for verb in DUPLICATE_CHECKED_VERBS {
            for (id, count) in set.find_duplicates(cluster, *verb) {
                errors.push(ValidationError::DuplicateMutation {
                    cluster,
                    verb: *verb,
                    id,
                    count,
                });
            }
        }
    }
    errors
}

/// One version per group+resource across the whole contract.
pub fn validate_allowed_output_spec(spec: &AllowedOutputSpec) -> Vec<ValidationError> {
    let mut versions: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
    for cluster in ClusterType::ALL {
        let list = spec.for_cluster(cluster);
        let type_ids = list
            .exact_resources
            .iter()
            .map(|r| &r.type_id)
            .chain(list.generated_name_resources.iter().map(|r| &r.type_id));
        for type_id in type_ids {
            versions
                .entry((type_id.group.as_str(), type_id.resource.as_str()))
                .or_default()
                .insert(type_id.version.as_str());
        }
    }
    versions
        .into_iter()
        .filter(|(_, seen)| seen.len() > 1)
        .map(|((group, resource), seen)| ValidationError::MixedVersions {
            group: group.to_string(),
            resource: resource.to_string(),
            versions: seen.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

/// Structure, then completeness, then duplicates.
pub fn validate_all(set: &MutationSet, spec: &AllowedOutputSpec) -> Vec<ValidationError> {
    let mut errors = validate_structure(set);
    errors.extend(validate_completeness(set, spec));
    errors.extend(validate_no_duplicates(set));
    errors
}

#[cfg(test)]
mod tests;
