#![forbid(unsafe_code)]

//! Semantic comparison of two mutation sets. Ordering within a partition is
//! irrelevant; intents are paired by cluster, verb and stable id.

mod diff;
mod policy;

pub use diff::{FieldDiff, FieldPath, PathSegment, diff_values};
pub use policy::{ComparisonPolicy, FieldPattern, IgnoreFields, PatternError, Strict};

use crate::{ClusterType, MutationSet, Verb, value_digest};
use serde_json::Value;
use std::collections::BTreeMap;

/// Human-readable differences; empty means equivalent.
pub fn compare(expected: &MutationSet, actual: &MutationSet) -> Vec<String> {
    compare_with(expected, actual, &Strict)
}

pub fn compare_with(
    expected: &MutationSet,
    actual: &MutationSet,
    policy: &dyn ComparisonPolicy,
) -> Vec<String> {
    let mut out = Vec::new();
    for cluster in ClusterType::ALL {
        for verb in Verb::ALL {
            let left = bucket(expected, cluster, verb, policy);
            let right = bucket(actual, cluster, verb, policy);
            let mut ids: Vec<&String> = left.keys().chain(right.keys()).collect();
            ids.sort();
            ids.dedup();
            for id in ids {
                match (left.get(id), right.get(id)) {
                    (Some(_), None) => {
                        out.push(format!("{cluster}/{verb}: {id} missing in actual"));
                    }
                    (None, Some(_)) => {
                        out.push(format!("{cluster}/{verb}: {id} missing in expected"));
                    }
                    (Some(want), Some(got)) => {
                        compare_same_id(cluster, verb, id, want, got, &mut out);
                    }
                    (None, None) => {}
                }
            }
        }
    }
    out
}

fn bucket(
    set: &MutationSet,
    cluster: ClusterType,
    verb: Verb,
    policy: &dyn ComparisonPolicy,
) -> BTreeMap<String, Vec<Value>> {
    let mut by_id: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for intent in set.intents_for_verb(cluster, verb) {
        if policy.skip_intent(intent) {
            continue;
        }
        let mut content = intent.content().clone();
        prune(&mut content, &FieldPath::root(), policy);
        by_id.entry(intent.id().to_string()).or_default().push(content);
    }
    by_id
}

fn prune(value: &mut Value, path: &FieldPath, policy: &dyn ComparisonPolicy) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !policy.skip_field(&path.key(key)));
            for (key, child) in map.iter_mut() {
                prune(child, &path.key(key), policy);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                prune(child, &path.index(index), policy);
            }
        }
        _ => {}
    }
}

// Same-id intents are compared as multisets: identical documents cancel out,
// the remainder is paired in digest order.
fn compare_same_id(
    cluster: ClusterType,
    verb: Verb,
    id: &str,
    expected: &[Value],
    actual: &[Value],
    out: &mut Vec<String>,
) {
    let mut left: Vec<(String, &Value)> = expected.iter().map(|v| (value_digest(v), v)).collect();
    let mut right: Vec<(String, &Value)> = actual.iter().map(|v| (value_digest(v), v)).collect();
    left.sort_by(|a, b| a.0.cmp(&b.0));
    right.sort_by(|a, b| a.0.cmp(&b.0));
    left.retain(|(digest, _)| {
        if let Some(pos) = right.iter().position(|(other, _)| other == digest) {
            right.remove(pos);
            false
        } else {
            true
        }
    });
    if left.is_empty() && right.is_empty() {
        return;
    }
    if left.len() != right.len() {
        out.push(format!(
            "{cluster}/{verb}: {id} declared {} times in expected, {} times in actual",
            expected.len(),
            actual.len()
        ));
        return;
    }
    for ((_, want), (_, got)) in left.iter().zip(&right) {
        let mut message = format!("{cluster}/{verb}: {id} does not match:");
        for diff in diff_values(want, got) {
            message.push_str("\n  ");
            message.push_str(&diff.to_string());
        }
        out.push(message);
    }
}
