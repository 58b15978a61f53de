use super::*;
use crate::{ClusterMutations, ExactResource, GeneratedNameResource, MutationIntent};
use serde_json::json;

fn deployment(name: &str) -> ExactResource {
    ExactResource::new("apps", "v1", "deployments", "ns", name)
}

#[test]
fn allowed_secret_status_is_clean() {
    let mut spec = AllowedOutputSpec::default();
    spec.for_cluster_mut(ClusterType::Configuration)
        .exact_resources
        .push(ExactResource::secret("foo", "bar"));
    let mut set = MutationSet::new();
    set.add(
        MutationIntent::new(Verb::ApplyStatus, ExactResource::secret("foo", "bar"), json!({})),
        ClusterType::Configuration,
    );
    assert!(validate_all(&set, &spec).is_empty());
}

#[test]
fn unlisted_create_is_unspecified() {
    let spec = AllowedOutputSpec::default();
    let mut set = MutationSet::new();
    set.add(
        MutationIntent::new(Verb::Create, ExactResource::config_map("ns", "x"), json!({})),
        ClusterType::Management,
    );
    let errors = validate_completeness(&set, &spec);
    assert_eq!(
        errors,
        vec![ValidationError::UnspecifiedOutput {
            cluster: ClusterType::Management,
            verb: Verb::Create,
            id: "Create-configmaps.v1./x[ns]".into(),
        }]
    );
    assert!(errors[0].to_string().contains("Create-configmaps.v1./x[ns]"));
}

#[test]
fn listed_in_another_cluster_is_still_unspecified() {
    let mut spec = AllowedOutputSpec::default();
    spec.for_cluster_mut(ClusterType::UserWorkload)
        .exact_resources
        .push(ExactResource::config_map("ns", "x"));
    let mut set = MutationSet::new();
    set.add(
        MutationIntent::new(Verb::Apply, ExactResource::config_map("ns", "x"), json!({})),
        ClusterType::Configuration,
    );
    assert_eq!(validate_completeness(&set, &spec).len(), 1);
}

#[test]
fn one_error_per_unmatched_intent() {
    let spec = AllowedOutputSpec::default();
    let mut set = MutationSet::new();
    for _ in 0..2 {
        set.add(
            MutationIntent::new(
                Verb::Create,
                GeneratedNameResource::new("", "v1", "pods", "ns", "runner-"),
                json!({}),
            ),
            ClusterType::UserWorkload,
        );
    }
    assert_eq!(validate_completeness(&set, &spec).len(), 2);
}

#[test]
fn double_create_is_one_duplicate_error() {
    let mut set = MutationSet::new();
    for _ in 0..2 {
        set.add(
            MutationIntent::new(Verb::Create, deployment("app"), json!({})),
            ClusterType::Management,
        );
    }
    let errors = validate_no_duplicates(&set);
    assert_eq!(
        errors,
        vec![ValidationError::DuplicateMutation {
            cluster: ClusterType::Management,
            verb: Verb::Create,
            id: "Create-deployments.v1.apps/app[ns]".into(),
            count: 2,
        }]
    );
    assert!(errors[0].to_string().contains("mutations: 2"));
}

#[test]
fn duplicate_updates_are_not_checked() {
    let mut set = MutationSet::new();
    for _ in 0..2 {
        set.add(
            MutationIntent::new(Verb::Update, deployment("app"), json!({})),
            ClusterType::Management,
        );
    }
    assert!(validate_no_duplicates(&set).is_empty());
    assert_eq!(set.find_duplicates(ClusterType::Management, Verb::Update).len(), 1);
}

#[test]
fn structure_reports_missing_and_mistagged_partitions() {
    let set = MutationSet::from_partitions([
        (
            ClusterType::Configuration,
            ClusterMutations::new(ClusterType::Configuration),
        ),
        (
            ClusterType::Management,
            ClusterMutations::new(ClusterType::UserWorkload),
        ),
    ]);
    assert_eq!(
        validate_structure(&set),
        vec![
            ValidationError::ClusterTypeMismatch {
                key: ClusterType::Management,
                declared: ClusterType::UserWorkload,
            },
            ValidationError::MissingCluster {
                cluster: ClusterType::UserWorkload,
            },
        ]
    );
    assert!(validate_structure(&MutationSet::new()).is_empty());
}

#[test]
fn mixed_versions_in_allow_list() {
    let mut spec = AllowedOutputSpec::default();
    spec.for_cluster_mut(ClusterType::Configuration)
        .exact_resources
        .push(deployment("a"));
    spec.for_cluster_mut(ClusterType::Management)
        .generated_name_resources
        .push(GeneratedNameResource::new("apps", "v1beta1", "deployments", "ns", "b-"));
    spec.for_cluster_mut(ClusterType::Management)
        .exact_resources
        .push(ExactResource::secret("ns", "s"));
    let errors = validate_allowed_output_spec(&spec);
    assert_eq!(
        errors,
        vec![ValidationError::MixedVersions {
            group: "apps".into(),
            resource: "deployments".into(),
            versions: vec!["v1".into(), "v1beta1".into()],
        }]
    );
}
