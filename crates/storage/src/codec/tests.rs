use super::*;
use mom_core::equivalence::compare;
use mom_core::{ExactResource, GeneratedNameResource};
use serde_json::json;

fn sample() -> MutationSet {
    let mut set = MutationSet::new();
    set.add(
        MutationIntent::new(
            Verb::ApplyStatus,
            ExactResource::secret("foo", "bar"),
            json!({
                "metadata": {"name": "bar", "namespace": "foo"},
                "status": {"reason": "GetFailed"}
            }),
        )
        .with_controller("secret-status"),
        ClusterType::Configuration,
    );
    set.add(
        MutationIntent::new(Verb::Delete, ExactResource::config_map("ns", "old"), Value::Null),
        ClusterType::Management,
    );
    for image in ["a", "b"] {
        set.add(
            MutationIntent::new(
                Verb::Create,
                GeneratedNameResource::new("", "v1", "pods", "jobs", "runner-"),
                json!({"metadata": {"generateName": "runner-"}, "spec": {"image": image}}),
            ),
            ClusterType::UserWorkload,
        );
    }
    set
}

#[test]
fn round_trip_is_equivalent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let set = sample();
    write_mutation_set(dir.path(), &set).expect("write");
    let read = read_mutation_set(dir.path()).expect("read");
    assert!(compare(&set, &read).is_empty());
    assert_eq!(read.len(), set.len());
    assert_eq!(
        read.intents_for(ClusterType::Configuration)[0].controller(),
        Some("secret-status")
    );
}

#[test]
fn empty_buckets_get_a_marker() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_mutation_set(dir.path(), &MutationSet::new()).expect("write");
    for cluster in ClusterType::ALL {
        for verb in Verb::ALL {
            let marker = verb_dir(dir.path(), cluster, verb).join(GITKEEP);
            assert_eq!(fs::read_to_string(marker).expect("marker"), GITKEEP_CONTENT);
        }
    }
    let read = read_mutation_set(dir.path()).expect("read");
    assert!(read.is_empty());
}

#[test]
fn generated_targets_get_distinct_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_mutation_set(dir.path(), &sample()).expect("write");
    let bucket = verb_dir(dir.path(), ClusterType::UserWorkload, Verb::Create);
    assert!(bucket.join("pods_core_v1_jobs_runner-@1.yaml").is_file());
    assert!(bucket.join("pods_core_v1_jobs_runner-@2.yaml").is_file());
}

#[test]
fn colliding_exact_targets_are_reported_not_overwritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut set = MutationSet::new();
    for reason in ["first", "second"] {
        set.add(
            MutationIntent::new(
                Verb::Create,
                ExactResource::new("apps", "v1", "deployments", "ns", "app"),
                json!({"status": {"reason": reason}}),
            ),
            ClusterType::Management,
        );
    }
    let errors = write_mutation_set(dir.path(), &set).expect_err("collision");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors.0[0], CodecError::DuplicateTarget { .. }));
    let file = verb_dir(dir.path(), ClusterType::Management, Verb::Create)
        .join("deployments_apps_v1_ns_app.yaml");
    assert!(fs::read_to_string(file).expect("file").contains("first"));
}

#[test]
fn invalid_identity_is_not_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut set = MutationSet::new();
    set.add(
        MutationIntent::new(Verb::Apply, ExactResource::secret("ns", "bad_name"), json!({})),
        ClusterType::Configuration,
    );
    set.add(
        MutationIntent::new(
            Verb::Apply,
            ExactResource::secret("ns", "a"),
            json!({"metadata": {"name": "b"}}),
        ),
        ClusterType::Configuration,
    );
    let errors = write_mutation_set(dir.path(), &set).expect_err("invalid");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|err| matches!(err, CodecError::Structure { .. })));
}

#[test]
fn log_files_are_allowed_at_the_root_but_nothing_else() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_mutation_set(dir.path(), &sample()).expect("write");
    fs::write(dir.path().join("stdout.log"), "out").expect("stdout");
    fs::write(dir.path().join("stderr.log"), "err").expect("stderr");
    assert!(read_mutation_set(dir.path()).is_ok());

    fs::write(dir.path().join("notes.txt"), "x").expect("notes");
    fs::create_dir(dir.path().join("Guest")).expect("guest");
    let (partial, errors) = read_mutation_set_partial(dir.path());
    assert_eq!(errors.len(), 2);
    assert_eq!(partial.len(), sample().len());
}

#[test]
fn bad_files_are_collected_and_reading_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_mutation_set(dir.path(), &sample()).expect("write");
    let bucket = verb_dir(dir.path(), ClusterType::Management, Verb::Apply);
    fs::write(bucket.join("README.md"), "x").expect("readme");
    fs::write(bucket.join("configmaps_core_v1_ns.yaml"), "{}").expect("bad name");
    fs::write(bucket.join("configmaps_core_v1_ns_broken.yaml"), "a: [1").expect("bad yaml");
    fs::write(bucket.join("configmaps_core_v1_ns_ok.json"), r#"{"data": {"k": "v"}}"#)
        .expect("json");
    fs::create_dir(bucket.join("nested")).expect("nested");
    fs::write(dir.path().join("Management").join("extra.yaml"), "{}").expect("extra");

    let (partial, errors) = read_mutation_set_partial(dir.path());
    let kinds: Vec<&str> = errors
        .iter()
        .map(|err| match err {
            CodecError::Io { .. } => "io",
            CodecError::Parse { .. } => "parse",
            CodecError::Structure { .. } => "structure",
            CodecError::DuplicateTarget { .. } => "duplicate",
            CodecError::Encode { .. } => "encode",
        })
        .collect();
    assert_eq!(kinds, vec!["structure", "structure", "structure", "parse", "structure"]);
    assert_eq!(partial.len(), sample().len() + 1);
    assert!(read_mutation_set(dir.path()).is_err());
}

#[test]
fn duplicate_exact_targets_in_one_bucket() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_mutation_set(dir.path(), &MutationSet::new()).expect("write");
    let bucket = verb_dir(dir.path(), ClusterType::Configuration, Verb::Update);
    fs::write(bucket.join("secrets_core_v1_foo_bar.json"), "{}").expect("json");
    fs::write(bucket.join("secrets_core_v1_foo_bar.yaml"), "{}\n").expect("yaml");
    let errors = read_mutation_set(dir.path()).expect_err("duplicate");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors.0[0], CodecError::DuplicateTarget { .. }));
}

#[test]
fn missing_root_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let errors = read_mutation_set(&dir.path().join("absent")).expect_err("missing");
    assert!(matches!(errors.0[0], CodecError::Io { .. }));
}
