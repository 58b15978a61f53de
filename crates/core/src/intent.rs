#![forbid(unsafe_code)]

use crate::{ResourceIdentity, Verb};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Annotation that attributes an intent to the controller instance that
/// declared it.
pub const CONTROLLER_NAME_ANNOTATION: &str = "synthetic.mom.openshift.io/controller-instance-name";

/// A single declared write. Immutable once built; filtering copies.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationIntent {
    verb: Verb,
    target: ResourceIdentity,
    content: Value,
    controller: Option<String>,
    id: String,
}

impl MutationIntent {
    /// Builds an intent; the attributing controller is read from the content
    /// annotation when present.
    pub fn new(verb: Verb, target: impl Into<ResourceIdentity>, content: Value) -> Self {
        let target = target.into();
        let controller = controller_annotation(&content);
        let id = stable_id(verb, &target);
        Self {
            verb,
            target,
            content,
            controller,
            id,
        }
    }

    pub fn with_controller(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.content.is_object() {
            self.content = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(root) = &mut self.content {
            let metadata = root
                .entry("metadata")
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if !metadata.is_object() {
                *metadata = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(metadata) = metadata {
                let annotations = metadata
                    .entry("annotations")
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                if !annotations.is_object() {
                    *annotations = Value::Object(serde_json::Map::new());
                }
                if let Value::Object(annotations) = annotations {
                    annotations.insert(
                        CONTROLLER_NAME_ANNOTATION.to_string(),
                        Value::String(name.clone()),
                    );
                }
            }
        }
        self.controller = Some(name);
        self
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn target(&self) -> &ResourceIdentity {
        &self.target
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    /// `<Verb>-<resource>.<version>.<group>/<name>[<namespace>]`, with
    /// `<prefix>*` as the name of a generated-name target.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hex sha256 of the canonical JSON content. Orders intents sharing an id.
    pub fn content_digest(&self) -> String {
        value_digest(&self.content)
    }
}

/// Hex sha256 of a value's canonical JSON encoding (object keys sorted).
pub fn value_digest(value: &Value) -> String {
    let canonical = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn stable_id(verb: Verb, target: &ResourceIdentity) -> String {
    format!("{verb}-{target}")
}

fn controller_annotation(content: &Value) -> Option<String> {
    content
        .pointer("/metadata/annotations")
        .and_then(|annotations| annotations.get(CONTROLLER_NAME_ANNOTATION))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExactResource, GeneratedNameResource};
    use serde_json::json;

    #[test]
    fn id_follows_verb_type_name_namespace() {
        let intent = MutationIntent::new(
            Verb::ApplyStatus,
            ExactResource::secret("foo", "bar"),
            json!({}),
        );
        assert_eq!(intent.id(), "ApplyStatus-secrets.v1./bar[foo]");

        let generated = MutationIntent::new(
            Verb::Create,
            GeneratedNameResource::new("", "v1", "events", "ns", "op-"),
            Value::Null,
        );
        assert_eq!(generated.id(), "Create-events.v1./op-*[ns]");
    }

    #[test]
    fn controller_is_read_from_and_written_to_content() {
        let content = json!({
            "metadata": {"annotations": {CONTROLLER_NAME_ANNOTATION: "alpha"}}
        });
        let intent =
            MutationIntent::new(Verb::Apply, ExactResource::config_map("ns", "x"), content);
        assert_eq!(intent.controller(), Some("alpha"));

        let attributed =
            MutationIntent::new(Verb::Delete, ExactResource::config_map("ns", "x"), Value::Null)
                .with_controller("beta");
        assert_eq!(attributed.controller(), Some("beta"));
        assert_eq!(
            attributed
                .content()
                .pointer("/metadata/annotations")
                .and_then(|a| a.get(CONTROLLER_NAME_ANNOTATION)),
            Some(&json!("beta"))
        );
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let target = ExactResource::secret("foo", "bar");
        let a = MutationIntent::new(Verb::Apply, target.clone(), json!({"data": {"k": "v"}}));
        let b = MutationIntent::new(Verb::Apply, target.clone(), json!({"data": {"k": "v"}}));
        let c = MutationIntent::new(Verb::Apply, target, json!({"data": {"k": "w"}}));
        assert_eq!(a.content_digest(), b.content_digest());
        assert_ne!(a.content_digest(), c.content_digest());
        assert_eq!(a.content_digest().len(), 64);
    }
}
