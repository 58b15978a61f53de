#![forbid(unsafe_code)]

//! Allow-list matching. Version is not part of the comparison.

use crate::{MutationIntent, ResourceIdentity, ResourceList, ResourceTypeIdentifier};

const EVENT_RESOURCE: &str = "events";
const EVENT_GROUPS: [&str; 2] = ["", "events.k8s.io"];

/// `None` is permissive: every target matches.
pub fn matches(target: &ResourceIdentity, allow_list: Option<&ResourceList>) -> bool {
    let Some(allow_list) = allow_list else {
        return true;
    };
    if is_event(target.type_id())
        && allow_list
            .eventing_namespaces
            .iter()
            .any(|ns| ns == target.namespace())
    {
        return true;
    }
    match target {
        ResourceIdentity::Exact(exact) => allow_list.exact_resources.iter().any(|allowed| {
            allowed.type_id.same_group_resource(&exact.type_id)
                && allowed.namespace == exact.namespace
                && allowed.name == exact.name
        }),
        ResourceIdentity::GeneratedName(generated) => {
            allow_list.generated_name_resources.iter().any(|allowed| {
                allowed.type_id.same_group_resource(&generated.type_id)
                    && allowed.namespace == generated.namespace
                    && allowed.generated_name == generated.generated_name
            })
        }
    }
}

pub fn intent_matches(intent: &MutationIntent, allow_list: Option<&ResourceList>) -> bool {
    matches(intent.target(), allow_list)
}

fn is_event(type_id: &ResourceTypeIdentifier) -> bool {
    type_id.resource == EVENT_RESOURCE && EVENT_GROUPS.contains(&type_id.group.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExactResource, GeneratedNameResource};

    fn list() -> ResourceList {
        ResourceList {
            exact_resources: vec![ExactResource::secret("foo", "bar")],
            generated_name_resources: vec![GeneratedNameResource::new(
                "", "v1", "pods", "ns", "runner-",
            )],
            eventing_namespaces: vec!["events-ns".into()],
        }
    }

    #[test]
    fn no_list_is_permissive() {
        assert!(matches(&ExactResource::config_map("x", "y").into(), None));
    }

    #[test]
    fn exact_ignores_version_but_not_name() {
        let list = list();
        let other_version = ExactResource::new("", "v2", "secrets", "foo", "bar");
        assert!(matches(&other_version.into(), Some(&list)));
        assert!(!matches(&ExactResource::secret("foo", "baz").into(), Some(&list)));
        assert!(!matches(&ExactResource::secret("other", "bar").into(), Some(&list)));
    }

    #[test]
    fn exact_and_generated_entries_do_not_cross() {
        let list = list();
        let named_pod = ExactResource::new("", "v1", "pods", "ns", "runner-");
        assert!(!matches(&named_pod.into(), Some(&list)));
        let generated_secret = GeneratedNameResource::new("", "v1", "secrets", "foo", "bar");
        assert!(!matches(&generated_secret.into(), Some(&list)));
        let generated_pod = GeneratedNameResource::new("", "v1", "pods", "ns", "runner-");
        assert!(matches(&generated_pod.into(), Some(&list)));
    }

    #[test]
    fn events_in_eventing_namespace_match_any_name() {
        let list = list();
        let core_event = ExactResource::new("", "v1", "events", "events-ns", "anything.1234");
        let new_event =
            GeneratedNameResource::new("events.k8s.io", "v1", "events", "events-ns", "op-");
        let elsewhere = ExactResource::new("", "v1", "events", "default", "anything");
        assert!(matches(&core_event.into(), Some(&list)));
        assert!(matches(&new_event.into(), Some(&list)));
        assert!(!matches(&elsewhere.into(), Some(&list)));
    }
}
