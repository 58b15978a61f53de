#![forbid(unsafe_code)]

use crate::matcher::intent_matches;
use crate::{
    AllowedOutputSpec, ClusterType, ControllerSelection, MutationIntent, ResourceList, Verb,
};
use std::collections::BTreeMap;

/// One cluster's intents, tagged with the cluster they were declared for.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterMutations {
    cluster: ClusterType,
    intents: Vec<MutationIntent>,
}

impl ClusterMutations {
    pub fn new(cluster: ClusterType) -> Self {
        Self {
            cluster,
            intents: Vec::new(),
        }
    }

    pub fn cluster(&self) -> ClusterType {
        self.cluster
    }

    pub fn intents(&self) -> &[MutationIntent] {
        &self.intents
    }

    pub fn push(&mut self, intent: MutationIntent) {
        self.intents.push(intent);
    }

    fn retained(&self, keep: impl Fn(&MutationIntent) -> bool) -> Self {
        Self {
            cluster: self.cluster,
            intents: self.intents.iter().filter(|i| keep(i)).cloned().collect(),
        }
    }
}

/// All intents of one invocation, partitioned by target cluster. Insertion
/// order is kept within a partition.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationSet {
    partitions: BTreeMap<ClusterType, ClusterMutations>,
}

impl Default for MutationSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationSet {
    /// Empty partitions for every cluster.
    pub fn new() -> Self {
        let partitions = ClusterType::ALL
            .into_iter()
            .map(|cluster| (cluster, ClusterMutations::new(cluster)))
            .collect();
        Self { partitions }
    }

    /// Raw construction; missing or mistagged partitions are reported by
    /// structure validation rather than rejected here.
    pub fn from_partitions(
        partitions: impl IntoIterator<Item = (ClusterType, ClusterMutations)>,
    ) -> Self {
        Self {
            partitions: partitions.into_iter().collect(),
        }
    }

    pub fn add(&mut self, intent: MutationIntent, cluster: ClusterType) {
        self.partitions
            .entry(cluster)
            .or_insert_with(|| ClusterMutations::new(cluster))
            .push(intent);
    }

    pub fn partition(&self, cluster: ClusterType) -> Option<&ClusterMutations> {
        self.partitions.get(&cluster)
    }

    pub fn partitions(&self) -> impl Iterator<Item = (ClusterType, &ClusterMutations)> {
        self.partitions.iter().map(|(cluster, part)| (*cluster, part))
    }

    pub fn len(&self) -> usize {
        self.partitions.values().map(|p| p.intents.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cluster order, then insertion order.
    pub fn all_intents(&self) -> impl Iterator<Item = (ClusterType, &MutationIntent)> {
        self.partitions
            .iter()
            .flat_map(|(cluster, part)| part.intents.iter().map(move |intent| (*cluster, intent)))
    }

    pub fn intents_for(&self, cluster: ClusterType) -> &[MutationIntent] {
        self.partitions
            .get(&cluster)
            .map(|part| part.intents.as_slice())
            .unwrap_or(&[])
    }

    pub fn intents_for_verb(
        &self,
        cluster: ClusterType,
        verb: Verb,
    ) -> impl Iterator<Item = &MutationIntent> {
        self.intents_for(cluster)
            .iter()
            .filter(move |intent| intent.verb() == verb)
    }

    /// Copy with `cluster`'s partition restricted to `allow_list`.
    pub fn filtered_by(
        &self,
        cluster: ClusterType,
        allow_list: Option<&ResourceList>,
    ) -> MutationSet {
        self.map_partitions(|key, part| {
            if key == cluster {
                part.retained(|intent| intent_matches(intent, allow_list))
            } else {
                part.clone()
            }
        })
    }

    /// Copy with every partition restricted to its own list.
    pub fn filtered_by_spec(&self, spec: Option<&AllowedOutputSpec>) -> MutationSet {
        self.map_partitions(|key, part| {
            let list = spec.map(|spec| spec.for_cluster(key));
            part.retained(|intent| intent_matches(intent, list))
        })
    }

    /// Ids declared more than once for `verb` in `cluster`, with their counts.
    pub fn find_duplicates(&self, cluster: ClusterType, verb: Verb) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for intent in self.intents_for_verb(cluster, verb) {
            *counts.entry(intent.id().to_string()).or_default() += 1;
        }
        counts.retain(|_, count| *count > 1);
        counts
    }

    pub fn for_controller(&self, name: &str) -> MutationSet {
        self.map_partitions(|_, part| part.retained(|intent| intent.controller() == Some(name)))
    }

    /// Drops intents attributed to a controller the selection disables.
    /// Unattributed intents are kept.
    pub fn retain_controllers(&self, selection: &ControllerSelection) -> MutationSet {
        self.map_partitions(|_, part| {
            part.retained(|intent| match intent.controller() {
                Some(name) => selection.is_enabled(name),
                None => true,
            })
        })
    }

    fn map_partitions(
        &self,
        f: impl Fn(ClusterType, &ClusterMutations) -> ClusterMutations,
    ) -> MutationSet {
        Self {
            partitions: self
                .partitions
                .iter()
                .map(|(cluster, part)| (*cluster, f(*cluster, part)))
                .collect(),
        }
    }
}
