use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::classifier::DrainCandidate;
use crate::selector::get_node_creation_timestamp;

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct NodeOutcome {
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub evictable_pods: Vec<String>,
    pub non_evictable_pods: Vec<String>,
}

impl NodeOutcome {
    pub fn of(candidate: &DrainCandidate) -> Self {
        Self {
            creation_timestamp: get_node_creation_timestamp(&candidate.node),
            evictable_pods: candidate.pods.evictable_names(),
            non_evictable_pods: candidate.pods.non_evictable_names(),
        }
    }
}

/// Retired nodes by name in the order they were retired, with the pods that were
/// found on them. Serialized as a JSON object keeping that order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OutcomeReport {
    nodes: Vec<(String, NodeOutcome)>,
}

impl OutcomeReport {
    pub fn record(&mut self, candidate: &DrainCandidate) {
        let name = candidate.name();
        let outcome = NodeOutcome::of(candidate);
        match self.nodes.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = outcome,
            None => self.nodes.push((name, outcome)),
        }
    }

    pub fn get(&self, node_name: &str) -> Option<&NodeOutcome> {
        self.nodes
            .iter()
            .find(|(name, _)| name == node_name)
            .map(|(_, outcome)| outcome)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Serialize for OutcomeReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.nodes.iter().map(|(name, outcome)| (name, outcome)))
    }
}
