use std::fmt::{Display, Formatter};

use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::try_some;

/// Nodes created at or before `now - max_age` are old enough to retire.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct MaxAge {
    pub days: u32,
    pub hours: u32,
}

impl MaxAge {
    pub fn new(days: u32, hours: u32) -> Self {
        Self { days, hours }
    }

    pub fn to_time_delta(self) -> TimeDelta {
        TimeDelta::days(i64::from(self.days)) + TimeDelta::hours(i64::from(self.hours))
    }

    pub fn threshold(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.to_time_delta())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Display for MaxAge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d {}h", self.days, self.hours)
    }
}

pub fn get_node_creation_timestamp(node: &Node) -> Option<DateTime<Utc>> {
    try_some!(node.metadata.creation_timestamp?.0)
}

/// Returns at most `count` nodes older than `max_age`, oldest first.
///
/// Nodes created at the same instant keep the order they were listed in.
pub fn select_candidates(
    nodes: Vec<Node>,
    max_age: MaxAge,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Node> {
    let threshold = max_age.threshold(now);
    info!(%threshold, %max_age, "collecting nodes older than threshold");

    let mut candidates: Vec<(DateTime<Utc>, Node)> = nodes
        .into_iter()
        .filter_map(|node| {
            let Some(created) = get_node_creation_timestamp(&node) else {
                debug!(node = %node.name_any(), "node has no creation timestamp, skipping");
                return None;
            };

            (created <= threshold).then_some((created, node))
        })
        .collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    // stable, so ties keep the listing order
    candidates.sort_by_key(|(created, _)| *created);

    info!(
        count = candidates.len(),
        candidates = %candidates
            .iter()
            .map(|(created, node)| format!("{} {}", node.name_any(), created))
            .collect::<Vec<_>>()
            .join(", "),
        "found candidates"
    );

    candidates
        .into_iter()
        .take(count)
        .map(|(_, node)| node)
        .collect()
}
