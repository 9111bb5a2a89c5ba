use std::fmt::{Display, Formatter};
use std::time::Duration;

use strum_macros::AsRefStr;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::pod_state::PodIdentity;

#[derive(Debug, Clone, Copy, Eq, PartialEq, AsRefStr)]
pub enum DrainStep {
    Classify,
    Cordon,
    Evict,
    Wait,
}

/// Why a node could not be drained. Every variant aborts the whole batch.
#[derive(Debug, Error)]
pub enum DrainError {
    #[error("failed to list pods on node '{node}': {source}")]
    ListPods {
        node: String,
        #[source]
        source: GatewayError,
    },
    #[error(
        "pod '{pod}' on node '{node}' is unmanaged, cannot drain this node. Delete it manually first?"
    )]
    UnmanagedPod { node: String, pod: PodIdentity },
    #[error("failed to unschedule node '{node}': {source}")]
    CordonRejected {
        node: String,
        #[source]
        source: GatewayError,
    },
    #[error("failed to evict pod '{pod}' on node '{node}': {source}")]
    EvictionRejected {
        node: String,
        pod: PodIdentity,
        #[source]
        source: GatewayError,
    },
    #[error(
        "draining node '{node}' did not complete within {}s, remaining pods are: {}",
        timeout.as_secs(),
        PendingPods(pending)
    )]
    DrainTimeout {
        node: String,
        timeout: Duration,
        pending: Vec<PodIdentity>,
    },
}

impl DrainError {
    pub fn step(&self) -> DrainStep {
        match self {
            DrainError::ListPods { .. } | DrainError::UnmanagedPod { .. } => DrainStep::Classify,
            DrainError::CordonRejected { .. } => DrainStep::Cordon,
            DrainError::EvictionRejected { .. } => DrainStep::Evict,
            DrainError::DrainTimeout { .. } => DrainStep::Wait,
        }
    }

    pub fn node(&self) -> &str {
        match self {
            DrainError::ListPods { node, .. }
            | DrainError::UnmanagedPod { node, .. }
            | DrainError::CordonRejected { node, .. }
            | DrainError::EvictionRejected { node, .. }
            | DrainError::DrainTimeout { node, .. } => node,
        }
    }
}

struct PendingPods<'a>(&'a [PodIdentity]);

impl Display for PendingPods<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, pod) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{pod}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_should_list_pending_pods() {
        let err = DrainError::DrainTimeout {
            node: "node-1".to_owned(),
            timeout: Duration::from_secs(300),
            pending: vec![
                PodIdentity::new("default", "a"),
                PodIdentity::new("kube-system", "b"),
            ],
        };

        assert_eq!(err.step(), DrainStep::Wait);
        assert_eq!(
            err.to_string(),
            "draining node 'node-1' did not complete within 300s, remaining pods are: default/a, kube-system/b"
        );
    }

    #[test]
    fn should_name_node_and_pod() {
        let err = DrainError::EvictionRejected {
            node: "node-1".to_owned(),
            pod: PodIdentity::new("default", "a"),
            source: GatewayError::rejected("forbidden"),
        };

        assert_eq!(err.step(), DrainStep::Evict);
        assert_eq!(err.node(), "node-1");
        assert_eq!(
            err.to_string(),
            "failed to evict pod 'default/a' on node 'node-1': forbidden"
        );
    }
}
