mod error;
mod wait;

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, info, warn, Level};

pub use crate::drain::error::{DrainError, DrainStep};
pub use crate::drain::wait::{wait_for_pods_to_evict, TrackedPod};

use crate::classifier::{classify_pods, DrainCandidate};
use crate::consts::{DELETE_STATUS_FAILURE, POD_EVICTION_POLL_INTERVAL};
use crate::gateway::{ClusterGateway, NodeDeletion};
use crate::instrumented;
use crate::pod_state::PodIdentity;

#[derive(Debug, Clone, Copy)]
pub struct DrainOptions {
    pub dry_run: bool,
    pub eviction_timeout: Duration,
    /// grace period handed to the node deletion
    pub node_delete_timeout: Duration,
    pub poll_interval: Duration,
}

impl DrainOptions {
    pub fn new(dry_run: bool, eviction_timeout: Duration, node_delete_timeout: Duration) -> Self {
        Self {
            dry_run,
            eviction_timeout,
            node_delete_timeout,
            poll_interval: POD_EVICTION_POLL_INTERVAL,
        }
    }
}

/// Where a node is in its retirement.
#[derive(Debug)]
pub enum DrainState {
    Selected,
    Cordoned,
    Evicting(Vec<TrackedPod>),
    Drained,
    Deleted(NodeDeletion),
    Failed(DrainError),
}

/// Walks one candidate through cordon, eviction, waiting and deletion.
pub struct NodeDrainer<'a, G> {
    gateway: &'a G,
    candidate: &'a DrainCandidate,
    node_name: String,
    options: DrainOptions,
}

impl<'a, G: ClusterGateway> NodeDrainer<'a, G> {
    pub fn new(gateway: &'a G, candidate: &'a DrainCandidate, options: DrainOptions) -> Self {
        Self {
            gateway,
            candidate,
            node_name: candidate.name(),
            options,
        }
    }

    pub async fn run(self) -> Result<NodeDeletion, DrainError> {
        let mut state = DrainState::Selected;
        loop {
            state = match self.advance(state).await {
                DrainState::Deleted(deletion) => return Ok(deletion),
                DrainState::Failed(err) => return Err(err),
                next => next,
            };
        }
    }

    /// Performs the single transition out of `state`. Terminal states are returned as is.
    pub async fn advance(&self, state: DrainState) -> DrainState {
        match state {
            DrainState::Selected => match self.cordon().await {
                Ok(()) => DrainState::Cordoned,
                Err(err) => DrainState::Failed(err),
            },
            DrainState::Cordoned => match self.evict().await {
                Ok(tracked) => DrainState::Evicting(tracked),
                Err(err) => DrainState::Failed(err),
            },
            DrainState::Evicting(tracked) => match self.wait(&tracked).await {
                Ok(()) => DrainState::Drained,
                Err(err) => DrainState::Failed(err),
            },
            DrainState::Drained => DrainState::Deleted(self.delete().await),
            terminal @ (DrainState::Deleted(_) | DrainState::Failed(_)) => terminal,
        }
    }

    async fn cordon(&self) -> Result<(), DrainError> {
        let node = self.node_name.as_str();
        if self.options.dry_run {
            info!(node, "would have marked node as unschedulable (dry run)");
            return Ok(());
        }

        instrumented!(tracing::span!(Level::INFO, "cordon", node), async {
            match self.gateway.patch_node_schedulability(node, true).await {
                Ok(()) => {
                    info!("node is marked as unschedulable");
                    Ok(())
                }
                Err(source) => {
                    info!(%source, "unscheduling node failed");
                    Err(DrainError::CordonRejected {
                        node: node.to_owned(),
                        source,
                    })
                }
            }
        })
        .await
    }

    async fn evict(&self) -> Result<Vec<TrackedPod>, DrainError> {
        let node = self.node_name.as_str();
        let arrived = if self.options.dry_run {
            Vec::new()
        } else {
            self.pods_arrived_before_cordon().await?
        };

        let pods: Vec<&Pod> = self
            .candidate
            .pods
            .evictable
            .iter()
            .chain(arrived.iter())
            .collect();
        if pods.is_empty() {
            info!(node, "no pods to evict");
            return Ok(Vec::new());
        }

        info!(node, count = pods.len(), "evicting pods");
        let mut tracked = Vec::with_capacity(pods.len());
        for pod in pods {
            let pod = TrackedPod::of(pod);
            if self.options.dry_run {
                info!(node, pod = %pod.identity, "would evict pod (dry run)");
            } else {
                self.evict_pod(&pod.identity).await?;
            }
            tracked.push(pod);
        }

        Ok(tracked)
    }

    /// Evictable pods scheduled onto the node after it was classified but before the
    /// cordon took effect.
    async fn pods_arrived_before_cordon(&self) -> Result<Vec<Pod>, DrainError> {
        let node = self.node_name.as_str();
        let known: Vec<PodIdentity> = self
            .candidate
            .pods
            .evictable
            .iter()
            .chain(self.candidate.pods.non_evictable.iter())
            .map(PodIdentity::of)
            .collect();

        let pods = self
            .gateway
            .list_pods_on_node(node)
            .await
            .map_err(|source| DrainError::ListPods {
                node: node.to_owned(),
                source,
            })?;
        let arrived: Vec<Pod> = pods
            .into_iter()
            .filter(|pod| !known.contains(&PodIdentity::of(pod)))
            .collect();
        if arrived.is_empty() {
            return Ok(Vec::new());
        }

        info!(node, count = arrived.len(), "pods arrived before the node was cordoned");
        Ok(classify_pods(node, arrived)?.evictable)
    }

    async fn evict_pod(&self, pod: &PodIdentity) -> Result<(), DrainError> {
        let node = self.node_name.as_str();
        match self.gateway.evict_pod(pod).await {
            Ok(()) => {
                debug!(node, %pod, "pod is evicted");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!(node, %pod, "pod is gone anyway");
                Ok(())
            }
            Err(source) => Err(DrainError::EvictionRejected {
                node: node.to_owned(),
                pod: pod.clone(),
                source,
            }),
        }
    }

    async fn wait(&self, tracked: &[TrackedPod]) -> Result<(), DrainError> {
        if self.options.dry_run {
            info!(
                node = self.node_name.as_str(),
                count = tracked.len(),
                "not waiting for pods to be evicted (dry run)"
            );
            return Ok(());
        }

        instrumented!(
            tracing::span!(Level::INFO, "wait", node = self.node_name.as_str()),
            wait_for_pods_to_evict(
                self.gateway,
                &self.node_name,
                tracked,
                self.options.eviction_timeout,
                self.options.poll_interval,
            )
        )
        .await
    }

    async fn delete(&self) -> NodeDeletion {
        let node = self.node_name.as_str();
        if self.options.dry_run {
            debug!(node, "would have deleted node (dry run)");
            return NodeDeletion::success("dry run");
        }

        let result = self
            .gateway
            .delete_node(node, self.options.node_delete_timeout)
            .await;
        match result {
            Ok(deletion) if deletion.is_success() => {
                info!(node, "node is deleted");
                deletion
            }
            Ok(deletion) => {
                // garbage collection will get there eventually
                warn!(
                    node,
                    status = %deletion.status,
                    reason = %deletion.message,
                    "terminating node failed"
                );
                deletion
            }
            Err(err) => {
                warn!(node, %err, "terminating node failed");
                NodeDeletion {
                    status: DELETE_STATUS_FAILURE.to_owned(),
                    message: err.to_string(),
                }
            }
        }
    }
}
