use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::drain::DrainError;
use crate::gateway::{ClusterGateway, GatewayError};
use crate::pod_state::{get_pod_phase, PodIdentity};

/// A pod we asked to leave, remembered by the uid it had when we asked.
#[derive(Debug, Clone)]
pub struct TrackedPod {
    pub identity: PodIdentity,
    pub uid: Option<String>,
}

impl TrackedPod {
    pub fn of(pod: &Pod) -> Self {
        Self {
            identity: PodIdentity::of(pod),
            uid: pod.uid(),
        }
    }
}

/// Polls every `interval` until each tracked pod is gone or has been replaced by a
/// pod with a different uid.
///
/// The deadline counts from entering this function. Read errors other than
/// not-found keep the pod pending.
pub async fn wait_for_pods_to_evict<G: ClusterGateway>(
    gateway: &G,
    node_name: &str,
    pods: &[TrackedPod],
    timeout: Duration,
    interval: Duration,
) -> Result<(), DrainError> {
    info!(node = node_name, count = pods.len(), "waiting for pods to be evicted");
    let started = Instant::now();

    let mut pending: Vec<&TrackedPod> = pods.iter().collect();
    loop {
        let mut still_pending = Vec::with_capacity(pending.len());
        for pod in pending {
            if is_pod_pending(gateway, pod).await {
                still_pending.push(pod);
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            info!(node = node_name, count = pods.len(), "all pods evicted");
            return Ok(());
        }

        if started.elapsed() >= timeout {
            info!(
                node = node_name,
                count = pods.len(),
                pending = pending.len(),
                "eviction took too long"
            );
            return Err(DrainError::DrainTimeout {
                node: node_name.to_owned(),
                timeout,
                pending: pending.into_iter().map(|pod| pod.identity.clone()).collect(),
            });
        }

        tokio::time::sleep(interval).await;
    }
}

async fn is_pod_pending<G: ClusterGateway>(gateway: &G, pod: &TrackedPod) -> bool {
    match gateway.read_pod(&pod.identity).await {
        Ok(current) if current.uid() != pod.uid => {
            debug!(pod = %pod.identity, "pod was rescheduled");
            false
        }
        Ok(current) => {
            debug!(
                pod = %pod.identity,
                phase = get_pod_phase(&current).as_ref(),
                "pod still around"
            );
            true
        }
        Err(GatewayError::NotFound { .. }) => {
            debug!(pod = %pod.identity, "pod is gone");
            false
        }
        Err(err) => {
            warn!(pod = %pod.identity, %err, "could not determine whether pod is gone");
            true
        }
    }
}
