use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;
use tracing::debug;

use crate::drain::DrainError;
use crate::pod_state::{
    get_pod_phase, is_controller_owner, is_daemon_set_owner, is_mirror_pod, PodIdentity,
};

#[derive(Debug, Default, Clone)]
pub struct PodClassification {
    pub evictable: Vec<Pod>,
    pub non_evictable: Vec<Pod>,
}

impl PodClassification {
    pub fn evictable_names(&self) -> Vec<String> {
        self.evictable.iter().map(|pod| pod.name_any()).collect()
    }

    pub fn non_evictable_names(&self) -> Vec<String> {
        self.non_evictable.iter().map(|pod| pod.name_any()).collect()
    }
}

/// A node selected for retirement with its pods already classified.
#[derive(Debug, Clone)]
pub struct DrainCandidate {
    pub node: Node,
    pub pods: PodClassification,
}

impl DrainCandidate {
    pub fn name(&self) -> String {
        self.node.name_any()
    }
}

#[derive(Debug, Eq, PartialEq)]
enum Disposition {
    Evictable,
    NonEvictable,
    Unmanaged,
}

fn classify_pod(node_name: &str, pod: &Pod) -> Disposition {
    if is_mirror_pod(pod) {
        debug!(node = node_name, pod = %pod.name_any(), "pod is a static mirror pod");
        return Disposition::NonEvictable;
    }

    let owners = pod.owner_references();
    // ahead of the phase check: DaemonSet pods stay even once terminated
    if owners.iter().any(is_daemon_set_owner) {
        debug!(
            node = node_name,
            pod = %pod.name_any(),
            "pod is owned by a DaemonSet, will not evict it"
        );
        return Disposition::NonEvictable;
    }

    let phase = get_pod_phase(pod);
    if phase.is_terminal() {
        debug!(
            node = node_name,
            pod = %pod.name_any(),
            phase = phase.as_ref(),
            "pod is already terminated"
        );
        return Disposition::Evictable;
    }

    if owners.is_empty() {
        debug!(node = node_name, pod = %pod.name_any(), "pod has no owner");
        return Disposition::Evictable;
    }

    if owners.iter().any(is_controller_owner) {
        return Disposition::Evictable;
    }

    Disposition::Unmanaged
}

/// Splits the pods running on `node_name` into those that have to be evicted and
/// those left in place.
///
/// Fails if a pod has owners but none of them controls it: nobody would bring it
/// back, and we cannot tell whether it is safe to remove.
pub fn classify_pods(node_name: &str, pods: Vec<Pod>) -> Result<PodClassification, DrainError> {
    let mut result = PodClassification::default();
    for pod in pods {
        match classify_pod(node_name, &pod) {
            Disposition::Evictable => result.evictable.push(pod),
            Disposition::NonEvictable => result.non_evictable.push(pod),
            Disposition::Unmanaged => {
                return Err(DrainError::UnmanagedPod {
                    node: node_name.to_owned(),
                    pod: PodIdentity::of(&pod),
                });
            }
        }
    }

    Ok(result)
}
