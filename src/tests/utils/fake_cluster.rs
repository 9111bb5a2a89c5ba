use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;

use crate::from_json;
use crate::gateway::{ClusterGateway, GatewayError, NodeDeletion};
use crate::pod_state::PodIdentity;

/// A mutating call the code under test made.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Mutation {
    PatchSchedulability { node: String, unschedulable: bool },
    Evict(PodIdentity),
    DeleteNode { node: String, grace_period: Duration },
}

/// What happens to a pod once it is evicted.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum EvictionBehavior {
    /// the pod is deleted
    #[default]
    Remove,
    /// the controller recreates it, so it comes back with a new uid
    Reschedule,
    /// nothing happens, e.g. a very long termination grace period
    Ignore,
}

/// Side effect applied whenever a pod is read.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ReadHook {
    #[default]
    None,
    /// every pod gets a new uid before the read is answered
    RescheduleAll,
    /// a pod disappears once it has been read this many times
    RemoveAfter(usize),
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    pods: Vec<Pod>,
    next_uid: usize,
    mutations: Vec<Mutation>,
    eviction_behavior: EvictionBehavior,
    read_hook: ReadHook,
    reads: HashMap<PodIdentity, usize>,
    rejected_cordons: Vec<String>,
    rejected_evictions: Vec<PodIdentity>,
    failed_pod_listings: Vec<String>,
    failed_deletes: Vec<String>,
    delete_response: Option<NodeDeletion>,
    arriving_on_cordon: Vec<Pod>,
}

impl State {
    fn new_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("uid-{}", self.next_uid)
    }

    fn position(&self, pod: &PodIdentity) -> Option<usize> {
        self.pods
            .iter()
            .position(|candidate| PodIdentity::of(candidate) == *pod)
    }

    fn insert_pod(&mut self, mut pod: Pod) {
        if pod.metadata.uid.is_none() {
            pod.metadata.uid = Some(self.new_uid());
        }
        self.pods.push(pod);
    }

    fn reschedule(&mut self, index: usize) {
        let uid = self.new_uid();
        self.pods[index].metadata.uid = Some(uid);
    }
}

pub fn controlled_pod(namespace: &str, name: &str, node: &str, owner_kind: &str) -> Pod {
    from_json!({
        "metadata": {
            "name": name,
            "namespace": namespace,
            "ownerReferences": [{
                "apiVersion": "apps/v1",
                "kind": owner_kind,
                "name": format!("{name}-owner"),
                "uid": format!("{name}-owner-uid"),
                "controller": true,
            }],
        },
        "spec": {
            "nodeName": node,
            "containers": [],
        },
        "status": {
            "phase": "Running",
        },
    })
}

/// In-memory [`ClusterGateway`].
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<State>>,
}

impl FakeCluster {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn insert_node(&self, node: Node) {
        self.state().nodes.push(node);
    }

    pub fn add_node(&self, name: &str, created: &str) {
        self.insert_node(from_json!({
            "metadata": {
                "name": name,
                "creationTimestamp": created,
            },
            "spec": {},
        }));
    }

    pub fn node(&self, name: &str) -> Option<Node> {
        self.state()
            .nodes
            .iter()
            .find(|node| node.name_any() == name)
            .cloned()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.state().nodes.iter().map(|node| node.name_any()).collect()
    }

    /// Assigns a fresh uid unless the pod already has one.
    pub fn insert_pod(&self, pod: Pod) {
        self.state().insert_pod(pod);
    }

    pub fn add_pod(&self, namespace: &str, name: &str, node: &str, owner_kind: &str) {
        self.insert_pod(controlled_pod(namespace, name, node, owner_kind));
    }

    /// The pod lands on its node while the node is being cordoned, after it was listed.
    pub fn schedule_during_cordon(&self, pod: Pod) {
        self.state().arriving_on_cordon.push(pod);
    }

    pub fn pod(&self, namespace: &str, name: &str) -> Option<Pod> {
        let state = self.state();
        let index = state.position(&PodIdentity::new(namespace, name))?;
        Some(state.pods[index].clone())
    }

    pub fn remove_pod(&self, namespace: &str, name: &str) {
        let mut state = self.state();
        if let Some(index) = state.position(&PodIdentity::new(namespace, name)) {
            state.pods.remove(index);
        }
    }

    pub fn reschedule_pod(&self, namespace: &str, name: &str) {
        let mut state = self.state();
        if let Some(index) = state.position(&PodIdentity::new(namespace, name)) {
            state.reschedule(index);
        }
    }

    pub fn set_eviction_behavior(&self, behavior: EvictionBehavior) {
        self.state().eviction_behavior = behavior;
    }

    pub fn set_read_hook(&self, hook: ReadHook) {
        self.state().read_hook = hook;
    }

    pub fn reject_cordon(&self, node: &str) {
        self.state().rejected_cordons.push(node.to_owned());
    }

    pub fn reject_eviction(&self, namespace: &str, name: &str) {
        self.state()
            .rejected_evictions
            .push(PodIdentity::new(namespace, name));
    }

    pub fn fail_pod_listing(&self, node: &str) {
        self.state().failed_pod_listings.push(node.to_owned());
    }

    pub fn fail_delete(&self, node: &str) {
        self.state().failed_deletes.push(node.to_owned());
    }

    pub fn respond_to_delete_with(&self, response: NodeDeletion) {
        self.state().delete_response = Some(response);
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state().mutations.clone()
    }
}

impl ClusterGateway for FakeCluster {
    async fn list_nodes(&self) -> Result<Vec<Node>, GatewayError> {
        Ok(self.state().nodes.clone())
    }

    async fn list_pods_on_node(&self, node_name: &str) -> Result<Vec<Pod>, GatewayError> {
        let state = self.state();
        if state.failed_pod_listings.iter().any(|node| node == node_name) {
            return Err(GatewayError::rejected("etcdserver: request timed out"));
        }

        Ok(state
            .pods
            .iter()
            .filter(|pod| {
                pod.spec.as_ref().and_then(|spec| spec.node_name.as_deref()) == Some(node_name)
            })
            .cloned()
            .collect())
    }

    async fn patch_node_schedulability(
        &self,
        node_name: &str,
        unschedulable: bool,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.mutations.push(Mutation::PatchSchedulability {
            node: node_name.to_owned(),
            unschedulable,
        });

        if state.rejected_cordons.iter().any(|node| node == node_name) {
            return Err(GatewayError::rejected(format!(
                "nodes \"{node_name}\" is forbidden"
            )));
        }

        let Some(node) = state
            .nodes
            .iter_mut()
            .find(|node| node.name_any() == node_name)
        else {
            return Err(GatewayError::NotFound {
                message: format!("nodes \"{node_name}\" not found"),
            });
        };

        node.spec.get_or_insert_with(Default::default).unschedulable = Some(unschedulable);

        let arriving = std::mem::take(&mut state.arriving_on_cordon);
        for pod in arriving {
            state.insert_pod(pod);
        }
        Ok(())
    }

    async fn evict_pod(&self, pod: &PodIdentity) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.mutations.push(Mutation::Evict(pod.clone()));

        if state.rejected_evictions.contains(pod) {
            return Err(GatewayError::rejected(
                "Cannot evict pod as it would violate the pod's disruption budget.",
            ));
        }

        let Some(index) = state.position(pod) else {
            return Err(GatewayError::NotFound {
                message: format!("pods \"{}\" not found", pod.name),
            });
        };

        let behavior = state.eviction_behavior;
        match behavior {
            EvictionBehavior::Remove => {
                state.pods.remove(index);
            }
            EvictionBehavior::Reschedule => state.reschedule(index),
            EvictionBehavior::Ignore => {}
        }

        Ok(())
    }

    async fn read_pod(&self, pod: &PodIdentity) -> Result<Pod, GatewayError> {
        let mut state = self.state();

        let hook = state.read_hook;
        match hook {
            ReadHook::None => {}
            ReadHook::RescheduleAll => {
                for index in 0..state.pods.len() {
                    state.reschedule(index);
                }
            }
            ReadHook::RemoveAfter(limit) => {
                let reads = state.reads.entry(pod.clone()).or_default();
                *reads += 1;
                if *reads > limit {
                    if let Some(index) = state.position(pod) {
                        state.pods.remove(index);
                    }
                }
            }
        }

        let Some(index) = state.position(pod) else {
            return Err(GatewayError::NotFound {
                message: format!("pods \"{}\" not found", pod.name),
            });
        };

        Ok(state.pods[index].clone())
    }

    async fn delete_node(
        &self,
        node_name: &str,
        grace_period: Duration,
    ) -> Result<NodeDeletion, GatewayError> {
        let mut state = self.state();
        state.mutations.push(Mutation::DeleteNode {
            node: node_name.to_owned(),
            grace_period,
        });

        if state.failed_deletes.iter().any(|node| node == node_name) {
            return Err(GatewayError::rejected(format!(
                "Operation cannot be fulfilled on nodes \"{node_name}\""
            )));
        }

        if let Some(response) = state.delete_response.clone() {
            return Ok(response);
        }

        let Some(index) = state
            .nodes
            .iter()
            .position(|node| node.name_any() == node_name)
        else {
            return Err(GatewayError::NotFound {
                message: format!("nodes \"{node_name}\" not found"),
            });
        };

        state.nodes.remove(index);
        Ok(NodeDeletion::success(""))
    }
}
