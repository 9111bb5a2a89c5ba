mod kube_gateway;

use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, Pod};
use thiserror::Error;

use crate::consts::DELETE_STATUS_SUCCESS;
use crate::pod_state::PodIdentity;

pub use kube_gateway::KubeGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: Option<kube::Error>,
    },
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

/// What the control plane answered to a node deletion.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NodeDeletion {
    pub status: String,
    pub message: String,
}

impl NodeDeletion {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: DELETE_STATUS_SUCCESS.to_owned(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DELETE_STATUS_SUCCESS
    }
}

/// The operations the retirement needs from the cluster.
///
/// Reads are eventually consistent: a pod that was just listed may already be gone
/// when it is read again.
pub trait ClusterGateway: Send + Sync {
    fn list_nodes(&self) -> impl Future<Output = Result<Vec<Node>, GatewayError>> + Send;

    fn list_pods_on_node(
        &self,
        node_name: &str,
    ) -> impl Future<Output = Result<Vec<Pod>, GatewayError>> + Send;

    fn patch_node_schedulability(
        &self,
        node_name: &str,
        unschedulable: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn evict_pod(&self, pod: &PodIdentity)
        -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Fails with [`GatewayError::NotFound`] when the pod is gone.
    fn read_pod(&self, pod: &PodIdentity) -> impl Future<Output = Result<Pod, GatewayError>> + Send;

    fn delete_node(
        &self,
        node_name: &str,
        grace_period: Duration,
    ) -> impl Future<Output = Result<NodeDeletion, GatewayError>> + Send;
}
