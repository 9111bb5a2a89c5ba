use std::time::Duration;

use either::Either;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{DeleteParams, EvictParams, ListParams, Patch, PatchParams};
use kube::Api;
use serde_json::json;
use tracing::{debug, trace};

use crate::api_resolver::ApiResolver;
use crate::consts::DELETE_STATUS_FAILURE;
use crate::error_codes::{
    error_message, is_404_not_found_error, is_410_gone_error, is_429_too_many_requests_error,
};
use crate::gateway::{ClusterGateway, GatewayError, NodeDeletion};
use crate::pod_state::PodIdentity;
use crate::utils::to_grace_period_seconds;

/// [`ClusterGateway`] talking to a real API server.
#[derive(Clone)]
pub struct KubeGateway {
    api_resolver: ApiResolver,
}

impl KubeGateway {
    pub fn new(api_resolver: ApiResolver) -> Self {
        Self { api_resolver }
    }

    fn nodes(&self) -> Api<Node> {
        self.api_resolver.all()
    }

    fn pods_within(&self, namespace: &str) -> Api<Pod> {
        self.api_resolver.namespaced(namespace)
    }
}

fn to_gateway_error(err: kube::Error) -> GatewayError {
    let message = error_message(&err);
    if is_404_not_found_error(&err) || is_410_gone_error(&err) {
        return GatewayError::NotFound { message };
    }

    let message = if is_429_too_many_requests_error(&err) {
        format!("blocked by a PodDisruptionBudget: {message}")
    } else {
        message
    };

    GatewayError::Rejected {
        message,
        source: Some(err),
    }
}

impl ClusterGateway for KubeGateway {
    async fn list_nodes(&self) -> Result<Vec<Node>, GatewayError> {
        let nodes = self
            .nodes()
            .list(&ListParams::default())
            .await
            .map_err(to_gateway_error)?;

        trace!(count = nodes.items.len(), "listed nodes");
        Ok(nodes.items)
    }

    async fn list_pods_on_node(&self, node_name: &str) -> Result<Vec<Pod>, GatewayError> {
        let params = ListParams::default().fields(&format!("spec.nodeName={node_name}"));
        let pods = self
            .api_resolver
            .all::<Pod>()
            .list(&params)
            .await
            .map_err(to_gateway_error)?;

        trace!(node = node_name, count = pods.items.len(), "listed pods");
        Ok(pods.items)
    }

    async fn patch_node_schedulability(
        &self,
        node_name: &str,
        unschedulable: bool,
    ) -> Result<(), GatewayError> {
        let patch = json!({
            "spec": {
                "unschedulable": unschedulable,
            }
        });

        self.nodes()
            .patch(node_name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(to_gateway_error)?;

        Ok(())
    }

    async fn evict_pod(&self, pod: &PodIdentity) -> Result<(), GatewayError> {
        self.pods_within(&pod.namespace)
            .evict(&pod.name, &EvictParams::default())
            .await
            .map_err(to_gateway_error)?;

        Ok(())
    }

    async fn read_pod(&self, pod: &PodIdentity) -> Result<Pod, GatewayError> {
        self.pods_within(&pod.namespace)
            .get(&pod.name)
            .await
            .map_err(to_gateway_error)
    }

    async fn delete_node(
        &self,
        node_name: &str,
        grace_period: Duration,
    ) -> Result<NodeDeletion, GatewayError> {
        let params = DeleteParams {
            grace_period_seconds: Some(to_grace_period_seconds(grace_period)),
            ..DeleteParams::default()
        };

        let result = self
            .nodes()
            .delete(node_name, &params)
            .await
            .map_err(to_gateway_error)?;

        match result {
            Either::Left(_node) => {
                // finalizers are still running
                debug!(node = node_name, "node deletion is in progress");
                Ok(NodeDeletion::success("deletion in progress"))
            }
            Either::Right(status) if status.is_success() => {
                Ok(NodeDeletion::success(status.message))
            }
            Either::Right(status) => Ok(NodeDeletion {
                status: DELETE_STATUS_FAILURE.to_owned(),
                message: format!("{}: {}", status.reason, status.message),
            }),
        }
    }
}
