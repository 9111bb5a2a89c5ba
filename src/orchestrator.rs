use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use thiserror::Error;
use tracing::{error, info, Level};

use crate::classifier::{classify_pods, DrainCandidate};
use crate::consts::{DEFAULT_BATCH_COUNT, DEFAULT_EVICTION_TIMEOUT, DEFAULT_NODE_DELETE_TIMEOUT};
use crate::drain::{DrainError, DrainOptions, NodeDrainer};
use crate::gateway::{ClusterGateway, GatewayError};
use crate::instrumented;
use crate::report::OutcomeReport;
use crate::selector::{select_candidates, MaxAge};

#[derive(Debug, Clone)]
pub struct RetireRequest {
    pub max_age: MaxAge,
    /// upper bound on the number of nodes retired in this run
    pub count: usize,
    pub dry_run: bool,
    pub eviction_timeout: Duration,
    pub node_delete_timeout: Duration,
}

impl RetireRequest {
    pub fn new(max_age: MaxAge) -> Self {
        Self {
            max_age,
            count: DEFAULT_BATCH_COUNT,
            dry_run: false,
            eviction_timeout: DEFAULT_EVICTION_TIMEOUT,
            node_delete_timeout: DEFAULT_NODE_DELETE_TIMEOUT,
        }
    }

    fn drain_options(&self) -> DrainOptions {
        DrainOptions::new(self.dry_run, self.eviction_timeout, self.node_delete_timeout)
    }
}

#[derive(Debug, Error)]
pub enum RetireError {
    #[error("failed to list nodes: {0}")]
    ListNodes(#[source] GatewayError),
    #[error("retiring node '{node}' failed")]
    Drain {
        node: String,
        #[source]
        source: DrainError,
        /// nodes handled before the failure, including the failing one if its pods were classified
        report: OutcomeReport,
    },
}

impl RetireError {
    pub fn report(&self) -> Option<&OutcomeReport> {
        match self {
            RetireError::ListNodes(_) => None,
            RetireError::Drain { report, .. } => Some(report),
        }
    }
}

/// Retires the oldest nodes of a cluster one at a time.
pub struct Orchestrator<G> {
    gateway: G,
}

impl<G: ClusterGateway> Orchestrator<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub async fn retire(&self, request: &RetireRequest) -> Result<OutcomeReport, RetireError> {
        self.retire_at(request, Utc::now()).await
    }

    /// Like [`Orchestrator::retire`], measuring node age against `now`.
    ///
    /// Stops at the first node that cannot be drained. Nodes after it are left untouched.
    pub async fn retire_at(
        &self,
        request: &RetireRequest,
        now: DateTime<Utc>,
    ) -> Result<OutcomeReport, RetireError> {
        let span = tracing::span!(
            Level::INFO,
            "retire",
            max_age = %request.max_age,
            count = request.count,
            dry_run = request.dry_run,
        );

        instrumented!(span, async {
            let nodes = self
                .gateway
                .list_nodes()
                .await
                .map_err(RetireError::ListNodes)?;

            let candidates = select_candidates(nodes, request.max_age, request.count, now);
            let mut report = OutcomeReport::default();
            if candidates.is_empty() {
                info!("No candidates found");
                return Ok(report);
            }

            let options = request.drain_options();
            for node in candidates {
                let node_name = node.name_any();
                let result = instrumented!(
                    tracing::span!(Level::INFO, "node", node = node_name.as_str()),
                    self.retire_node(node, options, &mut report)
                )
                .await;

                if let Err(source) = result {
                    error!(
                        node = node_name.as_str(),
                        step = source.step().as_ref(),
                        %source,
                        "retiring node failed, skipping the rest of the batch"
                    );
                    return Err(RetireError::Drain {
                        node: node_name,
                        source,
                        report,
                    });
                }
            }

            info!(count = report.len(), "retirement complete");
            Ok(report)
        })
        .await
    }

    async fn retire_node(
        &self,
        node: Node,
        options: DrainOptions,
        report: &mut OutcomeReport,
    ) -> Result<(), DrainError> {
        let node_name = node.name_any();
        let pods = self
            .gateway
            .list_pods_on_node(&node_name)
            .await
            .map_err(|source| DrainError::ListPods {
                node: node_name.clone(),
                source,
            })?;

        let candidate = DrainCandidate {
            pods: classify_pods(&node_name, pods)?,
            node,
        };
        report.record(&candidate);

        info!(
            evictable = candidate.pods.evictable.len(),
            non_evictable = candidate.pods.non_evictable.len(),
            "retiring node"
        );

        NodeDrainer::new(&self.gateway, &candidate, options)
            .run()
            .await?;
        Ok(())
    }
}
