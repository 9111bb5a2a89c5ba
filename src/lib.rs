mod api_resolver;
mod classifier;
mod config;
mod consts;
mod drain;
mod error_codes;
mod gateway;
mod orchestrator;
mod pod_state;
mod report;
mod selector;
mod utils;

pub use crate::api_resolver::ApiResolver;
pub use crate::classifier::{classify_pods, DrainCandidate, PodClassification};
pub use crate::config::Config;
pub use crate::drain::{DrainError, DrainOptions, DrainState, DrainStep, NodeDrainer};
pub use crate::gateway::{ClusterGateway, GatewayError, KubeGateway, NodeDeletion};
pub use crate::orchestrator::{Orchestrator, RetireError, RetireRequest};
pub use crate::pod_state::PodIdentity;
pub use crate::report::{NodeOutcome, OutcomeReport};
pub use crate::selector::{select_candidates, MaxAge};

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

#[cfg(test)]
mod tests;
