use std::fmt::{Display, Formatter};
use std::str::FromStr;

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use serde::Serialize;
use strum_macros::{AsRefStr, EnumString};

use crate::consts::{DAEMON_SET_KIND, MIRROR_POD_ANNOTATION_KEY};
use crate::try_some;

#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumString, AsRefStr)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, PodPhase::Succeeded | PodPhase::Failed)
    }
}

pub fn get_pod_phase(pod: &Pod) -> PodPhase {
    try_some!(pod.status?.phase?)
        .and_then(|phase| PodPhase::from_str(phase).ok())
        .unwrap_or(PodPhase::Unknown)
}

/// Namespace and name of a pod, the pair the API addresses it by.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct PodIdentity {
    pub namespace: String,
    pub name: String,
}

impl PodIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(pod: &Pod) -> Self {
        Self {
            namespace: pod.namespace().unwrap_or_default(),
            name: pod.name_any(),
        }
    }
}

impl Display for PodIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub fn is_mirror_pod(pod: &Pod) -> bool {
    pod.annotations().contains_key(MIRROR_POD_ANNOTATION_KEY)
}

pub fn is_daemon_set_owner(owner: &OwnerReference) -> bool {
    owner.kind == DAEMON_SET_KIND
}

pub fn is_controller_owner(owner: &OwnerReference) -> bool {
    owner.controller == Some(true)
}
