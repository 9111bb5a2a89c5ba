use std::time::Duration;

pub const MIRROR_POD_ANNOTATION_KEY: &str = "kubernetes.io/config.mirror";

pub const DAEMON_SET_KIND: &str = "DaemonSet";

/// Interval between polls while waiting for evicted pods to go away.
pub const POD_EVICTION_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub const DEFAULT_BATCH_COUNT: usize = 1;
pub const DEFAULT_EVICTION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_NODE_DELETE_TIMEOUT: Duration = Duration::from_secs(180);

pub const DELETE_STATUS_SUCCESS: &str = "Success";
pub const DELETE_STATUS_FAILURE: &str = "Failure";
