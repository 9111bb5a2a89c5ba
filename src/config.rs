use std::time::Duration;

use clap::Parser;
use humantime::parse_duration;

use crate::orchestrator::RetireRequest;
use crate::selector::MaxAge;

#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Retire nodes older than this many days
    #[arg(long, env = "NODE_ANTI_AGING_MAX_AGE_DAYS")]
    pub max_age_days: u32,

    /// Added to --max-age-days
    #[arg(long, env = "NODE_ANTI_AGING_MAX_AGE_HOURS", default_value_t = 0)]
    pub max_age_hours: u32,

    /// Maximum number of nodes to retire in one run
    #[arg(long, env = "NODE_ANTI_AGING_BATCH_COUNT", default_value_t = 1)]
    pub batch_count: usize,

    /// Log what would happen without changing the cluster
    #[arg(long, env = "NODE_ANTI_AGING_DRY_RUN")]
    pub dry_run: bool,

    #[arg(long, env = "NODE_ANTI_AGING_EVICTION_TIMEOUT", default_value = "300s", value_parser = parse_duration)]
    pub eviction_timeout: Duration,

    #[arg(long, env = "NODE_ANTI_AGING_NODE_DELETE_TIMEOUT", default_value = "180s", value_parser = parse_duration)]
    pub node_delete_timeout: Duration,
}

impl Config {
    pub fn to_retire_request(&self) -> RetireRequest {
        RetireRequest {
            max_age: MaxAge::new(self.max_age_days, self.max_age_hours),
            count: self.batch_count,
            dry_run: self.dry_run,
            eviction_timeout: self.eviction_timeout,
            node_delete_timeout: self.node_delete_timeout,
        }
    }
}
