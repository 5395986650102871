use serde::Deserialize;
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerSettings {
    /// Live-tail poll cadence.
    #[serde(default = "default_poll_interval")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub poll_interval: Duration,
    /// Decode only: skip every store and checkpoint write.
    #[serde(default)]
    pub testing: bool,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            testing: false,
        }
    }
}
