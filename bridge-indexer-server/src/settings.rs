use blockscout_service_launcher::{
    database::DatabaseSettings,
    launcher::ConfigSettings,
    tracing::{JaegerSettings, TracingSettings},
};
use bridge_indexer_logic::IndexerSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub database: DatabaseSettings,

    /// Key-value store holding the per-chain backfill cursors.
    #[serde(default = "default_checkpoint_url")]
    pub checkpoint_url: String,

    #[serde(default)]
    pub indexer: IndexerSettings,

    #[serde(default)]
    pub tracing: TracingSettings,
    #[serde(default)]
    pub jaeger: JaegerSettings,
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "BRIDGE_INDEXER";
}

fn default_checkpoint_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
