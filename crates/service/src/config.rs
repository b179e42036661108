//! Service Configuration

use std::path::Path;

use anyhow::Context;
use ledger_gateway::ChainConfig;
use serde::{Deserialize, Serialize};

/// Service configuration
///
/// Chains are listed in priority order; the first entry is the default
/// chain every unscoped request falls back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP API bind address
    pub http_addr: String,
    /// WebSocket bind address
    pub ws_addr: String,
    /// Ephemeral queue capacity
    pub queue_capacity: usize,
    /// Metadata fetch timeout in milliseconds
    pub metadata_timeout_ms: u64,
    /// Supported chains, default chain first
    pub chains: Vec<ChainConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            ws_addr: "127.0.0.1:8081".to_string(),
            queue_capacity: stream_engine::DEFAULT_QUEUE_CAPACITY,
            metadata_timeout_ms: 5_000,
            chains: vec![ChainConfig::default()],
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ServiceConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if config.chains.is_empty() {
            anyhow::bail!("config must list at least one chain");
        }
        Ok(config)
    }
}
