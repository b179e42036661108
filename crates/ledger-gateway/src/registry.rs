//! Gateway registry - chain id to gateway map with default fallback
//!
//! Gateways are long-lived shared handles, safe for concurrent reads.
//! A chain id absent from configuration degrades to the default chain
//! rather than failing the caller.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::gateway::{EvmGateway, LedgerGateway};
use crate::types::ChainConfig;

pub struct GatewayRegistry {
    gateways: HashMap<u64, Arc<dyn LedgerGateway>>,
    default_chain_id: u64,
}

impl GatewayRegistry {
    /// Build a registry from chain configs. The first config is the
    /// default chain.
    pub fn from_configs(configs: &[ChainConfig]) -> Result<Self, GatewayError> {
        let default_chain_id = configs
            .first()
            .map(|c| c.chain_id)
            .ok_or(GatewayError::UnknownChain(0))?;
        let mut gateways: HashMap<u64, Arc<dyn LedgerGateway>> = HashMap::new();
        for config in configs {
            let gateway = EvmGateway::new(config.clone())?;
            gateways.insert(config.chain_id, Arc::new(gateway));
        }
        Ok(Self {
            gateways,
            default_chain_id,
        })
    }

    /// Build a registry from pre-built gateways (used by tests to inject
    /// mock ledgers).
    pub fn from_gateways(
        gateways: Vec<(u64, Arc<dyn LedgerGateway>)>,
        default_chain_id: u64,
    ) -> Self {
        Self {
            gateways: gateways.into_iter().collect(),
            default_chain_id,
        }
    }

    pub fn default_chain_id(&self) -> u64 {
        self.default_chain_id
    }

    /// Gateway for `chain_id`, falling back to the default chain when the
    /// requested chain is not configured. The substitution is logged.
    pub fn get(&self, chain_id: u64) -> Result<Arc<dyn LedgerGateway>, GatewayError> {
        if let Some(gateway) = self.gateways.get(&chain_id) {
            return Ok(gateway.clone());
        }
        tracing::warn!(
            requested = chain_id,
            default = self.default_chain_id,
            "chain not configured, substituting default chain"
        );
        self.gateways
            .get(&self.default_chain_id)
            .cloned()
            .ok_or(GatewayError::UnknownChain(chain_id))
    }

    /// Chain id the registry will actually serve for a request.
    pub fn resolve_chain_id(&self, chain_id: u64) -> u64 {
        if self.gateways.contains_key(&chain_id) {
            chain_id
        } else {
            self.default_chain_id
        }
    }
}
