//! Gateway types - decoded chain events and per-chain configuration
//!
//! Raw JSON-RPC payloads are decoded into these types at the gateway
//! boundary; nothing above it handles untyped log objects.

use serde::{Deserialize, Serialize};

/// A decoded note mint event
#[derive(Debug, Clone)]
pub struct MintEvent {
    pub token_id: u64,
    pub note_id: String,
    pub broadcaster: String,
    /// Expiry in epoch milliseconds, as recorded by the contract
    pub expires_at: i64,
    pub block_number: u64,
}

/// Mint pricing for a broadcaster address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    /// Mint fee in wei
    pub mint_fee: u128,
    /// Free mints the address still has
    pub free_mints_remaining: u64,
    /// Echo registration fee in wei
    pub echo_fee: u128,
}

/// Configuration for one supported chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Deployed note NFT contract address
    pub note_contract: String,
    /// Deployed echo registry contract address
    pub echo_contract: String,
    /// Provider-imposed maximum span for a single log query
    pub max_block_range: u64,
    /// How far behind head to scan; sized per chain from its block time
    /// so the window approximates the 24h note TTL
    pub lookback_blocks: u64,
    /// Blocks held back from head to avoid reorg-prone results
    pub confirmation_margin: u64,
    /// Timeout applied to every RPC call on this chain
    pub request_timeout_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 8453,
            rpc_url: "https://mainnet.base.org".to_string(),
            note_contract: "0x0000000000000000000000000000000000000000".to_string(),
            echo_contract: "0x0000000000000000000000000000000000000000".to_string(),
            max_block_range: 1000,
            // ~24h of Base blocks at 2s block time
            lookback_blocks: 43_200,
            confirmation_margin: 5,
            request_timeout_ms: 8_000,
        }
    }
}
