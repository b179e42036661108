//! Ledger gateway trait and the EVM JSON-RPC implementation
//!
//! `eth_getLogs` queries are issued over bounded ranges only; range
//! splitting lives in the reconciler, which knows the scan window.

use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::Deserialize;
use serde_json::json;

use crate::abi;
use crate::error::GatewayError;
use crate::types::{ChainConfig, MintEvent};

/// Typed read access to one chain's deployed note contracts.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Chain scan parameters for this gateway.
    fn config(&self) -> &ChainConfig;

    /// Current chain head block number.
    async fn head_block(&self) -> Result<u64, GatewayError>;

    /// Decoded mint events in `[from, to]`. The caller must keep the
    /// range within `config().max_block_range`.
    async fn mint_events(&self, from: u64, to: u64) -> Result<Vec<MintEvent>, GatewayError>;

    /// Token ids registered as echoes of `parent_note_id`.
    async fn echoes_of(&self, parent_note_id: &str) -> Result<Vec<u64>, GatewayError>;

    /// Current owner of a token, lowercase hex address.
    async fn owner_of(&self, token_id: u64) -> Result<String, GatewayError>;

    /// Metadata URI of a token.
    async fn token_uri(&self, token_id: u64) -> Result<String, GatewayError>;

    /// Aggregate tips received by a token, in wei.
    async fn total_tips(&self, token_id: u64) -> Result<u128, GatewayError>;

    /// Mint fee for `address`, in wei.
    async fn mint_fee(&self, address: &str) -> Result<u128, GatewayError>;

    /// Free mints `address` still has.
    async fn free_mints_remaining(&self, address: &str) -> Result<u64, GatewayError>;

    /// Echo registration fee, in wei.
    async fn echo_fee(&self) -> Result<u128, GatewayError>;
}

/// A raw EVM log as returned by `eth_getLogs`
#[derive(Debug, Clone, Deserialize)]
struct RawLog {
    topics: Vec<String>,
    data: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
}

/// `LedgerGateway` over a shared jsonrpsee HTTP client
pub struct EvmGateway {
    config: ChainConfig,
    client: HttpClient,
}

impl EvmGateway {
    pub fn new(config: ChainConfig) -> Result<Self, GatewayError> {
        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_millis(config.request_timeout_ms))
            .build(&config.rpc_url)
            .map_err(|e| GatewayError::Rpc(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Issue a request with the per-chain timeout applied on top of the
    /// transport timeout, so a stalled connection cannot hold a scan.
    async fn request<R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: jsonrpsee::core::params::ArrayParams,
    ) -> Result<R, GatewayError> {
        let timeout = Duration::from_millis(self.config.request_timeout_ms);
        match tokio::time::timeout(timeout, self.client.request::<R, _>(method, params)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GatewayError::Timeout(self.config.request_timeout_ms)),
        }
    }

    /// `eth_call` against `contract` returning the raw result bytes.
    async fn eth_call(&self, contract: &str, calldata: String) -> Result<Vec<u8>, GatewayError> {
        let call = json!({ "to": contract, "data": calldata });
        let result: String = self.request("eth_call", rpc_params![call, "latest"]).await?;
        abi::hex_to_bytes(&result)
    }

    fn decode_mint_log(log: &RawLog) -> Result<MintEvent, GatewayError> {
        if log.topics.len() < 3 {
            return Err(GatewayError::Decode(format!(
                "mint log has {} topics, expected 3",
                log.topics.len()
            )));
        }
        let data = abi::hex_to_bytes(&log.data)?;
        Ok(MintEvent {
            token_id: abi::topic_u64(&log.topics[1])?,
            broadcaster: abi::topic_address(&log.topics[2])?,
            note_id: abi::decode_string(&data, 0)?,
            expires_at: abi::decode_u64(&data, 1)? as i64,
            block_number: abi::parse_hex_u64(&log.block_number),
        })
    }
}

#[async_trait]
impl LedgerGateway for EvmGateway {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    async fn head_block(&self) -> Result<u64, GatewayError> {
        let head: String = self.request("eth_blockNumber", rpc_params![]).await?;
        Ok(abi::parse_hex_u64(&head))
    }

    async fn mint_events(&self, from: u64, to: u64) -> Result<Vec<MintEvent>, GatewayError> {
        let filter = json!({
            "fromBlock": abi::to_hex_u64(from),
            "toBlock": abi::to_hex_u64(to),
            "address": self.config.note_contract,
            "topics": [abi::TOPIC_NOTE_MINTED],
        });
        let logs: Vec<RawLog> = self.request("eth_getLogs", rpc_params![filter]).await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match Self::decode_mint_log(log) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(
                        chain_id = self.config.chain_id,
                        block = %log.block_number,
                        "skipping undecodable mint log: {}",
                        e
                    );
                }
            }
        }
        Ok(events)
    }

    async fn echoes_of(&self, parent_note_id: &str) -> Result<Vec<u64>, GatewayError> {
        let calldata = abi::call_string(abi::SEL_GET_ECHOES, parent_note_id)?;
        let data = self.eth_call(&self.config.echo_contract, calldata).await?;
        abi::decode_u64_array(&data)
    }

    async fn owner_of(&self, token_id: u64) -> Result<String, GatewayError> {
        let calldata = abi::call_uint(abi::SEL_OWNER_OF, token_id)?;
        let data = self.eth_call(&self.config.note_contract, calldata).await?;
        abi::decode_address(&data, 0)
    }

    async fn token_uri(&self, token_id: u64) -> Result<String, GatewayError> {
        let calldata = abi::call_uint(abi::SEL_TOKEN_URI, token_id)?;
        let data = self.eth_call(&self.config.note_contract, calldata).await?;
        abi::decode_string(&data, 0)
    }

    async fn total_tips(&self, token_id: u64) -> Result<u128, GatewayError> {
        let calldata = abi::call_uint(abi::SEL_TOTAL_TIPS, token_id)?;
        let data = self.eth_call(&self.config.note_contract, calldata).await?;
        abi::decode_u128(&data, 0)
    }

    async fn mint_fee(&self, address: &str) -> Result<u128, GatewayError> {
        let calldata = abi::call_address(abi::SEL_MINT_FEE, address)?;
        let data = self.eth_call(&self.config.note_contract, calldata).await?;
        abi::decode_u128(&data, 0)
    }

    async fn free_mints_remaining(&self, address: &str) -> Result<u64, GatewayError> {
        let calldata = abi::call_address(abi::SEL_FREE_MINT_REMAINING, address)?;
        let data = self.eth_call(&self.config.note_contract, calldata).await?;
        abi::decode_u64(&data, 0)
    }

    async fn echo_fee(&self) -> Result<u128, GatewayError> {
        let calldata = abi::call_plain(abi::SEL_ECHO_FEE)?;
        let data = self.eth_call(&self.config.echo_contract, calldata).await?;
        abi::decode_u128(&data, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode_word_u64;

    fn word_hex(bytes: &[u8; 32]) -> String {
        let mut s = String::from("0x");
        for b in bytes {
            s.push_str(&format!("{:02x}", b));
        }
        s
    }

    #[test]
    fn decodes_mint_log() {
        // data = ABI(string noteId, uint64 expiresAt)
        let mut data = Vec::new();
        data.extend_from_slice(&encode_word_u64(0x40)); // string offset
        data.extend_from_slice(&encode_word_u64(1_700_000_000_000)); // expiresAt
        let note_id = b"note-xyz";
        data.extend_from_slice(&encode_word_u64(note_id.len() as u64));
        data.extend_from_slice(note_id);
        data.extend_from_slice(&[0u8; 24]); // pad to a word

        let mut data_hex = String::from("0x");
        for b in &data {
            data_hex.push_str(&format!("{:02x}", b));
        }

        let mut broadcaster = [0u8; 32];
        broadcaster[12..].copy_from_slice(&[0xab; 20]);

        let log = RawLog {
            topics: vec![
                abi::TOPIC_NOTE_MINTED.to_string(),
                word_hex(&encode_word_u64(42)),
                word_hex(&broadcaster),
            ],
            data: data_hex,
            block_number: "0x10".to_string(),
        };

        let event = EvmGateway::decode_mint_log(&log).unwrap();
        assert_eq!(event.token_id, 42);
        assert_eq!(event.note_id, "note-xyz");
        assert_eq!(event.expires_at, 1_700_000_000_000);
        assert_eq!(event.block_number, 16);
        assert!(event.broadcaster.ends_with("abababab"));
    }

    #[test]
    fn rejects_truncated_mint_log() {
        let log = RawLog {
            topics: vec![abi::TOPIC_NOTE_MINTED.to_string()],
            data: "0x".to_string(),
            block_number: "0x1".to_string(),
        };
        assert!(EvmGateway::decode_mint_log(&log).is_err());
    }
}
