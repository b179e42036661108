//! Gateway Errors

use thiserror::Error;

/// Errors produced by ledger gateway calls
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("RPC transport error: {0}")]
    Rpc(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Failed to decode chain response: {0}")]
    Decode(String),

    #[error("No gateway configured for chain {0}")]
    UnknownChain(u64),
}

impl From<jsonrpsee::core::ClientError> for GatewayError {
    fn from(e: jsonrpsee::core::ClientError) -> Self {
        GatewayError::Rpc(e.to_string())
    }
}
