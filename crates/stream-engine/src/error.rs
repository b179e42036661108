//! Stream Engine Errors

use thiserror::Error;

/// Errors surfaced by stream operations
///
/// Most upstream failures never reach callers: sub-range and metadata
/// failures are absorbed inside the reconciler, and reconciler failures
/// degrade the merger to queue-only results. What remains is invalid
/// input and identity-specific lookups that genuinely miss.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Note has expired: {0}")]
    Expired(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Reserved for future hard caps; the queue evicts instead.
    #[error("Capacity exceeded")]
    CapacityExceeded,
}

impl From<ledger_gateway::GatewayError> for StreamError {
    fn from(e: ledger_gateway::GatewayError) -> Self {
        StreamError::Upstream(e.to_string())
    }
}
