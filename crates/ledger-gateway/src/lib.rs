//! Ledger Gateway - typed per-chain access to the note contracts
//!
//! Wraps a JSON-RPC connection to one chain and exposes typed reads
//! (head block, mint event logs, fee/owner/tips lookups) used by the
//! reconciliation engine. One long-lived gateway per configured chain,
//! shared across all in-flight requests.

pub mod abi;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod types;

pub use error::GatewayError;
pub use gateway::{EvmGateway, LedgerGateway};
pub use registry::GatewayRegistry;
pub use types::{ChainConfig, FeeQuote, MintEvent};
