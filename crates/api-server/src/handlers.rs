//! Service-boundary operations
//!
//! Transport-agnostic handlers behind the HTTP routes. Everything is
//! constructor-injected through `ApiContext` so tests can build isolated
//! instances per case.

use std::sync::Arc;

use ledger_gateway::{FeeQuote, GatewayRegistry};
use serde::{Deserialize, Serialize};
use stream_engine::{
    now_ms, ChainReconciler, EphemeralQueue, Note, StreamError, StreamMerger,
};
use tokio::sync::mpsc;

use crate::events::StreamEvent;
use crate::fanout::{RealtimeFanout, ServerMessage};

/// Shared state wired up by the composition root
pub struct ApiContext {
    pub queue: Arc<EphemeralQueue>,
    pub merger: Arc<StreamMerger>,
    pub reconciler: Arc<ChainReconciler>,
    pub registry: Arc<GatewayRegistry>,
    pub fanout: Arc<RealtimeFanout>,
    pub events: mpsc::UnboundedSender<StreamEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTipRequest {
    #[serde(default)]
    pub chain_id: u64,
    pub token_id: u64,
    pub amount: u128,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub notes: Vec<Note>,
    pub listener_count: usize,
    pub server_time: i64,
}

/// Admit a client-confirmed mint into the queue and push it to every
/// listener. The chain scan will discover the same note later; until
/// then this copy is the authoritative one.
pub fn confirm_mint(ctx: &ApiContext, mut note: Note) -> Result<Note, StreamError> {
    if note.note_id.trim().is_empty() {
        return Err(StreamError::Invalid("noteId is required".to_string()));
    }
    if note.broadcaster.trim().is_empty() {
        return Err(StreamError::Invalid("broadcaster is required".to_string()));
    }

    // unconfigured chains degrade to the default chain scope
    note.chain_id = ctx.registry.resolve_chain_id(note.chain_id);

    if note.timestamp == 0 {
        note.timestamp = now_ms();
    }
    if note.expires_at == 0 {
        note.expires_at = Note::expiry_for(note.timestamp);
    }
    if note.expires_at <= note.timestamp {
        return Err(StreamError::Invalid(
            "expiresAt must be after timestamp".to_string(),
        ));
    }

    if let Some(parent_note_id) = note.parent_note_id.clone() {
        // echo threads are one level deep
        if let Some(parent) = ctx.queue.get(&parent_note_id) {
            if parent.is_echo() {
                return Err(StreamError::Invalid(
                    "an echo cannot have echoes".to_string(),
                ));
            }
        }
        let _ = ctx.events.send(StreamEvent::EchoRegistered { parent_note_id });
    }

    ctx.queue.add(note.clone());
    ctx.fanout.broadcast(&ServerMessage::Note { note: note.clone() });
    Ok(note)
}

/// Route a client-confirmed tip onto the event channel.
pub fn confirm_tip(ctx: &ApiContext, request: ConfirmTipRequest) -> Result<(), StreamError> {
    if request.token_id == 0 {
        return Err(StreamError::Invalid("tokenId is required".to_string()));
    }
    if request.amount == 0 {
        return Err(StreamError::Invalid("amount must be positive".to_string()));
    }
    let chain_id = ctx.registry.resolve_chain_id(request.chain_id);
    let _ = ctx.events.send(StreamEvent::TipReceived {
        chain_id,
        token_id: request.token_id,
        amount: request.amount,
    });
    Ok(())
}

/// The merged live stream plus realtime context for the client.
pub async fn list_stream(ctx: &ApiContext, chain_id: u64) -> StreamResponse {
    let chain_id = ctx.registry.resolve_chain_id(chain_id);
    StreamResponse {
        notes: ctx.merger.active_stream(chain_id).await,
        listener_count: ctx.fanout.listener_count(),
        server_time: now_ms(),
    }
}

/// Point lookup by note id, optionally falling through to the chain via
/// a known token id. `Expired` is distinct from `NotFound` so clients
/// can message a faded note differently from an unknown one.
pub async fn get_note(
    ctx: &ApiContext,
    note_id: &str,
    chain_id: u64,
    token_id: Option<u64>,
) -> Result<Note, StreamError> {
    if let Some(note) = ctx.queue.get(note_id) {
        if note.is_active(now_ms()) {
            return Ok(note);
        }
        return Err(StreamError::Expired(note_id.to_string()));
    }
    if let Some(token_id) = token_id {
        let chain_id = ctx.registry.resolve_chain_id(chain_id);
        return ctx.reconciler.get_note(token_id, chain_id).await;
    }
    Err(StreamError::NotFound(note_id.to_string()))
}

/// Echo thread for a parent note, ledger first.
pub async fn list_echoes(ctx: &ApiContext, parent_note_id: &str, chain_id: u64) -> Vec<Note> {
    let chain_id = ctx.registry.resolve_chain_id(chain_id);
    ctx.merger.echoes_for(parent_note_id, chain_id).await
}

/// Current mint/echo pricing for a broadcaster address.
pub async fn get_fees(
    ctx: &ApiContext,
    chain_id: u64,
    address: &str,
) -> Result<FeeQuote, StreamError> {
    if address.trim().is_empty() {
        return Err(StreamError::Invalid("address is required".to_string()));
    }
    let gateway = ctx.registry.get(chain_id)?;
    Ok(FeeQuote {
        mint_fee: gateway.mint_fee(address).await?,
        free_mints_remaining: gateway.free_mints_remaining(address).await?,
        echo_fee: gateway.echo_fee().await?,
    })
}
