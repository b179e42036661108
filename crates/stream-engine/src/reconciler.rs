//! Chain Reconciler - historical note reconstruction from mint events
//!
//! Rebuilds the "what is live" view from the ledger: scan a bounded
//! lookback window for mint events in provider-sized chunks, dedupe by
//! token identity, then resolve each event into a denormalized note.
//! This is a best-effort cache rebuild, not a source of truth, so every
//! sub-range or lookup failure is absorbed and logged.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use ledger_gateway::{GatewayRegistry, LedgerGateway, MintEvent};

use crate::error::StreamError;
use crate::metadata::MetadataClient;
use crate::note::Note;
use crate::{now_ms, NOTE_TTL_MS};

pub struct ChainReconciler {
    registry: Arc<GatewayRegistry>,
    metadata: MetadataClient,
}

/// Split `[from, to]` into inclusive sub-ranges of at most `max_range`
/// blocks each.
pub fn chunk_ranges(from: u64, to: u64, max_range: u64) -> Vec<(u64, u64)> {
    if to < from || max_range == 0 {
        return vec![];
    }
    let mut ranges = Vec::new();
    let mut start = from;
    while start <= to {
        let end = (start + max_range - 1).min(to);
        ranges.push((start, end));
        start = end + 1;
    }
    ranges
}

impl ChainReconciler {
    pub fn new(registry: Arc<GatewayRegistry>, metadata: MetadataClient) -> Self {
        Self { registry, metadata }
    }

    /// Chain id a request for `chain_id` will actually be served from.
    pub fn resolve_chain_id(&self, chain_id: u64) -> u64 {
        self.registry.resolve_chain_id(chain_id)
    }

    /// The most recent `limit` active notes reconstructed from the chain.
    pub async fn get_all_notes(&self, limit: usize, chain_id: u64) -> Result<Vec<Note>, StreamError> {
        let gateway = self.registry.get(chain_id)?;
        let chain_id = gateway.config().chain_id;

        let events = self.scan_mint_events(&gateway).await?;

        // newest-first, one resolution per token even if a token shows up
        // in overlapping ranges
        let mut seen = HashSet::new();
        let recent: Vec<&MintEvent> = events
            .iter()
            .rev()
            .filter(|e| seen.insert(e.token_id))
            .take(limit)
            .collect();

        let resolved = join_all(
            recent
                .into_iter()
                .map(|event| self.resolve_mint(&gateway, chain_id, event)),
        )
        .await;

        let now = now_ms();
        Ok(resolved
            .into_iter()
            .filter(|note| note.is_active(now))
            .collect())
    }

    /// Echo notes registered on chain for `parent_note_id`.
    pub async fn get_echoes_for_parent(
        &self,
        parent_note_id: &str,
        chain_id: u64,
    ) -> Result<Vec<Note>, StreamError> {
        let gateway = self.registry.get(chain_id)?;
        let chain_id = gateway.config().chain_id;

        let token_ids = gateway.echoes_of(parent_note_id).await?;
        let gateway = &gateway;
        let resolved = join_all(token_ids.iter().map(|&token_id| async move {
            self.resolve_token(gateway, chain_id, token_id, Some(parent_note_id))
                .await
        }))
        .await;

        let now = now_ms();
        Ok(resolved
            .into_iter()
            .flatten()
            .filter(|note| note.is_active(now))
            .collect())
    }

    /// Point lookup by on-chain identity. Unlike the listings this is a
    /// hard lookup: unknown tokens are `NotFound` and elapsed TTLs are
    /// reported as `Expired` so clients can message them differently.
    pub async fn get_note(&self, token_id: u64, chain_id: u64) -> Result<Note, StreamError> {
        let gateway = self.registry.get(chain_id)?;
        let chain_id = gateway.config().chain_id;

        let note = self
            .resolve_token(&gateway, chain_id, token_id, None)
            .await
            .ok_or_else(|| StreamError::NotFound(format!("token {}", token_id)))?;
        if !note.is_active(now_ms()) {
            return Err(StreamError::Expired(note.note_id));
        }
        Ok(note)
    }

    /// Scan the lookback window chunk by chunk. A failed chunk is logged
    /// and skipped; partial results are acceptable.
    async fn scan_mint_events(
        &self,
        gateway: &Arc<dyn LedgerGateway>,
    ) -> Result<Vec<MintEvent>, StreamError> {
        let config = gateway.config();
        let head = gateway.head_block().await?;
        let to = head.saturating_sub(config.confirmation_margin);
        let from = to.saturating_sub(config.lookback_blocks.saturating_sub(1));

        let mut events = Vec::new();
        for (start, end) in chunk_ranges(from, to, config.max_block_range) {
            match gateway.mint_events(start, end).await {
                Ok(chunk) => events.extend(chunk),
                Err(e) => {
                    tracing::warn!(
                        chain_id = config.chain_id,
                        from = start,
                        to = end,
                        "mint event sub-range failed, skipping: {}",
                        e
                    );
                }
            }
        }
        Ok(events)
    }

    /// Resolve a mint event into a full note. Owner, metadata and tip
    /// lookups are all tolerant of failure; a note with a missing audio
    /// URL beats a dropped note.
    async fn resolve_mint(
        &self,
        gateway: &Arc<dyn LedgerGateway>,
        chain_id: u64,
        event: &MintEvent,
    ) -> Note {
        let owner = match gateway.owner_of(event.token_id).await {
            Ok(owner) => Some(owner),
            Err(e) => {
                tracing::warn!(token_id = event.token_id, "owner lookup failed: {}", e);
                None
            }
        };
        let metadata_url = gateway.token_uri(event.token_id).await.unwrap_or_else(|e| {
            tracing::warn!(token_id = event.token_id, "tokenURI lookup failed: {}", e);
            String::new()
        });
        let metadata = self.metadata.fetch(&metadata_url).await.unwrap_or_default();
        let tips = gateway.total_tips(event.token_id).await.unwrap_or_else(|e| {
            tracing::warn!(token_id = event.token_id, "tip lookup failed: {}", e);
            0
        });

        let is_ghost = match &owner {
            Some(owner) => !owner.eq_ignore_ascii_case(&event.broadcaster),
            None => true,
        };

        Note {
            note_id: event.note_id.clone(),
            token_id: event.token_id,
            chain_id,
            audio_url: metadata.audio_url.unwrap_or_default(),
            metadata_url,
            duration: metadata.duration.unwrap_or_default(),
            mood_color: metadata.mood_color.unwrap_or_default(),
            waveform: metadata.waveform.unwrap_or_default(),
            sector: metadata.sector.unwrap_or_default(),
            timestamp: event.expires_at - NOTE_TTL_MS,
            expires_at: event.expires_at,
            broadcaster: event.broadcaster.clone(),
            tips,
            echoes: 0,
            parent_note_id: metadata.parent_note_id,
            is_ghost,
        }
    }

    /// Resolve a token without a mint event in hand, identity and
    /// lifecycle coming from its metadata. Returns `None` only when the
    /// chain does not know the token at all.
    async fn resolve_token(
        &self,
        gateway: &Arc<dyn LedgerGateway>,
        chain_id: u64,
        token_id: u64,
        parent_note_id: Option<&str>,
    ) -> Option<Note> {
        let owner = match gateway.owner_of(token_id).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::debug!(token_id, "token not resolvable: {}", e);
                return None;
            }
        };
        let metadata_url = gateway.token_uri(token_id).await.unwrap_or_default();
        let metadata = self.metadata.fetch(&metadata_url).await.unwrap_or_default();
        let tips = gateway.total_tips(token_id).await.unwrap_or(0);

        let timestamp = metadata.timestamp.unwrap_or_else(now_ms);
        let expires_at = metadata
            .expires_at
            .unwrap_or_else(|| Note::expiry_for(timestamp));

        Some(Note {
            note_id: metadata
                .note_id
                .unwrap_or_else(|| format!("token-{}-{}", chain_id, token_id)),
            token_id,
            chain_id,
            audio_url: metadata.audio_url.unwrap_or_default(),
            metadata_url,
            duration: metadata.duration.unwrap_or_default(),
            mood_color: metadata.mood_color.unwrap_or_default(),
            waveform: metadata.waveform.unwrap_or_default(),
            sector: metadata.sector.unwrap_or_default(),
            timestamp,
            expires_at,
            broadcaster: owner.clone(),
            tips,
            echoes: 0,
            parent_note_id: parent_note_id
                .map(str::to_string)
                .or(metadata.parent_note_id),
            is_ghost: false,
        })
    }
}
