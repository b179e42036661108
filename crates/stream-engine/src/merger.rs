//! Stream Merger - one live view over queue and chain
//!
//! The queue holds the freshest data (client-confirmed, pre-indexing),
//! so it wins on identity collisions and its entries lead the stream.
//! When the chain is unreachable the merged view degrades to queue-only
//! instead of failing: the local view must always be servable.

use std::collections::HashSet;
use std::sync::Arc;

use crate::note::Note;
use crate::queue::EphemeralQueue;
use crate::reconciler::ChainReconciler;
use crate::DEFAULT_STREAM_LIMIT;

pub struct StreamMerger {
    queue: Arc<EphemeralQueue>,
    reconciler: Arc<ChainReconciler>,
}

impl StreamMerger {
    pub fn new(queue: Arc<EphemeralQueue>, reconciler: Arc<ChainReconciler>) -> Self {
        Self { queue, reconciler }
    }

    /// Active broadcast stream for one chain, freshest first: queue
    /// entries, then chain entries not already represented.
    pub async fn active_stream(&self, chain_id: u64) -> Vec<Note> {
        // the reconciler serves unconfigured ids from the default chain,
        // so scope the queue to the same chain it will actually answer for
        let chain_id = self.reconciler.resolve_chain_id(chain_id);
        let queued: Vec<Note> = self
            .queue
            .list_active()
            .into_iter()
            .filter(|n| n.chain_id == chain_id && !n.is_echo())
            .collect();

        let chain_notes = match self
            .reconciler
            .get_all_notes(DEFAULT_STREAM_LIMIT, chain_id)
            .await
        {
            Ok(notes) => notes,
            Err(e) => {
                tracing::warn!(chain_id, "chain scan failed, serving queue only: {}", e);
                return queued;
            }
        };

        let mut seen: HashSet<String> = queued.iter().map(|n| n.note_id.clone()).collect();
        let mut stream = queued;
        stream.extend(
            chain_notes
                .into_iter()
                .filter(|n| !n.is_echo() && seen.insert(n.note_id.clone())),
        );
        stream
    }

    /// Echo thread for a parent note. The ledger is durable and leads;
    /// queue echoes fill the indexing-lag gap.
    pub async fn echoes_for(&self, parent_note_id: &str, chain_id: u64) -> Vec<Note> {
        let chain_id = self.reconciler.resolve_chain_id(chain_id);
        let mut echoes = match self
            .reconciler
            .get_echoes_for_parent(parent_note_id, chain_id)
            .await
        {
            Ok(echoes) => echoes,
            Err(e) => {
                tracing::warn!(
                    parent_note_id,
                    "echo lookup failed, serving queue only: {}",
                    e
                );
                Vec::new()
            }
        };

        let mut seen: HashSet<String> = echoes.iter().map(|n| n.note_id.clone()).collect();
        echoes.extend(
            self.queue
                .list_active()
                .into_iter()
                .filter(|n| n.chain_id == chain_id)
                .filter(|n| n.parent_note_id.as_deref() == Some(parent_note_id))
                .filter(|n| seen.insert(n.note_id.clone())),
        );
        echoes
    }
}
