//! Counter event channel
//!
//! Tip and echo confirmations arrive as explicit events on an outbound
//! channel the fanout drain task consumes, decoupling their arrival
//! from broadcast timing and keeping application order testable.

use std::sync::Arc;

use stream_engine::EphemeralQueue;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::fanout::{RealtimeFanout, ServerMessage};

/// Counter updates flowing toward the queue and the listeners
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TipReceived {
        chain_id: u64,
        token_id: u64,
        amount: u128,
    },
    EchoRegistered {
        parent_note_id: String,
    },
}

/// Drain the event channel: apply each counter update to the queue,
/// then broadcast it. Runs until every sender is dropped.
pub fn spawn_event_drain(
    queue: Arc<EphemeralQueue>,
    fanout: Arc<RealtimeFanout>,
    mut events: mpsc::UnboundedReceiver<StreamEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                StreamEvent::TipReceived {
                    chain_id,
                    token_id,
                    amount,
                } => {
                    let applied = queue.increment_tips(token_id, chain_id, amount);
                    if !applied {
                        // note already left the queue; the reconciler's
                        // rebuilt copy will carry the chain total
                        tracing::debug!(token_id, "tip target not in queue");
                    }
                    fanout.broadcast(&ServerMessage::Tip {
                        chain_id,
                        token_id,
                        amount,
                    });
                }
                StreamEvent::EchoRegistered { parent_note_id } => {
                    queue.increment_echoes(&parent_note_id);
                    fanout.broadcast(&ServerMessage::Echo { parent_note_id });
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_engine::{now_ms, Note, NOTE_TTL_MS};

    fn active_note(note_id: &str, token_id: u64) -> Note {
        let now = now_ms();
        Note {
            note_id: note_id.to_string(),
            token_id,
            chain_id: 8453,
            audio_url: String::new(),
            metadata_url: String::new(),
            duration: 10,
            mood_color: String::new(),
            waveform: vec![],
            sector: String::new(),
            timestamp: now,
            expires_at: now + NOTE_TTL_MS,
            broadcaster: "0xbroadcaster".to_string(),
            tips: 0,
            echoes: 0,
            parent_note_id: None,
            is_ghost: false,
        }
    }

    #[tokio::test]
    async fn drain_applies_and_broadcasts() {
        let queue = Arc::new(EphemeralQueue::new(10));
        let fanout = Arc::new(RealtimeFanout::new());
        queue.add(active_note("a", 7));

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_event_drain(queue.clone(), fanout.clone(), rx);

        let (_, mut listener) = fanout.on_connect();
        while listener.try_recv().is_ok() {}

        tx.send(StreamEvent::TipReceived {
            chain_id: 8453,
            token_id: 7,
            amount: 250,
        })
        .unwrap();
        tx.send(StreamEvent::EchoRegistered {
            parent_note_id: "a".to_string(),
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let note = queue.get("a").unwrap();
        assert_eq!(note.tips, 250);
        assert_eq!(note.echoes, 1);

        let tip: serde_json::Value =
            serde_json::from_str(&listener.try_recv().unwrap()).unwrap();
        assert_eq!(tip["type"], "tip");
        assert_eq!(tip["amount"], 250);
        let echo: serde_json::Value =
            serde_json::from_str(&listener.try_recv().unwrap()).unwrap();
        assert_eq!(echo["type"], "echo");
        assert_eq!(echo["parentNoteId"], "a");
    }
}
