//! Ephemeral Queue - bounded newest-first holding area
//!
//! Notes confirmed by clients land here before chain indexing catches
//! up. Strict ring discipline: inserting at capacity evicts exactly the
//! oldest entry. Listing is a pure TTL filter; eviction of expired
//! entries is a separate, explicit operation.
//!
//! All mutations take the write lock, so increments to the same note are
//! linearized; reads snapshot under the read lock.

use std::collections::VecDeque;

use parking_lot::RwLock;
use serde::Serialize;

use crate::note::Note;
use crate::{now_ms, DEFAULT_QUEUE_CAPACITY};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub active: usize,
}

pub struct EphemeralQueue {
    notes: RwLock<VecDeque<Note>>,
    capacity: usize,
}

impl EphemeralQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            notes: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Insert at the head, evicting the oldest entry when full.
    pub fn add(&self, note: Note) {
        let mut notes = self.notes.write();
        if notes.len() >= self.capacity {
            if let Some(evicted) = notes.pop_back() {
                tracing::debug!(note_id = %evicted.note_id, "queue full, evicted oldest note");
            }
        }
        notes.push_front(note);
    }

    /// Remove by note id. Returns whether anything was removed.
    pub fn remove(&self, note_id: &str) -> bool {
        let mut notes = self.notes.write();
        let before = notes.len();
        notes.retain(|n| n.note_id != note_id);
        notes.len() < before
    }

    pub fn get(&self, note_id: &str) -> Option<Note> {
        self.notes.read().iter().find(|n| n.note_id == note_id).cloned()
    }

    pub fn get_by_token(&self, token_id: u64, chain_id: u64) -> Option<Note> {
        self.notes
            .read()
            .iter()
            .find(|n| n.token_id == token_id && n.chain_id == chain_id)
            .cloned()
    }

    /// Non-expired notes, newest first. Pure filter, never mutates.
    pub fn list_active(&self) -> Vec<Note> {
        self.list_active_at(now_ms())
    }

    pub fn list_active_at(&self, now: i64) -> Vec<Note> {
        self.notes
            .read()
            .iter()
            .filter(|n| n.is_active(now))
            .cloned()
            .collect()
    }

    /// Apply a tip to the note holding `token_id`. Tips arrive keyed by
    /// token because the tipper only knows the on-chain identity.
    pub fn increment_tips(&self, token_id: u64, chain_id: u64, amount: u128) -> bool {
        let mut notes = self.notes.write();
        match notes
            .iter_mut()
            .find(|n| n.token_id == token_id && n.chain_id == chain_id)
        {
            Some(note) => {
                note.tips = note.tips.saturating_add(amount);
                true
            }
            None => false,
        }
    }

    /// Bump the echo count of the parent note.
    pub fn increment_echoes(&self, note_id: &str) -> bool {
        let mut notes = self.notes.write();
        match notes.iter_mut().find(|n| n.note_id == note_id) {
            Some(note) => {
                note.echoes += 1;
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.stats_at(now_ms())
    }

    pub fn stats_at(&self, now: i64) -> QueueStats {
        let notes = self.notes.read();
        QueueStats {
            total: notes.len(),
            active: notes.iter().filter(|n| n.is_active(now)).count(),
        }
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(now_ms())
    }

    pub fn evict_expired_at(&self, now: i64) -> usize {
        let mut notes = self.notes.write();
        let before = notes.len();
        notes.retain(|n| n.is_active(now));
        before - notes.len()
    }
}

impl Default for EphemeralQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(note_id: &str, token_id: u64, timestamp: i64) -> Note {
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
            timestamp,
            expires_at: timestamp + 1_000,
            broadcaster: "0xbroadcaster".to_string(),
            tips: 0,
            echoes: 0,
            parent_note_id: None,
            is_ghost: false,
        }
    }

    #[test]
    fn ttl_boundary() {
        let queue = EphemeralQueue::new(10);
        queue.add(note("a", 1, 0)); // expires at 1000
        assert_eq!(queue.list_active_at(999).len(), 1);
        assert_eq!(queue.list_active_at(1_001).len(), 0);
        // listing never mutates
        assert_eq!(queue.stats_at(0).total, 1);
    }

    #[test]
    fn eviction_preserves_newest_first() {
        let queue = EphemeralQueue::new(2);
        queue.add(note("a", 1, 0));
        queue.add(note("b", 2, 1));
        // queue is [b, a]; inserting c evicts a
        queue.add(note("c", 3, 2));
        let ids: Vec<String> = queue
            .list_active_at(5)
            .into_iter()
            .map(|n| n.note_id)
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert!(queue.get("a").is_none());
        assert_eq!(queue.stats_at(5).total, 2);
    }

    #[test]
    fn tip_and_echo_increments_apply_once() {
        let queue = EphemeralQueue::new(10);
        queue.add(note("a", 7, 0));
        assert!(queue.increment_tips(7, 8453, 100));
        assert!(queue.increment_tips(7, 8453, 50));
        assert_eq!(queue.get("a").unwrap().tips, 150);

        assert!(queue.increment_echoes("a"));
        assert!(queue.increment_echoes("a"));
        assert_eq!(queue.get("a").unwrap().echoes, 2);

        // unknown identities are reported, not invented
        assert!(!queue.increment_tips(8, 8453, 1));
        assert!(!queue.increment_tips(7, 1, 1));
        assert!(!queue.increment_echoes("b"));
    }

    #[test]
    fn remove_and_evict_expired() {
        let queue = EphemeralQueue::new(10);
        queue.add(note("a", 1, 0));
        queue.add(note("b", 2, 5_000));
        assert!(queue.remove("a"));
        assert!(!queue.remove("a"));
        queue.add(note("c", 3, 0));
        // "c" expires at 1000, "b" at 6000
        assert_eq!(queue.evict_expired_at(2_000), 1);
        assert_eq!(queue.stats_at(2_000).total, 1);
        assert_eq!(queue.stats_at(2_000).active, 1);
    }

    #[test]
    fn concurrent_increments_do_not_interfere() {
        use std::sync::Arc;

        let queue = Arc::new(EphemeralQueue::new(10));
        queue.add(note("a", 1, 0));
        queue.add(note("b", 2, 0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let q = queue.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    q.increment_tips(1, 8453, 1);
                    q.increment_echoes("b");
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(queue.get("a").unwrap().tips, 800);
        assert_eq!(queue.get("b").unwrap().echoes, 800);
    }
}
