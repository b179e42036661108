//! Note - the broadcast unit
//!
//! Serialized in camelCase, the wire shape clients consume. `note_id` is
//! client-generated before chain confirmation; `token_id` stays 0 until
//! the mint is observed.

use serde::{Deserialize, Serialize};

use crate::NOTE_TTL_MS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Globally unique within a chain scope
    pub note_id: String,
    #[serde(default)]
    pub token_id: u64,
    pub chain_id: u64,
    #[serde(default)]
    pub audio_url: String,
    #[serde(default)]
    pub metadata_url: String,
    /// Clip length in seconds
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub mood_color: String,
    /// 100 samples in [0, 1], display only
    #[serde(default)]
    pub waveform: Vec<f32>,
    /// Cosmetic category label
    #[serde(default)]
    pub sector: String,
    /// Creation time, epoch ms; stamped at admission when absent
    #[serde(default)]
    pub timestamp: i64,
    /// Always `timestamp + 24h` at creation
    #[serde(default)]
    pub expires_at: i64,
    pub broadcaster: String,
    /// Aggregate tips in wei, never decremented
    #[serde(default)]
    pub tips: u128,
    /// Count of reply notes, never decremented
    #[serde(default)]
    pub echoes: u32,
    /// Set iff this note is an echo; echoes are one level deep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_note_id: Option<String>,
    /// Owner no longer matches the original broadcaster
    #[serde(default)]
    pub is_ghost: bool,
}

impl Note {
    /// A note is live until its expiry instant.
    pub fn is_active(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }

    pub fn is_echo(&self) -> bool {
        self.parent_note_id.is_some()
    }

    /// Address comparison on EVM chains is case-insensitive.
    pub fn owned_by(&self, address: &str) -> bool {
        self.broadcaster.eq_ignore_ascii_case(address)
    }

    /// Expiry for a note created at `timestamp`.
    pub fn expiry_for(timestamp: i64) -> i64 {
        timestamp + NOTE_TTL_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(timestamp: i64) -> Note {
        Note {
            note_id: "note-1".to_string(),
            token_id: 1,
            chain_id: 8453,
            audio_url: String::new(),
            metadata_url: String::new(),
            duration: 12,
            mood_color: "#7df9ff".to_string(),
            waveform: vec![0.5; 100],
            sector: "ambient".to_string(),
            timestamp,
            expires_at: Note::expiry_for(timestamp),
            broadcaster: "0xAbC0000000000000000000000000000000000001".to_string(),
            tips: 0,
            echoes: 0,
            parent_note_id: None,
            is_ghost: false,
        }
    }

    #[test]
    fn active_until_expiry() {
        let n = note(1_000);
        assert!(n.is_active(1_000));
        assert!(n.is_active(n.expires_at - 1));
        assert!(!n.is_active(n.expires_at));
    }

    #[test]
    fn owner_comparison_ignores_case() {
        let n = note(0);
        assert!(n.owned_by("0xabc0000000000000000000000000000000000001"));
        assert!(!n.owned_by("0xabc0000000000000000000000000000000000002"));
    }

    #[test]
    fn serializes_camel_case() {
        let v = serde_json::to_value(note(0)).unwrap();
        assert!(v.get("noteId").is_some());
        assert!(v.get("expiresAt").is_some());
        assert!(v.get("parentNoteId").is_none());
    }
}
