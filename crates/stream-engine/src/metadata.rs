//! Content-storage metadata fetch
//!
//! Token URIs point into external content storage (IPFS-style gateway
//! URLs). The JSON behind them is only decoded for display fields; a
//! failed or malformed fetch yields best-effort data, never an error to
//! the caller.

use std::time::Duration;

use serde::Deserialize;

/// Display fields stored alongside the audio at mint time
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    #[serde(default)]
    pub note_id: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub mood_color: Option<String>,
    #[serde(default)]
    pub waveform: Option<Vec<f32>>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub parent_note_id: Option<String>,
}

#[derive(Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
}

impl MetadataClient {
    pub fn new(timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Fetch and decode metadata. Failures are logged and collapse to
    /// `None`; a timeout behaves the same as any other soft failure.
    pub async fn fetch(&self, url: &str) -> Option<NoteMetadata> {
        if url.is_empty() {
            return None;
        }
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url, "metadata fetch failed: {}", e);
                return None;
            }
        };
        match response.json::<NoteMetadata>().await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(url, "metadata decode failed: {}", e);
                None
            }
        }
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new(5_000)
    }
}
