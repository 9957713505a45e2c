use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp in seconds.
    pub expires_at: i64,
    pub scope: String,
}

impl TokenBundle {
    /// Usable without a refresh when it outlives `now` by more than `margin_secs`.
    pub fn is_fresh(&self, now: i64, margin_secs: i64) -> bool {
        now < self.expires_at - margin_secs
    }
}

#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Query parameters Spotify appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Recent,
    TopShort,
    TopMedium,
    TopLong,
    SavedLibrary,
}

impl SourceTag {
    /// Collection order used by the orchestrator.
    pub const ALL: [SourceTag; 5] = [
        SourceTag::Recent,
        SourceTag::TopShort,
        SourceTag::TopMedium,
        SourceTag::TopLong,
        SourceTag::SavedLibrary,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SourceTag::Recent => "recent",
            SourceTag::TopShort => "top_short",
            SourceTag::TopMedium => "top_medium",
            SourceTag::TopLong => "top_long",
            SourceTag::SavedLibrary => "saved_library",
        }
    }

    /// `time_range` value for the top-tracks windows.
    pub fn time_range(&self) -> Option<&'static str> {
        match self {
            SourceTag::TopShort => Some("short_term"),
            SourceTag::TopMedium => Some("medium_term"),
            SourceTag::TopLong => Some("long_term"),
            _ => None,
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub tempo: f64,
    pub key: i32,
    pub mode: i32,
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub liveness: f64,
    pub time_signature: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_name: String,
    pub duration_ms: u64,
    pub source: SourceTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
    #[serde(flatten)]
    pub audio_features: Option<AudioFeatures>,
}

impl TrackRecord {
    /// Converts a Spotify track object; tracks without an id (local files) yield `None`.
    pub fn from_track(track: Track, source: SourceTag) -> Option<Self> {
        let track_id = track.id.filter(|id| !id.is_empty())?;
        Some(Self {
            track_id,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album_name: track.album.map(|a| a.name).unwrap_or_default(),
            duration_ms: track.duration_ms,
            source,
            played_at: None,
            added_at: None,
            audio_features: None,
        })
    }

    pub fn with_played_at(mut self, played_at: String) -> Self {
        self.played_at = Some(played_at);
        self
    }

    pub fn with_added_at(mut self, added_at: String) -> Self {
        self.added_at = Some(added_at);
        self
    }
}

/// What one source fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Fetched(Vec<TrackRecord>),
    Degraded { reason: String },
}

impl SourceOutcome {
    pub fn into_records(self) -> Vec<TrackRecord> {
        match self {
            SourceOutcome::Fetched(records) => records,
            SourceOutcome::Degraded { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    collected_at: String,
    sources: BTreeMap<SourceTag, usize>,
    tracks: Vec<TrackRecord>,
    unique_artists: Vec<String>,
    total_unique_tracks: usize,
    total_unique_artists: usize,
    tracks_with_features: usize,
}

impl CollectionSnapshot {
    /// Derives every summary count from `tracks`, so they cannot drift apart.
    pub fn new(
        collected_at: String,
        sources: BTreeMap<SourceTag, usize>,
        tracks: Vec<TrackRecord>,
    ) -> Self {
        let unique_artists: BTreeSet<String> = tracks
            .iter()
            .flat_map(|t| t.artists.iter().cloned())
            .collect();
        let tracks_with_features = tracks
            .iter()
            .filter(|t| t.audio_features.is_some())
            .count();

        Self {
            collected_at,
            sources,
            total_unique_tracks: tracks.len(),
            total_unique_artists: unique_artists.len(),
            unique_artists: unique_artists.into_iter().collect(),
            tracks,
            tracks_with_features,
        }
    }

    pub fn collected_at(&self) -> &str {
        &self.collected_at
    }

    pub fn sources(&self) -> &BTreeMap<SourceTag, usize> {
        &self.sources
    }

    pub fn source_count(&self, source: SourceTag) -> usize {
        self.sources.get(&source).copied().unwrap_or(0)
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn track(&self, track_id: &str) -> Option<&TrackRecord> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn unique_artists(&self) -> &[String] {
        &self.unique_artists
    }

    pub fn total_unique_tracks(&self) -> usize {
        self.total_unique_tracks
    }

    pub fn total_unique_artists(&self) -> usize {
        self.total_unique_artists
    }

    pub fn tracks_with_features(&self) -> usize {
        self.tracks_with_features
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayHistoryItem {
    pub track: Option<Track>,
    pub played_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentlyPlayedResponse {
    pub items: Vec<PlayHistoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopTracksResponse {
    pub items: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrackItem {
    pub added_at: String,
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTracksResponse {
    pub items: Vec<SavedTrackItem>,
    #[serde(default)]
    pub total: u64,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeaturesEntry {
    pub id: String,
    #[serde(flatten)]
    pub features: AudioFeatures,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeaturesEntry>>,
}

#[derive(Tabled)]
pub struct SourceTableRow {
    pub source: String,
    pub tracks: usize,
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub artist: String,
    pub tracks: usize,
}
