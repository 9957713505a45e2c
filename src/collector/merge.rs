use std::collections::HashMap;

use crate::types::{AudioFeatures, TrackRecord};

/// Ordered, deduplicated track accumulator keyed by `track_id`.
///
/// The first record seen for an id is the one kept, along with its source
/// tag. Later duplicates only fill `played_at` and `added_at` where the kept
/// record has none; the two timestamps never overwrite each other.
#[derive(Debug, Default, Clone)]
pub struct TrackSet {
    tracks: Vec<TrackRecord>,
    index: HashMap<String, usize>,
}

impl TrackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, records: impl IntoIterator<Item = TrackRecord>) {
        for record in records {
            self.merge_record(record);
        }
    }

    pub fn merge_record(&mut self, record: TrackRecord) {
        match self.index.get(&record.track_id) {
            Some(&position) => {
                let kept = &mut self.tracks[position];
                if kept.played_at.is_none() {
                    kept.played_at = record.played_at;
                }
                if kept.added_at.is_none() {
                    kept.added_at = record.added_at;
                }
                if kept.audio_features.is_none() {
                    kept.audio_features = record.audio_features;
                }
            }
            None => {
                self.index.insert(record.track_id.clone(), self.tracks.len());
                self.tracks.push(record);
            }
        }
    }

    /// Attaches features by id; tracks missing from `features` stay without.
    pub fn attach_features(&mut self, features: &HashMap<String, AudioFeatures>) {
        for track in &mut self.tracks {
            if let Some(found) = features.get(&track.track_id) {
                track.audio_features = Some(found.clone());
            }
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.track_id.clone()).collect()
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackRecord> {
        self.index.get(track_id).map(|&position| &self.tracks[position])
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<TrackRecord> {
        self.tracks
    }
}
