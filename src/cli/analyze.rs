use std::collections::HashMap;

use tabled::Table;

use crate::{
    error, info,
    management::SnapshotManager,
    success,
    types::{ArtistTableRow, CollectionSnapshot, SourceTableRow, SourceTag},
    warning,
};

const TOP_ARTISTS: usize = 10;

/// Prints an overview of the last collection snapshot.
pub async fn analyze() {
    let snapshots = SnapshotManager::default();
    let snapshot = match snapshots.load().await {
        Ok(snapshot) => snapshot,
        Err(e) => error!(
            "No readable snapshot at {}. Run tastegenome collect first.\n Error: {}",
            snapshots.path().display(),
            e
        ),
    };

    if snapshot.tracks().is_empty() {
        warning!(
            "Snapshot from {} holds no tracks. Every source came back empty, try tastegenome collect again later.",
            snapshot.collected_at()
        );
        return;
    }

    info!(
        "Loaded {} tracks collected at {}.",
        snapshot.total_unique_tracks(),
        snapshot.collected_at()
    );

    let source_rows: Vec<SourceTableRow> = SourceTag::ALL
        .iter()
        .map(|source| SourceTableRow {
            source: source.to_string(),
            tracks: snapshot.source_count(*source),
        })
        .collect();
    println!("{}\n", Table::new(source_rows));

    println!("{}\n", Table::new(top_artists(&snapshot, TOP_ARTISTS)));

    let timestamped = snapshot
        .tracks()
        .iter()
        .filter(|t| t.played_at.is_some())
        .count();
    info!("{} tracks carry a play timestamp.", timestamped);

    let with_features = snapshot.tracks_with_features();
    success!(
        "{} unique tracks, {} unique artists, audio features for {} ({:.1}%).",
        snapshot.total_unique_tracks(),
        snapshot.total_unique_artists(),
        with_features,
        feature_coverage(&snapshot)
    );
}

/// Share of tracks with audio features, in percent. `0.0` for an empty snapshot.
pub fn feature_coverage(snapshot: &CollectionSnapshot) -> f64 {
    if snapshot.total_unique_tracks() == 0 {
        return 0.0;
    }
    snapshot.tracks_with_features() as f64 * 100.0 / snapshot.total_unique_tracks() as f64
}

/// The `n` artists credited on most tracks, most frequent first. Ties are
/// ordered by name.
pub fn top_artists(snapshot: &CollectionSnapshot, n: usize) -> Vec<ArtistTableRow> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for track in snapshot.tracks() {
        for artist in &track.artists {
            *counts.entry(artist.as_str()).or_default() += 1;
        }
    }

    let mut rows: Vec<ArtistTableRow> = counts
        .into_iter()
        .map(|(artist, tracks)| ArtistTableRow {
            artist: artist.to_string(),
            tracks,
        })
        .collect();
    rows.sort_by(|a, b| b.tracks.cmp(&a.tracks).then_with(|| a.artist.cmp(&b.artist)));
    rows.truncate(n);
    rows
}
