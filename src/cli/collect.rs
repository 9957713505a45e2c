use std::sync::Arc;

use crate::{
    collector::Collector,
    config::{self, CollectLimits, RetryPolicy},
    error,
    management::SnapshotManager,
    ratelimit::RateLimiter,
    spotify::SpotifyClient,
    success, warning,
};

/// Collects every source and writes the snapshot. `saved_limit` overrides the
/// configured maximum of saved-library tracks.
pub async fn collect(saved_limit: Option<usize>) {
    let authenticator = super::authenticator();

    let mut limits = match CollectLimits::from_env() {
        Ok(limits) => limits,
        Err(e) => error!("{}", e),
    };
    if let Some(saved) = saved_limit {
        limits.saved = saved;
    }

    let policy = match RetryPolicy::from_env() {
        Ok(policy) => policy,
        Err(e) => error!("{}", e),
    };
    let client = SpotifyClient::new(config::spotify_apiurl(), Arc::new(RateLimiter::new(policy)));

    let pb = super::spinner("Starting collection...");
    let mut collector = Collector::new(&authenticator, client, limits).with_progress(pb.clone());
    let result = collector.run().await;
    pb.finish_and_clear();

    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_auth_failure() => {
            error!("{}\nPlease run tastegenome auth to authorize again.", e)
        }
        Err(e) => error!("Collection failed: {}", e),
    };

    if !collector.degraded().is_empty() {
        let skipped: Vec<String> = collector
            .degraded()
            .iter()
            .map(|(source, _)| source.to_string())
            .collect();
        warning!(
            "Snapshot is missing data from: {}",
            skipped.join(", ")
        );
    }

    let snapshots = SnapshotManager::default();
    if let Err(e) = snapshots.persist(&snapshot).await {
        error!("Failed to write snapshot. Err: {}", e);
    }

    success!(
        "Collected {} unique tracks by {} artists ({} with audio features). Saved to {}",
        snapshot.total_unique_tracks(),
        snapshot.total_unique_artists(),
        snapshot.tracks_with_features(),
        snapshots.path().display()
    );
}

pub async fn full(saved_limit: Option<usize>) {
    collect(saved_limit).await;
    super::analyze().await;
}
