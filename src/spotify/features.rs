use std::collections::HashMap;

use crate::{
    types::{AudioFeatures, AudioFeaturesResponse},
    warning,
};

use super::SpotifyClient;

/// Maximum number of ids `/audio-features` accepts per request.
pub const FEATURES_BATCH_SIZE: usize = 100;

/// Retrieves audio features for `track_ids` in batches of 100.
///
/// Ids Spotify has no analysis for come back as `null` and are simply absent
/// from the returned map. A batch that fails after the retry policy gave up
/// is logged and skipped; the other batches are still requested.
pub async fn get_audio_features(
    client: &SpotifyClient,
    token: &str,
    track_ids: &[String],
) -> HashMap<String, AudioFeatures> {
    let mut features = HashMap::new();
    let batches = track_ids.chunks(FEATURES_BATCH_SIZE);
    let batch_count = batches.len();

    for (index, batch) in batches.enumerate() {
        let ids = batch.join(",");
        match client
            .get::<AudioFeaturesResponse>(token, "/audio-features", &[("ids", ids)])
            .await
        {
            Ok(res) => {
                features.extend(
                    res.audio_features
                        .into_iter()
                        .flatten()
                        .map(|entry| (entry.id, entry.features)),
                );
            }
            Err(e) => warning!(
                "Failed to fetch audio features for batch {}/{}: {}",
                index + 1,
                batch_count,
                e
            ),
        }
    }

    features
}
