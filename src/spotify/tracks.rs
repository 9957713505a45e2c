use crate::{
    config::MAX_WINDOW_LIMIT,
    error::Result,
    types::{
        RecentlyPlayedResponse, SavedTracksResponse, SourceOutcome, SourceTag, TopTracksResponse,
        TrackRecord,
    },
    utils, warning,
};

use super::SpotifyClient;

/// Spotify's page size ceiling for `/me/tracks`.
const SAVED_PAGE_SIZE: usize = 50;

/// Fetches one source and folds any failure into [`SourceOutcome::Degraded`].
///
/// A failing source is reported with a warning naming it; collection of the
/// remaining sources is never interrupted.
pub async fn fetch_source(
    client: &SpotifyClient,
    token: &str,
    source: SourceTag,
    limit: usize,
) -> SourceOutcome {
    let result = match source {
        SourceTag::Recent => get_recently_played(client, token, limit).await,
        SourceTag::SavedLibrary => get_saved_tracks(client, token, limit).await,
        top => get_top_tracks(client, token, top, limit).await,
    };

    match result {
        Ok(records) => SourceOutcome::Fetched(records),
        Err(e) => {
            warning!("Failed to fetch {} tracks, continuing without them: {}", source, e);
            SourceOutcome::Degraded {
                reason: e.to_string(),
            }
        }
    }
}

/// Retrieves the most recently played tracks (at most 50).
///
/// Every record carries the `played_at` timestamp of its play. A track played
/// twice shows up once, with its most recent play.
pub async fn get_recently_played(
    client: &SpotifyClient,
    token: &str,
    limit: usize,
) -> Result<Vec<TrackRecord>> {
    let limit = limit.min(MAX_WINDOW_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let res: RecentlyPlayedResponse = client
        .get(
            token,
            "/me/player/recently-played",
            &[("limit", limit.to_string())],
        )
        .await?;

    let mut records: Vec<TrackRecord> = res
        .items
        .into_iter()
        .filter_map(|item| {
            let track = item.track?;
            TrackRecord::from_track(track, SourceTag::Recent)
                .map(|record| record.with_played_at(item.played_at))
        })
        .collect();

    utils::remove_duplicate_tracks(&mut records);
    Ok(records)
}

/// Retrieves the user's top tracks for one of the three time windows.
///
/// `source` selects the window: `TopShort` (about four weeks), `TopMedium`
/// (about six months) or `TopLong` (several years). Any other tag yields an
/// empty list.
pub async fn get_top_tracks(
    client: &SpotifyClient,
    token: &str,
    source: SourceTag,
    limit: usize,
) -> Result<Vec<TrackRecord>> {
    let Some(time_range) = source.time_range() else {
        return Ok(Vec::new());
    };
    let limit = limit.min(MAX_WINDOW_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let res: TopTracksResponse = client
        .get(
            token,
            "/me/top/tracks",
            &[
                ("time_range", time_range.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await?;

    let mut records: Vec<TrackRecord> = res
        .items
        .into_iter()
        .filter_map(|track| TrackRecord::from_track(track, source))
        .collect();

    utils::remove_duplicate_tracks(&mut records);
    Ok(records)
}

/// Pages through the saved library until `limit` tracks are collected.
///
/// Paging stops early on an empty page, when the reported total is reached
/// or when Spotify stops returning a `next` link.
pub async fn get_saved_tracks(
    client: &SpotifyClient,
    token: &str,
    limit: usize,
) -> Result<Vec<TrackRecord>> {
    let mut records: Vec<TrackRecord> = Vec::new();
    let mut offset = 0usize;

    while records.len() < limit {
        let page_size = SAVED_PAGE_SIZE.min(limit - records.len());
        let res: SavedTracksResponse = client
            .get(
                token,
                "/me/tracks",
                &[
                    ("limit", page_size.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;

        if res.items.is_empty() {
            break;
        }

        offset += res.items.len();
        records.extend(res.items.into_iter().filter_map(|item| {
            let track = item.track?;
            TrackRecord::from_track(track, SourceTag::SavedLibrary)
                .map(|record| record.with_added_at(item.added_at))
        }));
        utils::remove_duplicate_tracks(&mut records);

        if res.next.is_none() || (res.total > 0 && offset as u64 >= res.total) {
            break;
        }
    }

    records.truncate(limit);
    Ok(records)
}
