mod common;

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use common::{Hits, authenticator, bundle_expiring_in, client, features_json, serve, track_json};
use serde_json::{Value, json};
use tastegenome::{
    CollectError,
    collector::{CollectionState, Collector},
    config::CollectLimits,
    types::SourceTag,
};

type Params = Query<HashMap<String, String>>;

// Fake Web API with one handler per source
//
// - recent: t1, t2 (t1 with played_at)
// - top_short: t1, t3, t3
// - top_medium: always 429
// - top_long: t4
// - saved: t1 (with added_at), t5 without an id
// - audio features: known for t1 and t3 only
fn fake_api(hits: Hits) -> Router {
    Router::new()
        .route(
            "/me/player/recently-played",
            get({
                let hits = hits.clone();
                move || async move {
                    hits.hit("recent");
                    Json(json!({
                        "items": [
                            { "track": track_json("t1", &["Alpha"]), "played_at": "2024-03-01T10:00:00Z" },
                            { "track": track_json("t2", &["Beta", "Alpha"]), "played_at": "2024-03-01T09:00:00Z" },
                            { "track": track_json("t1", &["Alpha"]), "played_at": "2024-02-28T22:00:00Z" }
                        ]
                    }))
                }
            }),
        )
        .route(
            "/me/top/tracks",
            get({
                let hits = hits.clone();
                move |Query(q): Params| async move {
                    let range = q.get("time_range").cloned().unwrap_or_default();
                    hits.hit(&range);
                    match range.as_str() {
                        "short_term" => Json(json!({
                            "items": [track_json("t1", &["Alpha"]), track_json("t3", &["Gamma"]), track_json("t3", &["Gamma"])]
                        }))
                        .into_response(),
                        "long_term" => Json(json!({ "items": [track_json("t4", &["Delta"])] })).into_response(),
                        _ => {
                            let mut headers = HeaderMap::new();
                            headers.insert("retry-after", "0".parse().unwrap());
                            (StatusCode::TOO_MANY_REQUESTS, headers, "slow down").into_response()
                        }
                    }
                }
            }),
        )
        .route(
            "/me/tracks",
            get({
                let hits = hits.clone();
                move || async move {
                    hits.hit("saved");
                    let mut local_file = track_json("t5", &["Local"]);
                    local_file["id"] = Value::Null;
                    Json(json!({
                        "items": [
                            { "added_at": "2023-05-05T00:00:00Z", "track": track_json("t1", &["Alpha"]) },
                            { "added_at": "2023-05-06T00:00:00Z", "track": local_file }
                        ],
                        "total": 2,
                        "next": null
                    }))
                }
            }),
        )
        .route(
            "/audio-features",
            get({
                let hits = hits.clone();
                move |Query(q): Params| async move {
                    hits.hit("features");
                    let entries: Vec<Value> = q["ids"]
                        .split(',')
                        .map(|id| match id {
                            "t1" | "t3" => features_json(id),
                            _ => Value::Null,
                        })
                        .collect();
                    Json(json!({ "audio_features": entries }))
                }
            }),
        )
}

#[tokio::test]
async fn test_collect_merges_sources_and_survives_degraded_source() {
    let hits = Hits::default();
    let api = serve(fake_api(hits.clone())).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", Some(bundle_expiring_in("token", 3600)));

    let mut collector = Collector::new(&auth, client(&api), CollectLimits::default());
    let snapshot = collector.run().await.unwrap();

    // Per-source counts as fetched, after within-source dedupe
    assert_eq!(snapshot.source_count(SourceTag::Recent), 2);
    assert_eq!(snapshot.source_count(SourceTag::TopShort), 2);
    assert_eq!(snapshot.source_count(SourceTag::TopMedium), 0);
    assert_eq!(snapshot.source_count(SourceTag::TopLong), 1);
    assert_eq!(snapshot.source_count(SourceTag::SavedLibrary), 1);

    // t1 appears in recent, top_short and saved: recent wins, both timestamps survive
    let t1 = snapshot.track("t1").unwrap();
    assert_eq!(t1.source, SourceTag::Recent);
    assert_eq!(t1.played_at.as_deref(), Some("2024-03-01T10:00:00Z"));
    assert_eq!(t1.added_at.as_deref(), Some("2023-05-05T00:00:00Z"));
    assert!(t1.audio_features.is_some());

    assert_eq!(snapshot.track("t3").unwrap().source, SourceTag::TopShort);
    assert!(snapshot.track("t5").is_none());

    // Totals after dedupe
    let ids: Vec<&str> = snapshot.tracks().iter().map(|t| t.track_id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2", "t3", "t4"]);
    assert_eq!(snapshot.total_unique_tracks(), 4);
    assert_eq!(snapshot.unique_artists(), ["Alpha", "Beta", "Delta", "Gamma"]);
    assert_eq!(snapshot.total_unique_artists(), 4);
    assert_eq!(snapshot.tracks_with_features(), 2);
    assert!(snapshot.track("t2").unwrap().audio_features.is_none());

    // top_medium was tried max_retries + 1 times and then given up on
    assert_eq!(hits.get("medium_term"), 3);
    assert_eq!(collector.degraded().len(), 1);
    assert_eq!(collector.degraded()[0].0, SourceTag::TopMedium);

    assert_eq!(collector.state(), CollectionState::Done);
    assert_eq!(
        collector.history(),
        [
            CollectionState::Idle,
            CollectionState::Authenticating,
            CollectionState::Fetching(SourceTag::Recent),
            CollectionState::Fetching(SourceTag::TopShort),
            CollectionState::Fetching(SourceTag::TopMedium),
            CollectionState::Fetching(SourceTag::TopLong),
            CollectionState::Fetching(SourceTag::SavedLibrary),
            CollectionState::FetchingFeatures,
            CollectionState::Assembling,
            CollectionState::Done,
        ]
    );
}

#[tokio::test]
async fn test_collect_fails_without_token() {
    let hits = Hits::default();
    let api = serve(fake_api(hits.clone())).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", None);

    let mut collector = Collector::new(&auth, client(&api), CollectLimits::default());
    let result = collector.run().await;

    assert!(matches!(result, Err(CollectError::NotAuthenticated)));
    assert_eq!(collector.state(), CollectionState::Failed);
    assert_eq!(
        collector.history(),
        [
            CollectionState::Idle,
            CollectionState::Authenticating,
            CollectionState::Failed,
        ]
    );
    assert_eq!(hits.total(), 0);
}

#[tokio::test]
async fn test_collect_fails_when_refresh_is_rejected() {
    let token_app = Router::new().route(
        "/api/token",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
        }),
    );
    let token_url = format!("{}/api/token", serve(token_app).await);

    let hits = Hits::default();
    let api = serve(fake_api(hits.clone())).await;
    let auth = authenticator(&token_url, Some(bundle_expiring_in("stale", -60)));

    let mut collector = Collector::new(&auth, client(&api), CollectLimits::default());
    let err = collector.run().await.unwrap_err();

    assert!(matches!(err, CollectError::ReauthRequired(_)));
    assert_eq!(collector.state(), CollectionState::Failed);
    assert_eq!(hits.total(), 0);
}

// Saved library of 120 tracks served 50 at a time; every even track has features
fn paged_library(hits: Hits, feature_batches: Arc<Mutex<Vec<usize>>>) -> Router {
    const TOTAL: usize = 120;

    Router::new()
        .route(
            "/me/tracks",
            get({
                let hits = hits.clone();
                move |Query(q): Params| async move {
                    hits.hit("saved");
                    let offset: usize = q["offset"].parse().unwrap();
                    let limit: usize = q["limit"].parse().unwrap();
                    let end = (offset + limit).min(TOTAL);
                    let items: Vec<Value> = (offset..end)
                        .map(|i| {
                            json!({
                                "added_at": "2023-01-01T00:00:00Z",
                                "track": track_json(&format!("s{}", i), &[&format!("Artist {}", i % 7)])
                            })
                        })
                        .collect();
                    let next = if end < TOTAL {
                        json!(format!("/me/tracks?offset={}&limit={}", end, limit))
                    } else {
                        Value::Null
                    };
                    Json(json!({ "items": items, "total": TOTAL, "next": next }))
                }
            }),
        )
        .route(
            "/audio-features",
            get({
                let hits = hits.clone();
                move |Query(q): Params| async move {
                    hits.hit("features");
                    let ids: Vec<&str> = q["ids"].split(',').collect();
                    feature_batches.lock().unwrap().push(ids.len());
                    let entries: Vec<Value> = ids
                        .iter()
                        .map(|id| {
                            let n: usize = id[1..].parse().unwrap();
                            if n % 2 == 0 { features_json(id) } else { Value::Null }
                        })
                        .collect();
                    Json(json!({ "audio_features": entries }))
                }
            }),
        )
}

#[tokio::test]
async fn test_collect_pages_library_and_batches_features() {
    let hits = Hits::default();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let api = serve(paged_library(hits.clone(), batches.clone())).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", Some(bundle_expiring_in("token", 3600)));

    let limits = CollectLimits {
        recent: 0,
        top: 0,
        saved: 500,
    };
    let mut collector = Collector::new(&auth, client(&api), limits);
    let snapshot = collector.run().await.unwrap();

    assert_eq!(hits.get("saved"), 3);
    assert_eq!(snapshot.source_count(SourceTag::SavedLibrary), 120);
    assert_eq!(snapshot.total_unique_tracks(), 120);
    assert_eq!(snapshot.total_unique_artists(), 7);

    // 120 ids go out as one full batch of 100 and one of 20
    assert_eq!(*batches.lock().unwrap(), vec![100, 20]);
    assert_eq!(snapshot.tracks_with_features(), 60);
    assert!(snapshot.track("s0").unwrap().audio_features.is_some());
    assert!(snapshot.track("s1").unwrap().audio_features.is_none());
}

#[tokio::test]
async fn test_collect_respects_saved_limit() {
    let hits = Hits::default();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let api = serve(paged_library(hits.clone(), batches)).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", Some(bundle_expiring_in("token", 3600)));

    let limits = CollectLimits {
        recent: 0,
        top: 0,
        saved: 70,
    };
    let mut collector = Collector::new(&auth, client(&api), limits);
    let snapshot = collector.run().await.unwrap();

    assert_eq!(hits.get("saved"), 2);
    assert_eq!(snapshot.source_count(SourceTag::SavedLibrary), 70);
    assert_eq!(snapshot.tracks().last().unwrap().track_id, "s69");
}

#[tokio::test]
async fn test_snapshot_tracks_are_unique() {
    let api = serve(fake_api(Hits::default())).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", Some(bundle_expiring_in("token", 3600)));

    let mut collector = Collector::new(&auth, client(&api), CollectLimits::default());
    let snapshot = collector.run().await.unwrap();

    let mut seen = HashSet::new();
    for track in snapshot.tracks() {
        assert!(seen.insert(track.track_id.clone()), "duplicate {}", track.track_id);
    }
    assert_eq!(seen.len(), snapshot.total_unique_tracks());
}

#[tokio::test]
async fn test_features_failure_does_not_abort_collection() {
    let app = Router::new()
        .route(
            "/me/top/tracks",
            get(|| async { Json(json!({ "items": [track_json("t1", &["Alpha"])] })) }),
        )
        .route(
            "/audio-features",
            get(|| async { (StatusCode::FORBIDDEN, "deprecated endpoint").into_response() }),
        );
    let api = serve(app).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", Some(bundle_expiring_in("token", 3600)));

    let limits = CollectLimits {
        recent: 0,
        top: 50,
        saved: 0,
    };
    let mut collector = Collector::new(&auth, client(&api), limits);
    let snapshot = collector.run().await.unwrap();

    assert_eq!(snapshot.total_unique_tracks(), 1);
    assert_eq!(snapshot.tracks_with_features(), 0);
    assert_eq!(collector.state(), CollectionState::Done);
}

#[tokio::test]
async fn test_non_retryable_error_degrades_source_after_one_attempt() {
    let hits = Hits::default();
    let app = Router::new().route(
        "/me/top/tracks",
        get({
            let hits = hits.clone();
            move |Query(q): Params| async move {
                let range = q.get("time_range").cloned().unwrap_or_default();
                hits.hit(&range);
                match range.as_str() {
                    "short_term" => Json(json!({ "items": [track_json("t1", &["Alpha"])] })).into_response(),
                    "long_term" => Json(json!({ "items": [track_json("t2", &["Beta"])] })).into_response(),
                    _ => (StatusCode::FORBIDDEN, "insufficient client scope").into_response(),
                }
            }
        }),
    );
    let api = serve(app).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", Some(bundle_expiring_in("token", 3600)));

    let limits = CollectLimits {
        recent: 0,
        top: 50,
        saved: 0,
    };
    let mut collector = Collector::new(&auth, client(&api), limits);
    let snapshot = collector.run().await.unwrap();

    // A 403 is not retried
    assert_eq!(hits.get("medium_term"), 1);
    assert_eq!(snapshot.source_count(SourceTag::TopMedium), 0);

    // The other windows are unaffected
    assert_eq!(snapshot.source_count(SourceTag::TopShort), 1);
    assert_eq!(snapshot.source_count(SourceTag::TopLong), 1);
    assert_eq!(snapshot.total_unique_tracks(), 2);

    assert_eq!(collector.degraded().len(), 1);
    assert_eq!(collector.degraded()[0].0, SourceTag::TopMedium);
    assert!(collector.degraded()[0].1.contains("403"));
    assert_eq!(collector.state(), CollectionState::Done);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let hits = Hits::default();
    let app = Router::new().route(
        "/me/player/recently-played",
        get({
            let hits = hits.clone();
            move || async move {
                hits.hit("recent");
                if hits.get("recent") == 1 {
                    return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
                }
                Json(json!({
                    "items": [
                        { "track": track_json("t1", &["Alpha"]), "played_at": "2024-03-01T10:00:00Z" }
                    ]
                }))
                .into_response()
            }
        }),
    );
    let api = serve(app).await;
    let auth = authenticator("http://127.0.0.1:9/api/token", Some(bundle_expiring_in("token", 3600)));

    let limits = CollectLimits {
        recent: 50,
        top: 0,
        saved: 0,
    };
    let mut collector = Collector::new(&auth, client(&api), limits);
    let snapshot = collector.run().await.unwrap();

    // One 503, then the retry succeeds
    assert_eq!(hits.get("recent"), 2);
    assert_eq!(snapshot.source_count(SourceTag::Recent), 1);
    assert_eq!(
        snapshot.track("t1").unwrap().played_at.as_deref(),
        Some("2024-03-01T10:00:00Z")
    );
    assert!(collector.degraded().is_empty());
}
